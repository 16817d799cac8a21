//! [`Contract`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Rental [`Contract`] of an `Order`.
#[derive(Clone, Debug, From, Into)]
pub struct Contract(domain::Contract);

/// Rental `Contract` of an `Order`, signed by its customer.
#[graphql_object(context = Context)]
impl Contract {
    /// Unique identifier of this `Contract`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` this `Contract` is for.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// Current status of this `Contract`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Plain-text terms of this `Contract`.
    #[must_use]
    pub fn terms(&self) -> &str {
        self.0.terms.as_ref()
    }

    /// Customer's `Signature` of this `Contract`.
    #[must_use]
    pub fn signature(&self) -> Option<api::signature::Signature> {
        self.0.signature.clone().map(Into::into)
    }

    /// `DateTime` when this `Contract` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Contract`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::contract::Id)]
#[into(domain::contract::Id)]
#[graphql(name = "ContractId", transparent)]
pub struct Id(Uuid);

/// Status of a `Contract`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ContractStatus",
    with = scalar::Via::<domain::contract::Status>,
)]
pub struct Status(domain::contract::Status);
