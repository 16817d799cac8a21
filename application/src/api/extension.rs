//! [`Extension`] and [`Annex`] definitions.

use common::{DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::{domain, query, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// Prolongation of an `Order`'s rental period.
#[derive(Clone, Debug, From, Into)]
pub struct Extension(domain::Extension);

/// Prolongation of an `Order`'s rental period, backed by an `Annex`.
#[graphql_object(context = Context)]
impl Extension {
    /// Unique identifier of this `Extension`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` being extended.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// End of the rental period before this `Extension`.
    #[must_use]
    pub fn previous_end_at(&self) -> DateTime {
        self.0.previous_end_at.coerce()
    }

    /// End of the rental period after this `Extension`.
    #[must_use]
    pub fn new_end_at(&self) -> DateTime {
        self.0.new_end_at.coerce()
    }

    /// Price of the additional days.
    #[must_use]
    pub fn additional_price(&self) -> Money {
        self.0.additional_price
    }

    /// Current status of this `Extension`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` when this `Extension` was requested.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Extension` was paid.
    #[must_use]
    pub fn paid_at(&self) -> Option<DateTime> {
        self.0.paid_at.map(DateTimeOf::coerce)
    }

    /// `Annex` documenting this `Extension`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Extension.annex",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn annex(&self, ctx: &Context) -> Result<Option<Annex>, Error> {
        ctx.service()
            .execute(query::annex::OfExtension::by(self.0.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|a| a.map(Into::into))
    }
}

/// Contractual addendum documenting an [`Extension`].
#[derive(Clone, Debug, From, Into)]
pub struct Annex(domain::Annex);

/// Contractual addendum documenting an `Extension`, signed by the staff first
/// and by the customer afterwards.
#[graphql_object(context = Context)]
impl Annex {
    /// Unique identifier of this `Annex`.
    #[must_use]
    pub fn id(&self) -> AnnexId {
        self.0.id.into()
    }

    /// ID of the documented `Extension`.
    #[must_use]
    pub fn extension_id(&self) -> Id {
        self.0.extension_id.into()
    }

    /// ID of the amended `Contract`.
    #[must_use]
    pub fn contract_id(&self) -> api::contract::Id {
        self.0.contract_id.into()
    }

    /// Current status of this `Annex`.
    #[must_use]
    pub fn status(&self) -> AnnexStatus {
        self.0.status.into()
    }

    /// Plain-text terms of this `Annex`.
    #[must_use]
    pub fn terms(&self) -> &str {
        self.0.terms.as_ref()
    }

    /// Staff's `Signature` of this `Annex`.
    #[must_use]
    pub fn staff_signature(&self) -> Option<api::signature::Signature> {
        self.0.staff_signature.clone().map(Into::into)
    }

    /// Customer's `Signature` of this `Annex`.
    #[must_use]
    pub fn customer_signature(&self) -> Option<api::signature::Signature> {
        self.0.customer_signature.clone().map(Into::into)
    }

    /// `DateTime` when this `Annex` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of an `Extension`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::extension::Id)]
#[into(domain::extension::Id)]
#[graphql(name = "ExtensionId", transparent)]
pub struct Id(Uuid);

/// Status of an `Extension`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ExtensionStatus",
    with = scalar::Via::<domain::extension::Status>,
)]
pub struct Status(domain::extension::Status);

/// Unique identifier of an `Annex`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::annex::Id)]
#[into(domain::annex::Id)]
#[graphql(name = "AnnexId", transparent)]
pub struct AnnexId(Uuid);

/// Status of an `Annex`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "AnnexStatus",
    with = scalar::Via::<domain::annex::Status>,
)]
pub struct AnnexStatus(domain::annex::Status);
