//! Logistics [`Task`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Delivery or pickup [`Task`] of an `Order`'s devices.
#[derive(Clone, Debug, From, Into)]
pub struct Task(domain::logistics::Task);

/// Delivery or pickup of an `Order`'s devices.
#[graphql_object(context = Context, name = "LogisticsTask")]
impl Task {
    /// Unique identifier of this `LogisticsTask`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` this `LogisticsTask` is for.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// Whether the devices are delivered or picked up.
    #[must_use]
    pub fn category(&self) -> Category {
        self.0.category.into()
    }

    /// Current status of this `LogisticsTask`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// `DateTime` when this `LogisticsTask` was scheduled.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `LogisticsTask` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Unique identifier of a `LogisticsTask`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::logistics::Id)]
#[into(domain::logistics::Id)]
#[graphql(name = "LogisticsTaskId", transparent)]
pub struct Id(Uuid);

/// Category of a `LogisticsTask`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "LogisticsTaskCategory",
    with = scalar::Via::<domain::logistics::Category>,
)]
pub struct Category(domain::logistics::Category);

/// Status of a `LogisticsTask`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "LogisticsTaskStatus",
    with = scalar::Via::<domain::logistics::Status>,
)]
pub struct Status(domain::logistics::Status);
