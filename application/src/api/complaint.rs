//! [`Complaint`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// [`Complaint`] about a rented device.
#[derive(Clone, Debug, From, Into)]
pub struct Complaint(domain::Complaint);

/// `Complaint` about a device rented within an `Order`.
#[graphql_object(context = Context)]
impl Complaint {
    /// Unique identifier of this `Complaint`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` the device is rented within.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// ID of the device this `Complaint` is about.
    #[must_use]
    pub fn device_id(&self) -> api::device::Id {
        self.0.device_id.into()
    }

    /// `User` who filed this `Complaint`.
    #[must_use]
    pub fn author(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Complaint` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.author_id)
        }
    }

    /// Description of the problem.
    #[must_use]
    pub fn description(&self) -> &str {
        self.0.description.as_ref()
    }

    /// Current status of this `Complaint`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Description of how this `Complaint` was resolved.
    #[must_use]
    pub fn resolution(&self) -> Option<&str> {
        self.0.resolution.as_ref().map(AsRef::as_ref)
    }

    /// `DateTime` when this `Complaint` was filed.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Complaint` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Unique identifier of a `Complaint`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::complaint::Id)]
#[into(domain::complaint::Id)]
#[graphql(name = "ComplaintId", transparent)]
pub struct Id(Uuid);

/// Status of a `Complaint`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ComplaintStatus",
    with = scalar::Via::<domain::complaint::Status>,
)]
pub struct Status(domain::complaint::Status);
