//! Logistics [`Task`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order;
#[cfg(doc)]
use crate::domain::{Device, Order, Settlement};

/// Delivery or pickup of an [`Order`]'s [`Device`]s.
#[derive(Clone, Debug)]
pub struct Task {
    /// ID of this [`Task`].
    pub id: Id,

    /// ID of the [`Order`] this [`Task`] is for.
    pub order_id: order::Id,

    /// [`Category`] of this [`Task`], set once on creation.
    pub category: Category,

    /// [`Status`] of this [`Task`].
    pub status: Status,

    /// [`DateTime`] when this [`Task`] was scheduled.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Task`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Task {
    /// Indicates whether this [`Task`] confirms the [`Device`]s are
    /// retrieved back, which is required for creating a [`Settlement`].
    #[must_use]
    pub fn is_completed_pickup(&self) -> bool {
        self.category == Category::Pickup && self.status == Status::Completed
    }

    /// Moves this [`Task`] to the provided [`Status`].
    ///
    /// # Errors
    ///
    /// If the transition is not allowed from the current [`Status`].
    pub fn transit(&mut self, to: Status) -> Result<(), Status> {
        use Status as S;

        let allowed = match (self.status, to) {
            (S::Pending, S::InProgress | S::Completed | S::Cancelled)
            | (S::InProgress, S::Completed | S::Cancelled) => true,
            (S::Pending | S::InProgress | S::Completed | S::Cancelled, _) => {
                false
            }
        };
        if !allowed {
            return Err(self.status);
        }
        self.status = to;
        self.updated_at = DateTimeOf::now();
        Ok(())
    }
}

/// ID of a [`Task`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Category of a [`Task`]."]
    enum Category {
        #[doc = "[`Device`]s are delivered to the customer."]
        Delivery = 1,

        #[doc = "[`Device`]s are picked up from the customer."]
        Pickup = 2,
    }
}

define_kind! {
    #[doc = "Status of a [`Task`]."]
    enum Status {
        #[doc = "[`Task`] is scheduled."]
        Pending = 1,

        #[doc = "[`Task`] is being performed."]
        InProgress = 2,

        #[doc = "[`Task`] is done."]
        Completed = 3,

        #[doc = "[`Task`] is cancelled."]
        Cancelled = 4,
    }
}

/// [`DateTime`] when a [`Task`] was scheduled.
pub type CreationDateTime = DateTimeOf<(Task, unit::Creation)>;

/// [`DateTime`] when a [`Task`] was modified.
pub type ModificationDateTime = DateTimeOf<(Task, unit::Modification)>;
