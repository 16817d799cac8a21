//! [`Complaint`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{device, order, user};
#[cfg(doc)]
use crate::domain::{Device, Order, User};

/// Issue reported about a [`Device`] allocated to an [`Order`].
///
/// Never affects the [`Order`]'s lifecycle.
#[derive(Clone, Debug)]
pub struct Complaint {
    /// ID of this [`Complaint`].
    pub id: Id,

    /// ID of the [`Order`] the [`Device`] is allocated to.
    pub order_id: order::Id,

    /// ID of the [`Device`] this [`Complaint`] is about.
    pub device_id: device::Id,

    /// ID of the [`User`] who reported this [`Complaint`].
    pub author_id: user::Id,

    /// [`Description`] of the issue.
    pub description: Description,

    /// [`Status`] of this [`Complaint`].
    pub status: Status,

    /// Staff's note about the issue resolution.
    pub resolution: Option<Description>,

    /// [`DateTime`] when this [`Complaint`] was reported.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Complaint`] was modified last time.
    pub updated_at: ModificationDateTime,
}

impl Complaint {
    /// Moves this [`Complaint`] to the provided [`Status`], optionally
    /// replacing its resolution note.
    ///
    /// # Errors
    ///
    /// If the transition is not allowed from the current [`Status`].
    pub fn transit(
        &mut self,
        to: Status,
        resolution: Option<Description>,
    ) -> Result<(), Status> {
        if !self.status.can_transit_to(to) {
            return Err(self.status);
        }
        self.status = to;
        if resolution.is_some() {
            self.resolution = resolution;
        }
        self.updated_at = DateTimeOf::now();
        Ok(())
    }
}

/// ID of a [`Complaint`].
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

/// Description of a [`Complaint`] or its resolution.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.trim() == text && !text.is_empty() && text.len() <= 4096)
            .then_some(Self(text))
    }
}

define_kind! {
    #[doc = "Status of a [`Complaint`]."]
    enum Status {
        #[doc = "[`Complaint`] is reported and awaits staff attention."]
        Pending = 1,

        #[doc = "[`Complaint`] is being handled by staff."]
        InProgress = 2,

        #[doc = "[`Complaint`] is resolved."]
        Resolved = 3,

        #[doc = "[`Complaint`] is rejected."]
        Rejected = 4,

        #[doc = "[`Complaint`] is archived."]
        Closed = 5,
    }
}

impl Status {
    /// Indicates whether a [`Complaint`] may move from this [`Status`] to the
    /// provided one.
    #[must_use]
    pub const fn can_transit_to(self, to: Self) -> bool {
        use Status as S;

        match (self, to) {
            (S::Pending, S::InProgress | S::Rejected)
            | (S::InProgress, S::Resolved | S::Rejected)
            | (S::Resolved | S::Rejected, S::Closed) => true,
            (
                S::Pending
                | S::InProgress
                | S::Resolved
                | S::Rejected
                | S::Closed,
                _,
            ) => false,
        }
    }
}

/// [`DateTime`] when a [`Complaint`] was reported.
pub type CreationDateTime = DateTimeOf<(Complaint, unit::Creation)>;

/// [`DateTime`] when a [`Complaint`] was modified.
pub type ModificationDateTime = DateTimeOf<(Complaint, unit::Modification)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{device, order, user};

    use super::{Complaint, Description, Id, Status};

    #[test]
    fn transitions() {
        use Status as S;

        let allowed = [
            (S::Pending, S::InProgress),
            (S::Pending, S::Rejected),
            (S::InProgress, S::Resolved),
            (S::InProgress, S::Rejected),
            (S::Resolved, S::Closed),
            (S::Rejected, S::Closed),
        ];
        for &from in S::ALL {
            for &to in S::ALL {
                assert_eq!(
                    from.can_transit_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}",
                );
            }
        }
    }

    #[test]
    fn keeps_resolution_unless_replaced() {
        let now = DateTime::now();
        let mut complaint = Complaint {
            id: Id::new(),
            order_id: order::Id::new(),
            device_id: device::Id::new(),
            author_id: user::Id::new(),
            description: Description::new("Lens is scratched").unwrap(),
            status: Status::Pending,
            resolution: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        complaint.transit(Status::InProgress, None).unwrap();
        complaint
            .transit(
                Status::Resolved,
                Some(Description::new("Lens replaced").unwrap()),
            )
            .unwrap();
        complaint.transit(Status::Closed, None).unwrap();

        assert_eq!(
            complaint.resolution,
            Some(Description::new("Lens replaced").unwrap()),
        );
        assert_eq!(
            complaint.transit(Status::Pending, None),
            Err(Status::Closed),
        );
    }
}
