//! Handover [`Report`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    device, order,
    signature::{self, Refusal, Role, Signable, Signature},
};
#[cfg(doc)]
use crate::domain::{Device, Order};

/// Signed record of a physical [`Device`]s transfer.
#[derive(Clone, Debug)]
pub struct Report {
    /// ID of this [`Report`].
    pub id: Id,

    /// ID of the [`Order`] this [`Report`] belongs to.
    pub order_id: order::Id,

    /// [`Phase`] of this [`Report`].
    pub phase: Phase,

    /// [`Status`] of this [`Report`].
    pub status: Status,

    /// Conditions of the transferred [`Device`]s.
    pub observations: Vec<Observation>,

    /// Staff's [`Signature`] of this [`Report`].
    pub staff_signature: Option<Signature>,

    /// Customer's [`Signature`] of this [`Report`].
    pub customer_signature: Option<Signature>,

    /// [`DateTime`] when this [`Report`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Report`] was signed by both sides.
    pub completed_at: Option<CompletionDateTime>,
}

impl Report {
    /// Creates a new [`Report`] awaiting [`Signature`]s of both sides.
    #[must_use]
    pub fn new(
        order_id: order::Id,
        phase: Phase,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            id: Id::new(),
            order_id,
            phase,
            status: Status::PendingSignature,
            observations,
            staff_signature: None,
            customer_signature: None,
            created_at: DateTimeOf::now(),
            completed_at: None,
        }
    }

    /// Indicates whether this [`Report`] is signed by both sides.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }
}

impl Signable for Report {
    fn target(&self) -> signature::Target {
        self.id.into()
    }

    fn order_id(&self) -> order::Id {
        self.order_id
    }

    fn expects(&self, role: Role) -> Result<(), Refusal> {
        let signed = match role {
            Role::Staff => self.staff_signature.is_some(),
            Role::Customer => self.customer_signature.is_some(),
        };
        if signed || self.is_completed() {
            Err(Refusal::AlreadySigned)
        } else {
            Ok(())
        }
    }

    fn sign(&mut self, signature: Signature) {
        let signed_at = signature.signed_at;
        match signature.role {
            Role::Staff => self.staff_signature = Some(signature),
            Role::Customer => self.customer_signature = Some(signature),
        }
        self.status = match (&self.staff_signature, &self.customer_signature)
        {
            (Some(_), Some(_)) => Status::Completed,
            (Some(_), None) => Status::StaffSigned,
            (None, Some(_)) => Status::CustomerSigned,
            (None, None) => Status::PendingSignature,
        };
        if self.is_completed() {
            self.completed_at = Some(signed_at.coerce());
        }
    }
}

/// Observed condition of a single transferred [`Device`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Observation {
    /// ID of the observed [`Device`].
    pub device_id: device::Id,

    /// [`Condition`] of the [`Device`].
    pub condition: Condition,

    /// Optional free-form [`Note`].
    pub note: Option<Note>,
}

/// ID of a [`Report`].
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

/// Free-form note of an [`Observation`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Note(String);

impl Note {
    /// Creates a new [`Note`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (text.trim() == text && !text.is_empty() && text.len() <= 2048)
            .then_some(Self(text))
    }
}

define_kind! {
    #[doc = "Phase of a [`Report`]."]
    enum Phase {
        #[doc = "[`Device`]s are handed to the customer."]
        Checkout = 1,

        #[doc = "[`Device`]s are retrieved from the customer."]
        Checkin = 2,
    }
}

define_kind! {
    #[doc = "Status of a [`Report`]."]
    enum Status {
        #[doc = "No side has signed the [`Report`] yet."]
        PendingSignature = 1,

        #[doc = "Only the staff has signed the [`Report`]."]
        StaffSigned = 2,

        #[doc = "Only the customer has signed the [`Report`]."]
        CustomerSigned = 3,

        #[doc = "Both sides have signed the [`Report`]."]
        Completed = 4,
    }
}

define_kind! {
    #[doc = "Condition of a [`Device`] in an [`Observation`]."]
    enum Condition {
        #[doc = "No visible issues."]
        Good = 1,

        #[doc = "Cosmetic damage not affecting the operation."]
        MinorDamage = 2,

        #[doc = "Damage affecting the operation."]
        MajorDamage = 3,

        #[doc = "Some accessories are missing."]
        MissingAccessories = 4,

        #[doc = "[`Device`] is not returned."]
        Lost = 5,
    }
}

/// [`DateTime`] when a [`Report`] was created.
pub type CreationDateTime = DateTimeOf<(Report, unit::Creation)>;

/// [`DateTime`] when a [`Report`] was signed by both sides.
pub type CompletionDateTime = DateTimeOf<(Report, unit::Completion)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::{
        order,
        signature::{Blob, Refusal, Role, Signable as _, Signature},
        user,
    };

    use super::{Phase, Report, Status};

    fn signature(role: Role) -> Signature {
        Signature {
            role,
            signer_id: user::Id::new(),
            blob: Blob::new("signed").unwrap(),
            signed_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn completes_after_both_sides_in_any_order() {
        for (first, second, intermediate) in [
            (Role::Staff, Role::Customer, Status::StaffSigned),
            (Role::Customer, Role::Staff, Status::CustomerSigned),
        ] {
            let mut report =
                Report::new(order::Id::new(), Phase::Checkout, vec![]);
            assert_eq!(report.status, Status::PendingSignature);

            assert_eq!(report.expects(first), Ok(()));
            report.sign(signature(first));
            assert_eq!(report.status, intermediate);
            assert!(report.completed_at.is_none());

            assert_eq!(report.expects(first), Err(Refusal::AlreadySigned));
            assert_eq!(report.expects(second), Ok(()));
            report.sign(signature(second));

            assert_eq!(report.status, Status::Completed);
            assert!(report.completed_at.is_some());
            assert_eq!(report.expects(first), Err(Refusal::AlreadySigned));
            assert_eq!(report.expects(second), Err(Refusal::AlreadySigned));
        }
    }
}
