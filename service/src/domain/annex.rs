//! [`Annex`] definitions.

use std::fmt::Write as _;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    contract, extension, order,
    signature::{self, Refusal, Role, Signable, Signature},
    Extension,
};
#[cfg(doc)]
use crate::domain::{Contract, Order};

/// Contractual addendum documenting an [`Extension`] of a [`Contract`].
///
/// Signed by the staff first, and by the customer afterwards.
#[derive(Clone, Debug)]
pub struct Annex {
    /// ID of this [`Annex`].
    pub id: Id,

    /// ID of the [`Extension`] this [`Annex`] documents.
    pub extension_id: extension::Id,

    /// ID of the [`Order`] being extended.
    pub order_id: order::Id,

    /// ID of the signed [`Contract`] this [`Annex`] amends.
    pub contract_id: contract::Id,

    /// [`Status`] of this [`Annex`].
    pub status: Status,

    /// Rendered [`Terms`] of this [`Annex`].
    pub terms: Terms,

    /// Staff's [`Signature`] of this [`Annex`].
    pub staff_signature: Option<Signature>,

    /// Customer's [`Signature`] of this [`Annex`].
    pub customer_signature: Option<Signature>,

    /// [`DateTime`] when this [`Annex`] was created.
    pub created_at: CreationDateTime,
}

impl Annex {
    /// Creates a new [`Annex`] documenting the provided [`Extension`].
    #[must_use]
    pub fn new(
        id: Id,
        extension: &Extension,
        contract_id: contract::Id,
    ) -> Self {
        Self {
            id,
            extension_id: extension.id,
            order_id: extension.order_id,
            contract_id,
            status: Status::PendingAdminSignature,
            terms: Terms::render(extension, contract_id),
            staff_signature: None,
            customer_signature: None,
            created_at: DateTimeOf::now(),
        }
    }

    /// Cancels this [`Annex`] along with its unpaid [`Extension`].
    ///
    /// An [`Status::Active`] [`Annex`] is cancelled too, as it has no effect
    /// until the [`Extension`] is paid.
    pub fn cancel(&mut self) {
        self.status = Status::Cancelled;
    }
}

impl Signable for Annex {
    fn target(&self) -> signature::Target {
        self.id.into()
    }

    fn order_id(&self) -> order::Id {
        self.order_id
    }

    fn expects(&self, role: Role) -> Result<(), Refusal> {
        use Status as S;

        match (self.status, role) {
            (S::PendingAdminSignature, Role::Staff)
            | (S::PendingCustomerSignature, Role::Customer) => Ok(()),
            (S::PendingCustomerSignature, Role::Staff) | (S::Active, _) => {
                Err(Refusal::AlreadySigned)
            }
            (S::PendingAdminSignature, Role::Customer) | (S::Cancelled, _) => {
                Err(Refusal::Unexpected(role))
            }
        }
    }

    fn sign(&mut self, signature: Signature) {
        match signature.role {
            Role::Staff => {
                self.staff_signature = Some(signature);
                self.status = Status::PendingCustomerSignature;
            }
            Role::Customer => {
                self.customer_signature = Some(signature);
                self.status = Status::Active;
            }
        }
    }
}

/// ID of an [`Annex`].
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

/// Plain-text terms of an [`Annex`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Terms(String);

impl Terms {
    /// Creates new [`Terms`] out of the already rendered `text`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `text` was rendered by
    /// [`Terms::render()`].
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Renders [`Terms`] of the provided [`Extension`].
    #[must_use]
    pub fn render(extension: &Extension, contract_id: contract::Id) -> Self {
        let mut text = String::new();
        _ = writeln!(text, "RENTAL CONTRACT ANNEX");
        _ = writeln!(text, "Contract: {contract_id}");
        _ = writeln!(text, "Order: {}", extension.order_id);
        _ = writeln!(
            text,
            "Previous end: {}",
            extension.previous_end_at.to_rfc3339(),
        );
        _ = writeln!(text, "New end: {}", extension.new_end_at.to_rfc3339());
        _ = write!(text, "Additional price: {}", extension.additional_price);
        Self(text)
    }
}

define_kind! {
    #[doc = "Status of an [`Annex`]."]
    enum Status {
        #[doc = "[`Annex`] awaits the staff's [`Signature`]."]
        PendingAdminSignature = 1,

        #[doc = "[`Annex`] awaits the customer's [`Signature`]."]
        PendingCustomerSignature = 2,

        #[doc = "[`Annex`] is signed by both sides."]
        Active = 3,

        #[doc = "[`Annex`] is cancelled along with its [`Extension`]."]
        Cancelled = 4,
    }
}

/// [`DateTime`] when an [`Annex`] was created.
pub type CreationDateTime = DateTimeOf<(Annex, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};

    use crate::domain::{
        contract, extension, order,
        signature::{Blob, Refusal, Role, Signable as _, Signature},
        user, Extension,
    };

    use super::{Annex, Id, Status};

    fn annex() -> Annex {
        let id = Id::new();
        let extension = Extension {
            id: extension::Id::new(),
            order_id: order::Id::new(),
            annex_id: id,
            previous_end_at: DateTime::UNIX_EPOCH.coerce(),
            new_end_at: DateTime::from_unix_timestamp(86_400).unwrap().coerce(),
            additional_price: Money {
                amount: 200_000,
                currency: Currency::Vnd,
            },
            status: extension::Status::Draft,
            created_at: DateTime::now().coerce(),
            paid_at: None,
        };
        Annex::new(id, &extension, contract::Id::new())
    }

    fn signature(role: Role) -> Signature {
        Signature {
            role,
            signer_id: user::Id::new(),
            blob: Blob::new("signed").unwrap(),
            signed_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn staff_signs_first() {
        let mut annex = annex();
        assert_eq!(annex.status, Status::PendingAdminSignature);
        assert_eq!(
            annex.expects(Role::Customer),
            Err(Refusal::Unexpected(Role::Customer)),
        );
        assert_eq!(annex.expects(Role::Staff), Ok(()));

        annex.sign(signature(Role::Staff));
        assert_eq!(annex.status, Status::PendingCustomerSignature);
        assert_eq!(annex.expects(Role::Staff), Err(Refusal::AlreadySigned));
        assert_eq!(annex.expects(Role::Customer), Ok(()));

        annex.sign(signature(Role::Customer));
        assert_eq!(annex.status, Status::Active);
        assert_eq!(annex.expects(Role::Customer), Err(Refusal::AlreadySigned));
    }

    #[test]
    fn cancelled_annex_is_not_signable() {
        let mut annex = annex();
        annex.cancel();

        assert_eq!(annex.status, Status::Cancelled);
        assert_eq!(
            annex.expects(Role::Staff),
            Err(Refusal::Unexpected(Role::Staff)),
        );
    }

    #[test]
    fn renders_terms() {
        let terms = annex().terms;
        let text: &str = terms.as_ref();

        assert!(text.contains("Additional price: 200000VND"), "{text}");
        assert!(text.contains("New end: 1970-01-02T00:00:00Z"), "{text}");
    }
}
