//! PIN-based remote [`Signature`] definitions.
//!
//! Signing is a two-phase protocol: first a one-time [`Pin`] is issued for a
//! [`Target`] and delivered to the signer out-of-band, then the signer proves
//! possession of the [`Pin`] to get its [`Signature`] recorded. Only a
//! [`PinHash`] is ever stored.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Debug, Display, From};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rand::Rng as _;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use uuid::Uuid;
use xxhash_rust::xxh3;

use crate::domain::{
    annex, contract, handover, order, user, Annex, Contract, Order, User,
};
#[cfg(doc)]
use crate::domain::handover::Report;

/// Entity which may be signed.
pub trait Signable {
    /// Returns [`Target`] pointing to this [`Signable`].
    fn target(&self) -> Target;

    /// Returns ID of the [`order::Order`] this [`Signable`] belongs to.
    fn order_id(&self) -> order::Id;

    /// Checks whether this [`Signable`] currently expects a [`Signature`] of
    /// the provided [`Role`].
    ///
    /// # Errors
    ///
    /// With a [`Refusal`] describing why no [`Signature`] is expected.
    fn expects(&self, role: Role) -> Result<(), Refusal>;

    /// Records the provided [`Signature`], advancing the signing state.
    ///
    /// Must be called only after a successful [`Signable::expects()`] check
    /// for the [`Signature::role`].
    fn sign(&mut self, signature: Signature);
}

/// [`Signable`] entity of any kind.
#[derive(Clone, Debug, From)]
pub enum Document {
    /// [`Contract`] signed by the customer.
    Contract(Contract),

    /// [`Report`] signed by both sides in any order.
    HandoverReport(handover::Report),

    /// [`Annex`] signed by the staff first.
    Annex(Annex),
}

impl Signable for Document {
    fn target(&self) -> Target {
        match self {
            Self::Contract(c) => c.target(),
            Self::HandoverReport(r) => r.target(),
            Self::Annex(a) => a.target(),
        }
    }

    fn order_id(&self) -> order::Id {
        match self {
            Self::Contract(c) => c.order_id(),
            Self::HandoverReport(r) => r.order_id(),
            Self::Annex(a) => a.order_id(),
        }
    }

    fn expects(&self, role: Role) -> Result<(), Refusal> {
        match self {
            Self::Contract(c) => c.expects(role),
            Self::HandoverReport(r) => r.expects(role),
            Self::Annex(a) => a.expects(role),
        }
    }

    fn sign(&mut self, signature: Signature) {
        match self {
            Self::Contract(c) => c.sign(signature),
            Self::HandoverReport(r) => r.sign(signature),
            Self::Annex(a) => a.sign(signature),
        }
    }
}

/// Reason of a [`Signable`] refusing a [`Signature`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Refusal {
    /// The [`Signable`] is fully signed, or the [`Role`] has signed already.
    #[display("already signed")]
    AlreadySigned,

    /// The [`Signable`] awaits a [`Signature`] of another [`Role`], or is
    /// not signable at all in its current status.
    #[display("not expecting `{_0}` signature")]
    Unexpected(Role),
}

/// Pointer to a [`Signable`] entity.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, PartialEq)]
pub enum Target {
    /// [`Contract`] to be signed.
    #[display("Contract(id: {_0})")]
    Contract(contract::Id),

    /// [`Report`] to be signed.
    #[display("HandoverReport(id: {_0})")]
    HandoverReport(handover::Id),

    /// [`Annex`] to be signed.
    #[display("Annex(id: {_0})")]
    Annex(annex::Id),
}

impl Target {
    /// Returns [`TargetKind`] of this [`Target`].
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Contract(_) => TargetKind::Contract,
            Self::HandoverReport(_) => TargetKind::HandoverReport,
            Self::Annex(_) => TargetKind::Annex,
        }
    }

    /// Returns the raw [`Uuid`] of the entity this [`Target`] points to.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match *self {
            Self::Contract(id) => id.into(),
            Self::HandoverReport(id) => id.into(),
            Self::Annex(id) => id.into(),
        }
    }

    /// Reconstructs a [`Target`] from its [`TargetKind`] and raw [`Uuid`].
    #[must_use]
    pub fn from_parts(kind: TargetKind, id: Uuid) -> Self {
        match kind {
            TargetKind::Contract => Self::Contract(id.into()),
            TargetKind::HandoverReport => Self::HandoverReport(id.into()),
            TargetKind::Annex => Self::Annex(id.into()),
        }
    }
}

define_kind! {
    #[doc = "Kind of a [`Target`]."]
    enum TargetKind {
        #[doc = "[`Target::Contract`]."]
        Contract = 1,

        #[doc = "[`Target::HandoverReport`]."]
        HandoverReport = 2,

        #[doc = "[`Target::Annex`]."]
        Annex = 3,
    }
}

define_kind! {
    #[doc = "Role a [`Signature`] is given in."]
    enum Role {
        #[doc = "Rental company side."]
        Staff = 1,

        #[doc = "Customer side."]
        Customer = 2,
    }
}

impl Role {
    /// Derives the [`Role`] the provided [`User`] signs documents of the
    /// provided [`Order`] in.
    ///
    /// [`None`] is returned if the [`User`] is neither the [`Order`]'s
    /// customer nor a staff member.
    #[must_use]
    pub fn of(signer: &User, order: &Order) -> Option<Self> {
        if signer.id == order.customer_id {
            Some(Self::Customer)
        } else if signer.is_staff() {
            Some(Self::Staff)
        } else {
            None
        }
    }
}

/// Recorded signature of a [`Signable`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    /// [`Role`] this [`Signature`] was given in.
    pub role: Role,

    /// ID of the [`User`] who signed.
    pub signer_id: user::Id,

    /// Signature artifact provided by the signer.
    pub blob: Blob,

    /// [`DateTime`] when this [`Signature`] was given.
    pub signed_at: SigningDateTime,
}

/// Opaque signature artifact (for example, an encoded handwriting image).
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Blob(String);

impl Blob {
    /// Maximum length of a [`Blob`] in bytes.
    const MAX_LEN: usize = 1024 * 1024;

    /// Creates a new [`Blob`] if the given `data` is valid.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Option<Self> {
        let data = data.into();
        (!data.trim().is_empty() && data.len() <= Self::MAX_LEN)
            .then_some(Self(data))
    }
}

/// One-time code authorizing a [`Signature`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[debug("Pin(***)")]
pub struct Pin(String);

impl Pin {
    /// Allowed lengths of a [`Pin`].
    pub const LENGTHS: std::ops::RangeInclusive<usize> = 4..=12;

    /// Creates a new [`Pin`] if the given `code` consists of an allowed
    /// number of decimal digits.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Option<Self> {
        let code = code.into();
        (Self::LENGTHS.contains(&code.len())
            && code.chars().all(|c| c.is_ascii_digit()))
        .then_some(Self(code))
    }

    /// Generates a new random [`Pin`] of the provided `length`.
    ///
    /// The `length` is clamped into [`Pin::LENGTHS`].
    #[must_use]
    pub fn random(length: usize) -> Self {
        let length =
            length.clamp(*Self::LENGTHS.start(), *Self::LENGTHS.end());
        let mut rng = rand::thread_rng();
        let code = (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10_u8)))
            .collect();
        Self(code)
    }

    /// Returns the digits of this [`Pin`].
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl CloneableSecret for Pin {}
impl Zeroize for Pin {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Hash of a [`Pin`] issued for a particular [`Target`] and [`Role`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct PinHash(Uuid);

impl PinHash {
    /// Calculates a new [`PinHash`].
    #[must_use]
    pub fn new(
        target: Target,
        role: Role,
        recipient_id: user::Id,
        pin: &Pin,
    ) -> Self {
        use std::hash::Hash as _;

        // WARNING: Avoid changing the order of the fields in the hasher,
        //          because it will invalidate all the issued PINs.
        let mut hasher = xxh3::Xxh3Builder::new().build();
        target.kind().hash(&mut hasher);
        target.uuid().hash(&mut hasher);
        role.hash(&mut hasher);
        recipient_id.hash(&mut hasher);
        pin.0.hash(&mut hasher);

        Self(Uuid::from_u128(hasher.digest128()))
    }
}

/// Issued [`Pin`] awaiting its verification.
///
/// There is at most one [`Challenge`] per [`Target`] and [`Role`]: issuing
/// a new [`Pin`] supersedes the previous one.
#[derive(Clone, Debug)]
pub struct Challenge {
    /// [`Target`] the [`Pin`] was issued for.
    pub target: Target,

    /// [`Role`] the [`Pin`] authorizes to sign in.
    pub role: Role,

    /// ID of the [`User`] the [`Pin`] was delivered to.
    pub recipient_id: user::Id,

    /// [`PinHash`] of the issued [`Pin`].
    pub pin_hash: PinHash,

    /// [`DateTime`] when the [`Pin`] was issued.
    pub issued_at: IssueDateTime,

    /// [`DateTime`] when the [`Pin`] was successfully verified.
    pub consumed_at: Option<ConsumptionDateTime>,
}

impl Challenge {
    /// Creates a new [`Challenge`] for the provided freshly issued [`Pin`].
    #[must_use]
    pub fn new(
        target: Target,
        role: Role,
        recipient_id: user::Id,
        pin: &Pin,
    ) -> Self {
        Self {
            target,
            role,
            recipient_id,
            pin_hash: PinHash::new(target, role, recipient_id, pin),
            issued_at: DateTimeOf::now(),
            consumed_at: None,
        }
    }

    /// Verifies the provided [`Pin`] presented by the provided [`User`].
    ///
    /// A consumed [`Challenge`] never verifies.
    #[must_use]
    pub fn verify(&self, signer_id: user::Id, pin: &Pin) -> bool {
        self.consumed_at.is_none()
            && self.recipient_id == signer_id
            && self.pin_hash
                == PinHash::new(self.target, self.role, signer_id, pin)
    }

    /// Marks this [`Challenge`] as consumed, so it cannot be replayed.
    pub fn consume(&mut self) {
        _ = self.consumed_at.get_or_insert_with(DateTimeOf::now);
    }
}

/// Marker type indicating a [`Pin`] consumption.
#[derive(Clone, Copy, Debug)]
pub struct Consumption;

/// [`DateTime`] when a [`Signature`] was given.
pub type SigningDateTime = DateTimeOf<(Signature, unit::Completion)>;

/// [`DateTime`] when a [`Pin`] was issued.
pub type IssueDateTime = DateTimeOf<(Challenge, unit::Creation)>;

/// [`DateTime`] when a [`Pin`] was consumed.
pub type ConsumptionDateTime = DateTimeOf<(Challenge, Consumption)>;

#[cfg(test)]
mod spec {
    use crate::domain::{contract, handover, user};

    use super::{Challenge, Pin, Role, Target};

    #[test]
    fn random_pin_has_requested_digits() {
        for len in [4, 6, 12] {
            let pin = Pin::random(len);
            assert_eq!(pin.expose().len(), len);
            assert!(Pin::new(pin.expose()).is_some());
        }
        assert_eq!(Pin::random(1).expose().len(), 4);
        assert_eq!(Pin::random(40).expose().len(), 12);
    }

    #[test]
    fn pin_format() {
        assert!(Pin::new("123456").is_some());
        assert!(Pin::new("123").is_none());
        assert!(Pin::new("12345a").is_none());
        assert!(Pin::new("1234567890123").is_none());
    }

    #[test]
    fn verifies_only_issued_pin_for_its_recipient() {
        let recipient = user::Id::new();
        let target = Target::HandoverReport(handover::Id::new());
        let pin = Pin::new("482913").unwrap();

        let challenge = Challenge::new(target, Role::Customer, recipient, &pin);

        assert!(challenge.verify(recipient, &pin));
        assert!(!challenge.verify(recipient, &Pin::new("482914").unwrap()));
        assert!(!challenge.verify(user::Id::new(), &pin));
    }

    #[test]
    fn hash_is_bound_to_target_and_role() {
        let recipient = user::Id::new();
        let pin = Pin::new("1111").unwrap();
        let contract = Target::Contract(contract::Id::new());

        let for_customer =
            Challenge::new(contract, Role::Customer, recipient, &pin);
        let for_staff = Challenge::new(contract, Role::Staff, recipient, &pin);
        let for_other = Challenge::new(
            Target::Contract(contract::Id::new()),
            Role::Customer,
            recipient,
            &pin,
        );

        assert_ne!(for_customer.pin_hash, for_staff.pin_hash);
        assert_ne!(for_customer.pin_hash, for_other.pin_hash);
    }

    #[test]
    fn consumed_challenge_cannot_be_replayed() {
        let recipient = user::Id::new();
        let pin = Pin::new("9090").unwrap();
        let mut challenge = Challenge::new(
            Target::Contract(contract::Id::new()),
            Role::Customer,
            recipient,
            &pin,
        );

        challenge.consume();

        assert!(challenge.consumed_at.is_some());
        assert!(!challenge.verify(recipient, &pin));
    }
}
