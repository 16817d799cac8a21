//! [`Contract`] definitions.

use std::{collections::HashMap, fmt::Write as _};

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    device,
    order::{self, Order},
    signature::{self, Refusal, Role, Signable, Signature},
};

/// Rental contract of an [`Order`], signed by its customer.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// ID of the [`Order`] this [`Contract`] is for.
    pub order_id: order::Id,

    /// [`Status`] of this [`Contract`].
    pub status: Status,

    /// Rendered [`Terms`] of this [`Contract`].
    pub terms: Terms,

    /// Customer's [`Signature`] of this [`Contract`].
    pub signature: Option<Signature>,

    /// [`DateTime`] when this [`Contract`] was created.
    pub created_at: CreationDateTime,
}

impl Contract {
    /// Generates a new [`Status::Draft`] [`Contract`] for the provided
    /// [`Order`].
    #[must_use]
    pub fn generate(
        order: &Order,
        models: &HashMap<device::ModelId, device::Model>,
    ) -> Self {
        Self {
            id: Id::new(),
            order_id: order.id,
            status: Status::Draft,
            terms: Terms::render(order, models),
            signature: None,
            created_at: DateTimeOf::now(),
        }
    }

    /// Marks this [`Contract`] as awaiting its [`Signature`], once a PIN has
    /// been issued for it.
    pub fn await_signature(&mut self) {
        if self.status == Status::Draft {
            self.status = Status::PendingSignature;
        }
    }

    /// Cancels this [`Contract`].
    ///
    /// # Errors
    ///
    /// If this [`Contract`] is signed already.
    pub fn cancel(&mut self) -> Result<(), Status> {
        if self.status == Status::Signed {
            return Err(self.status);
        }
        self.status = Status::Cancelled;
        Ok(())
    }
}

impl Signable for Contract {
    fn target(&self) -> signature::Target {
        self.id.into()
    }

    fn order_id(&self) -> order::Id {
        self.order_id
    }

    fn expects(&self, role: Role) -> Result<(), Refusal> {
        match (self.status, role) {
            (Status::Signed, _) => Err(Refusal::AlreadySigned),
            (Status::Draft | Status::PendingSignature, Role::Customer) => {
                Ok(())
            }
            (Status::Draft | Status::PendingSignature, Role::Staff)
            | (Status::Cancelled, _) => Err(Refusal::Unexpected(role)),
        }
    }

    fn sign(&mut self, signature: Signature) {
        self.signature = Some(signature);
        self.status = Status::Signed;
    }
}

/// ID of a [`Contract`].
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

/// Plain-text terms of a [`Contract`].
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

    /// Renders [`Terms`] of the provided [`Order`].
    ///
    /// [`device::Model`]s missing in the provided `models` are referred by
    /// their IDs.
    #[must_use]
    pub fn render(
        order: &Order,
        models: &HashMap<device::ModelId, device::Model>,
    ) -> Self {
        /// Formats an optional amount.
        fn money(m: Option<Money>) -> String {
            m.map_or_else(|| "-".into(), |m| m.to_string())
        }

        let mut text = String::new();
        _ = writeln!(text, "DEVICE RENTAL CONTRACT");
        _ = writeln!(text, "Order: {}", order.id);
        _ = writeln!(text, "Customer: {}", order.customer_id);
        _ = writeln!(
            text,
            "Period: {} - {}",
            order.start_at.to_rfc3339(),
            order.end_at.to_rfc3339(),
        );
        _ = writeln!(text, "Devices:");
        for (n, d) in order.details.iter().enumerate() {
            let model = models
                .get(&d.model_id)
                .map_or_else(|| d.model_id.to_string(), |m| m.name.to_string());
            _ = writeln!(
                text,
                "  {}. {model} x{}: {} per day, {} deposit per unit",
                n + 1,
                d.quantity,
                d.price_per_day,
                d.deposit_per_unit,
            );
        }
        _ = writeln!(text, "Daily price: {}", money(order.daily_price()));
        _ = writeln!(text, "Rental price: {}", money(order.rental_price()));
        _ = writeln!(text, "Total deposit: {}", money(order.total_deposit()));
        _ = write!(
            text,
            "The deposit is returned after the devices are checked in, \
             less any damage, late return and missing accessory fees.",
        );
        Self(text)
    }
}

define_kind! {
    #[doc = "Status of a [`Contract`]."]
    enum Status {
        #[doc = "[`Contract`] is generated, but no signing started yet."]
        Draft = 1,

        #[doc = "[`Contract`] awaits the customer's [`Signature`]."]
        PendingSignature = 2,

        #[doc = "[`Contract`] is signed by the customer."]
        Signed = 3,

        #[doc = "[`Contract`] is cancelled along with its [`Order`]."]
        Cancelled = 4,
    }
}

/// [`DateTime`] when a [`Contract`] was created.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use common::{money::Currency, DateTime, Money, Percent};

    use crate::domain::{
        device,
        order::{self, Detail, Order, Quantity},
        signature::{Blob, Refusal, Role, Signable as _, Signature},
        user,
    };

    use super::{Contract, Status};

    fn order(model_id: device::ModelId) -> Order {
        let vnd = |amount| Money {
            amount,
            currency: Currency::Vnd,
        };
        Order {
            id: order::Id::new(),
            customer_id: user::Id::new(),
            currency: Currency::Vnd,
            details: vec![Detail {
                model_id,
                quantity: Quantity::new(2).unwrap(),
                price_per_day: vnd(100_000),
                deposit_per_unit: vnd(1_000_000),
            }],
            status: order::Status::Processing,
            start_at: DateTime::UNIX_EPOCH.coerce(),
            end_at: DateTime::from_unix_timestamp(3 * 86_400).unwrap().coerce(),
            started_at: None,
            ended_at: None,
            return_confirmed_at: None,
            devices: vec![],
            created_at: DateTime::now().coerce(),
        }
    }

    fn signature(role: Role) -> Signature {
        Signature {
            role,
            signer_id: user::Id::new(),
            blob: Blob::new("data:image/png;base64,AAAA").unwrap(),
            signed_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn renders_terms() {
        let model_id = device::ModelId::new();
        let models = HashMap::from([(
            model_id,
            device::Model {
                id: model_id,
                name: device::ModelName::new("Drone D1").unwrap(),
                price_per_day: Money {
                    amount: 100_000,
                    currency: Currency::Vnd,
                },
                value: Money {
                    amount: 10_000_000,
                    currency: Currency::Vnd,
                },
                deposit_percent: "10".parse::<Percent>().unwrap(),
            },
        )]);

        let contract = Contract::generate(&order(model_id), &models);
        let terms: &str = contract.terms.as_ref();

        assert_eq!(contract.status, Status::Draft);
        assert!(terms.contains("1. Drone D1 x2: 100000VND per day"), "{terms}");
        assert!(terms.contains("Rental price: 600000VND"), "{terms}");
        assert!(terms.contains("Total deposit: 2000000VND"), "{terms}");
    }

    #[test]
    fn signed_by_customer_only() {
        let mut contract =
            Contract::generate(&order(device::ModelId::new()), &HashMap::new());
        contract.await_signature();
        assert_eq!(contract.status, Status::PendingSignature);

        assert_eq!(
            contract.expects(Role::Staff),
            Err(Refusal::Unexpected(Role::Staff)),
        );
        assert_eq!(contract.expects(Role::Customer), Ok(()));

        contract.sign(signature(Role::Customer));

        assert_eq!(contract.status, Status::Signed);
        assert_eq!(
            contract.expects(Role::Customer),
            Err(Refusal::AlreadySigned),
        );
        assert_eq!(contract.cancel(), Err(Status::Signed));
    }

    #[test]
    fn cancelled_contract_is_not_signable() {
        let mut contract =
            Contract::generate(&order(device::ModelId::new()), &HashMap::new());

        assert_eq!(contract.cancel(), Ok(()));
        assert_eq!(
            contract.expects(Role::Customer),
            Err(Refusal::Unexpected(Role::Customer)),
        );
    }
}
