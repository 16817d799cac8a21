//! [`Settlement`]-related definitions.

use common::{DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Deposit [`Settlement`] of a returned `Order`.
#[derive(Clone, Debug, From, Into)]
pub struct Settlement(domain::Settlement);

impl Settlement {
    /// Returns the provided `amount` in the currency of this [`Settlement`].
    fn money(&self, amount: i64) -> Money {
        Money {
            amount,
            currency: self.0.total_deposit.currency,
        }
    }
}

/// Deposit `Settlement` of a returned `Order`.
#[graphql_object(context = Context)]
impl Settlement {
    /// Unique identifier of this `Settlement`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Order` this `Settlement` is for.
    #[must_use]
    pub fn order_id(&self) -> api::order::Id {
        self.0.order_id.into()
    }

    /// Deposit held for the `Order`.
    #[must_use]
    pub fn total_deposit(&self) -> Money {
        self.0.total_deposit
    }

    /// Fee for the damaged devices.
    #[must_use]
    pub fn damage_fee(&self) -> Money {
        self.0.fees.damage
    }

    /// Fee for the late return.
    #[must_use]
    pub fn late_fee(&self) -> Money {
        self.0.fees.late
    }

    /// Fee for the missing accessories.
    #[must_use]
    pub fn accessory_fee(&self) -> Money {
        self.0.fees.accessory
    }

    /// Deposit left after deducting all the fees.
    ///
    /// Negative when the fees exceed the deposit.
    #[must_use]
    pub fn final_return_amount(&self) -> Money {
        self.0.final_return_amount
    }

    /// Amount to be refunded to the customer.
    #[must_use]
    pub fn refund_amount(&self) -> Money {
        self.money(self.0.calculation().refund_amount)
    }

    /// Amount the customer owes beyond the deposit.
    #[must_use]
    pub fn customer_due_amount(&self) -> Money {
        self.money(self.0.calculation().customer_due_amount)
    }

    /// Current state of this `Settlement`.
    #[must_use]
    pub fn state(&self) -> State {
        self.0.state.into()
    }

    /// `DateTime` when this `Settlement` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Settlement` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }

    /// `DateTime` when the money transaction of this `Settlement` was
    /// confirmed.
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime> {
        self.0.closed_at.map(DateTimeOf::coerce)
    }
}

/// Unique identifier of a `Settlement`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::settlement::Id)]
#[into(domain::settlement::Id)]
#[graphql(name = "SettlementId", transparent)]
pub struct Id(Uuid);

/// State of a `Settlement`.
#[derive(AsRef, Clone, Copy, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "SettlementState",
    with = scalar::Via::<domain::settlement::State>,
)]
pub struct State(domain::settlement::State);
