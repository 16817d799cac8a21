//! [`Settlement`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, money::Currency, unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order;
#[cfg(doc)]
use crate::domain::Order;

/// Final reconciliation of an [`Order`]'s deposit against the incurred
/// [`Fees`].
///
/// There is at most one [`Settlement`] per [`Order`].
#[derive(Clone, Debug)]
pub struct Settlement {
    /// ID of this [`Settlement`].
    pub id: Id,

    /// ID of the [`Order`] this [`Settlement`] belongs to.
    pub order_id: order::Id,

    /// Deposit held for the [`Order`].
    pub total_deposit: Money,

    /// [`Fees`] incurred by the customer.
    pub fees: Fees,

    /// Signed amount to be returned: positive is a refund to the customer,
    /// negative is an amount the customer owes.
    pub final_return_amount: Money,

    /// [`State`] of this [`Settlement`].
    pub state: State,

    /// [`DateTime`] when this [`Settlement`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Settlement`] was modified last time.
    pub updated_at: ModificationDateTime,

    /// [`DateTime`] when this [`Settlement`] was closed.
    pub closed_at: Option<ClosingDateTime>,
}

impl Settlement {
    /// Creates a new [`State::Draft`] [`Settlement`].
    ///
    /// The provided [`Fees`] must be in the `total_deposit` currency.
    #[must_use]
    pub fn new(order_id: order::Id, total_deposit: Money, fees: Fees) -> Self {
        let now = DateTimeOf::now();
        Self {
            id: Id::new(),
            order_id,
            total_deposit,
            final_return_amount: fees.settle(total_deposit),
            fees,
            state: State::Draft,
            created_at: now.coerce(),
            updated_at: now,
            closed_at: None,
        }
    }

    /// Returns [`Calculation`] of this [`Settlement`].
    #[must_use]
    pub fn calculation(&self) -> Calculation {
        Calculation::split(self.final_return_amount.amount)
    }

    /// Replaces [`Fees`] of this [`Settlement`], recalculating the
    /// [`Settlement::final_return_amount`].
    ///
    /// Changed [`Fees`] require the customer to respond again, so a
    /// [`Settlement`] already presented to the customer returns to
    /// [`State::Pending`]. Identical [`Fees`] change nothing.
    ///
    /// Returns whether anything has changed.
    ///
    /// # Errors
    ///
    /// If this [`Settlement`] is [`State::Closed`] already.
    pub fn update(&mut self, fees: Fees) -> Result<bool, State> {
        use State as S;

        if self.state == S::Closed {
            return Err(self.state);
        }
        if self.fees == fees {
            return Ok(false);
        }

        self.final_return_amount = fees.settle(self.total_deposit);
        self.fees = fees;
        self.state = match self.state {
            S::Draft => S::Draft,
            S::Pending | S::AwaitingCustomer | S::Issued | S::Rejected => {
                S::Pending
            }
            S::Closed => S::Closed,
        };
        self.updated_at = DateTimeOf::now();
        Ok(true)
    }

    /// Presents this [`Settlement`] to the customer.
    ///
    /// # Errors
    ///
    /// If the current [`State`] doesn't allow this.
    pub fn submit(&mut self) -> Result<(), State> {
        self.transit(State::AwaitingCustomer, |s| {
            matches!(s, State::Draft | State::Pending | State::Rejected)
        })
    }

    /// Records the customer's response to this [`Settlement`].
    ///
    /// # Errors
    ///
    /// If this [`Settlement`] is [`State::Issued`], [`State::Rejected`] or
    /// [`State::Closed`] already.
    pub fn respond(&mut self, accept: bool) -> Result<(), State> {
        let to = if accept { State::Issued } else { State::Rejected };
        self.transit(to, |s| {
            matches!(s, State::Draft | State::Pending | State::AwaitingCustomer)
        })
    }

    /// Closes this [`Settlement`] once the refund or the collection has
    /// actually happened.
    ///
    /// # Errors
    ///
    /// If this [`Settlement`] is not [`State::Issued`].
    pub fn close(&mut self) -> Result<(), State> {
        self.transit(State::Closed, |s| s == State::Issued)?;
        self.closed_at = Some(self.updated_at.coerce());
        Ok(())
    }

    /// Moves this [`Settlement`] to the provided [`State`] if the current one
    /// satisfies the provided predicate.
    fn transit(
        &mut self,
        to: State,
        allowed: impl FnOnce(State) -> bool,
    ) -> Result<(), State> {
        if !allowed(self.state) {
            return Err(self.state);
        }
        self.state = to;
        self.updated_at = DateTimeOf::now();
        Ok(())
    }
}

/// Fees incurred by a customer during a rental.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fees {
    /// Fee for damaged devices.
    pub damage: Money,

    /// Fee for the late return.
    pub late: Money,

    /// Fee for missing accessories.
    pub accessory: Money,
}

impl Fees {
    /// Creates zero [`Fees`] in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            damage: Money::zero(currency),
            late: Money::zero(currency),
            accessory: Money::zero(currency),
        }
    }

    /// Indicates whether all these [`Fees`] are non-negative and denominated
    /// in the provided [`Currency`].
    #[must_use]
    pub fn is_valid_in(&self, currency: Currency) -> bool {
        [self.damage, self.late, self.accessory]
            .iter()
            .all(|m| m.currency == currency && !m.is_negative())
    }

    /// Settles these [`Fees`] against the provided deposit, returning the
    /// signed final return amount.
    #[must_use]
    pub fn settle(&self, deposit: Money) -> Money {
        Money {
            amount: Calculation::compute(
                deposit.amount,
                self.damage.amount,
                self.late.amount,
                self.accessory.amount,
            )
            .final_return_amount,
            currency: deposit.currency,
        }
    }
}

/// Result of a deposit settlement, in minor currency units.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Calculation {
    /// Amount to be refunded to the customer.
    ///
    /// Never negative.
    pub refund_amount: i64,

    /// Amount the customer owes.
    ///
    /// Never negative.
    pub customer_due_amount: i64,

    /// Signed difference of [`Calculation::refund_amount`] and
    /// [`Calculation::customer_due_amount`].
    pub final_return_amount: i64,
}

impl Calculation {
    /// Settles the provided deposit against the provided fees.
    ///
    /// Total: saturates instead of overflowing.
    #[must_use]
    pub fn compute(
        total_deposit: i64,
        damage_fee: i64,
        late_fee: i64,
        accessory_fee: i64,
    ) -> Self {
        let total_fees = damage_fee
            .saturating_add(late_fee)
            .saturating_add(accessory_fee);
        let diff = total_deposit.saturating_sub(total_fees);
        let refund_amount = diff.max(0);
        let customer_due_amount = diff.saturating_neg().max(0);
        Self {
            refund_amount,
            customer_due_amount,
            final_return_amount: refund_amount - customer_due_amount,
        }
    }

    /// Splits the provided signed final return amount back into the refund
    /// and the due amounts.
    #[must_use]
    pub fn split(final_return_amount: i64) -> Self {
        Self {
            refund_amount: final_return_amount.max(0),
            customer_due_amount: final_return_amount.saturating_neg().max(0),
            final_return_amount,
        }
    }
}

/// ID of a [`Settlement`].
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
    #[doc = "State of a [`Settlement`]."]
    enum State {
        #[doc = "[`Settlement`] is just created."]
        Draft = 1,

        #[doc = "[`Settlement`] is changed and should be presented again."]
        Pending = 2,

        #[doc = "[`Settlement`] awaits the customer's response."]
        AwaitingCustomer = 3,

        #[doc = "[`Settlement`] is accepted by the customer."]
        Issued = 4,

        #[doc = "[`Settlement`] is rejected by the customer."]
        Rejected = 5,

        #[doc = "Refund or collection of the [`Settlement`] has happened."]
        Closed = 6,
    }
}

/// Marker type indicating a [`Settlement`] closing.
#[derive(Clone, Copy, Debug)]
pub struct Closing;

/// [`DateTime`] when a [`Settlement`] was created.
pub type CreationDateTime = DateTimeOf<(Settlement, unit::Creation)>;

/// [`DateTime`] when a [`Settlement`] was modified.
pub type ModificationDateTime = DateTimeOf<(Settlement, unit::Modification)>;

/// [`DateTime`] when a [`Settlement`] was closed.
pub type ClosingDateTime = DateTimeOf<(Settlement, Closing)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};

    use crate::domain::order;

    use super::{Calculation, Fees, Settlement, State};

    fn vnd(amount: i64) -> Money {
        Money {
            amount,
            currency: Currency::Vnd,
        }
    }

    fn fees(damage: i64, late: i64, accessory: i64) -> Fees {
        Fees {
            damage: vnd(damage),
            late: vnd(late),
            accessory: vnd(accessory),
        }
    }

    #[test]
    fn refunds_remaining_deposit() {
        assert_eq!(
            Calculation::compute(2_000_000, 500_000, 0, 0),
            Calculation {
                refund_amount: 1_500_000,
                customer_due_amount: 0,
                final_return_amount: 1_500_000,
            },
        );
    }

    #[test]
    fn charges_fees_exceeding_deposit() {
        assert_eq!(
            Calculation::compute(1_000_000, 1_200_000, 100_000, 0),
            Calculation {
                refund_amount: 0,
                customer_due_amount: 300_000,
                final_return_amount: -300_000,
            },
        );
    }

    #[test]
    fn split_agrees_with_compute() {
        let amounts = [0, 1, 99, 100_000, 1_500_000, 2_000_000, i64::MAX / 4];
        for deposit in amounts {
            for damage in amounts {
                for late in [0, 50_000] {
                    for accessory in [0, 7] {
                        let forward = Calculation::compute(
                            deposit, damage, late, accessory,
                        );
                        assert_eq!(
                            Calculation::split(forward.final_return_amount),
                            forward,
                            "deposit={deposit} damage={damage} late={late} \
                             accessory={accessory}",
                        );
                        assert_eq!(
                            forward,
                            Calculation::compute(
                                deposit, damage, late, accessory,
                            ),
                        );
                        assert!(
                            forward.refund_amount == 0
                                || forward.customer_due_amount == 0,
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let c = Calculation::compute(0, i64::MAX, i64::MAX, i64::MAX);
        assert_eq!(c.refund_amount, 0);
        assert_eq!(c.customer_due_amount, i64::MAX);
        assert_eq!(Calculation::split(c.final_return_amount), c);
    }

    #[test]
    fn identical_update_changes_nothing() {
        let mut settlement = Settlement::new(
            order::Id::new(),
            vnd(2_000_000),
            fees(500_000, 0, 0),
        );
        settlement.submit().unwrap();
        let before = settlement.clone();

        assert_eq!(settlement.update(fees(500_000, 0, 0)), Ok(false));

        assert_eq!(settlement.state, State::AwaitingCustomer);
        assert_eq!(settlement.final_return_amount, before.final_return_amount);
        assert_eq!(settlement.updated_at, before.updated_at);
    }

    #[test]
    fn changed_update_requires_new_response() {
        let mut settlement =
            Settlement::new(order::Id::new(), vnd(2_000_000), fees(0, 0, 0));
        assert_eq!(settlement.final_return_amount, vnd(2_000_000));
        settlement.submit().unwrap();
        settlement.respond(true).unwrap();
        assert_eq!(settlement.state, State::Issued);

        assert_eq!(settlement.update(fees(0, 2_500_000, 0)), Ok(true));

        assert_eq!(settlement.state, State::Pending);
        assert_eq!(settlement.final_return_amount, vnd(-500_000));
        assert_eq!(settlement.calculation().customer_due_amount, 500_000);
    }

    #[test]
    fn workflow() {
        let mut settlement =
            Settlement::new(order::Id::new(), vnd(1_000), fees(0, 0, 0));
        assert_eq!(settlement.state, State::Draft);
        assert_eq!(settlement.close(), Err(State::Draft));

        settlement.submit().unwrap();
        settlement.respond(false).unwrap();
        assert_eq!(settlement.state, State::Rejected);
        assert_eq!(settlement.respond(true), Err(State::Rejected));

        settlement.submit().unwrap();
        settlement.respond(true).unwrap();
        assert_eq!(settlement.respond(true), Err(State::Issued));
        assert_eq!(settlement.submit(), Err(State::Issued));

        settlement.close().unwrap();
        assert_eq!(settlement.state, State::Closed);
        assert!(settlement.closed_at.is_some());
        assert_eq!(settlement.update(fees(1, 0, 0)), Err(State::Closed));
        assert_eq!(settlement.respond(false), Err(State::Closed));
    }

    #[test]
    fn validates_fees() {
        assert!(fees(1, 2, 3).is_valid_in(Currency::Vnd));
        assert!(!fees(1, 2, 3).is_valid_in(Currency::Usd));
        assert!(!fees(-1, 0, 0).is_valid_in(Currency::Vnd));
    }
}
