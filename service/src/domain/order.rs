//! [`Order`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, money::Currency, unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{device, user};
#[cfg(doc)]
use crate::domain::{handover, Contract, Device, Settlement, User};

/// Rental order of [`Device`]s.
///
/// Aggregate root: every other rental entity references exactly one
/// [`Order`] and is never shared across [`Order`]s.
#[derive(Clone, Debug)]
pub struct Order {
    /// ID of this [`Order`].
    pub id: Id,

    /// ID of the customer [`User`] who placed this [`Order`].
    pub customer_id: user::Id,

    /// [`Currency`] all the amounts of this [`Order`] are denominated in.
    pub currency: Currency,

    /// Ordered lines of this [`Order`].
    ///
    /// Never empty.
    pub details: Vec<Detail>,

    /// [`Status`] of this [`Order`].
    pub status: Status,

    /// [`DateTime`] when the rental is planned to start.
    pub start_at: StartDateTime,

    /// [`DateTime`] when the rental is planned to end.
    ///
    /// Moved forward by paid extensions.
    pub end_at: EndDateTime,

    /// [`DateTime`] when the [`Device`]s were actually handed over.
    ///
    /// Absent until the checkout [`handover::Report`] is fully signed.
    pub started_at: Option<StartDateTime>,

    /// [`DateTime`] when the [`Device`]s were actually returned.
    ///
    /// Absent until the checkin [`handover::Report`] is fully signed.
    pub ended_at: Option<EndDateTime>,

    /// [`DateTime`] when the upcoming return was confirmed.
    pub return_confirmed_at: Option<ReturnConfirmationDateTime>,

    /// [`Device`]s allocated to this [`Order`] on its confirmation.
    pub devices: Vec<device::Id>,

    /// [`DateTime`] when this [`Order`] was created.
    pub created_at: CreationDateTime,
}

impl Order {
    /// Returns the rental price of all the [`Detail`]s for a single day.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn daily_price(&self) -> Option<Money> {
        Money::checked_sum(
            self.currency,
            self.details
                .iter()
                .map(|d| d.price_per_day.checked_mul(d.quantity))
                .collect::<Option<Vec<_>>>()?,
        )
    }

    /// Returns the rental price of this [`Order`] for its planned period.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn rental_price(&self) -> Option<Money> {
        self.daily_price()?
            .checked_mul(self.start_at.chargeable_days_until(&self.end_at))
    }

    /// Returns the total deposit held for this [`Order`].
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn total_deposit(&self) -> Option<Money> {
        Money::checked_sum(
            self.currency,
            self.details
                .iter()
                .map(|d| d.deposit_per_unit.checked_mul(d.quantity))
                .collect::<Option<Vec<_>>>()?,
        )
    }

    /// Returns the number of calendar days left from the provided moment to
    /// the end of this [`Order`]'s rental period.
    #[must_use]
    pub fn days_remaining<Of: ?Sized>(&self, now: &DateTimeOf<Of>) -> i64 {
        now.calendar_days_until(&self.end_at)
    }

    /// Indicates whether the provided [`Device`] is allocated to this
    /// [`Order`].
    #[must_use]
    pub fn has_device(&self, id: device::Id) -> bool {
        self.devices.contains(&id)
    }

    /// Moves this [`Order`] to the provided [`Status`].
    ///
    /// # Errors
    ///
    /// If the transition is not allowed from the current [`Status`]. This
    /// [`Order`] is left untouched in such case.
    pub fn transit(&mut self, to: Status) -> Result<(), Status> {
        if !self.status.can_transit_to(to) {
            return Err(self.status);
        }
        self.status = to;
        Ok(())
    }
}

/// Single line of an [`Order`].
///
/// Immutable once the [`Order`] leaves [`Status::PendingConfirmation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Detail {
    /// ID of the ordered [`device::Model`].
    pub model_id: device::ModelId,

    /// Number of [`Device`]s ordered.
    pub quantity: Quantity,

    /// Rental price of a single [`Device`] per day.
    pub price_per_day: Money,

    /// Deposit held for a single [`Device`].
    pub deposit_per_unit: Money,
}

/// Positive number of [`Device`]s in a [`Detail`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Quantity(i32);

impl Quantity {
    /// Creates a new [`Quantity`] if the provided `value` is positive.
    #[must_use]
    pub fn new(value: i32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns this [`Quantity`] as a [`usize`].
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or_default()
    }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self {
        q.0.into()
    }
}

/// ID of an [`Order`].
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
    #[doc = "Status of an [`Order`]."]
    enum Status {
        #[doc = "[`Order`] is placed and awaits confirmation by staff."]
        PendingConfirmation = 1,

        #[doc = "[`Order`] is confirmed and its [`Contract`] is being signed."]
        Processing = 2,

        #[doc = "[`Device`]s are handed over to the customer."]
        DeliveryConfirmed = 3,

        #[doc = "[`Device`]s are in use by the customer."]
        InUse = 4,

        #[doc = "[`Device`]s are returned and the [`Settlement`] is closed."]
        Completed = 5,

        #[doc = "[`Order`] is cancelled before the delivery."]
        Cancelled = 6,
    }
}

impl Status {
    /// Indicates whether no transitions are possible from this [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Indicates whether an [`Order`] in this [`Status`] may be cancelled.
    #[must_use]
    pub const fn is_cancellable(self) -> bool {
        matches!(self, Self::PendingConfirmation | Self::Processing)
    }

    /// Indicates whether an [`Order`] may move from this [`Status`] to the
    /// provided one.
    ///
    /// Statuses only move forward, except for the cancellation before the
    /// delivery.
    #[must_use]
    pub const fn can_transit_to(self, to: Self) -> bool {
        use Status as S;

        match (self, to) {
            (S::PendingConfirmation, S::Processing)
            | (S::Processing, S::DeliveryConfirmed)
            | (S::DeliveryConfirmed, S::InUse)
            | (S::InUse, S::Completed) => true,
            (from, S::Cancelled) => from.is_cancellable(),
            (
                S::PendingConfirmation
                | S::Processing
                | S::DeliveryConfirmed
                | S::InUse
                | S::Completed
                | S::Cancelled,
                _,
            ) => false,
        }
    }
}

/// Marker type indicating a rental period start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type indicating a rental period end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// Marker type indicating a return confirmation.
#[derive(Clone, Copy, Debug)]
pub struct ReturnConfirmation;

/// [`DateTime`] when an [`Order`] was created.
pub type CreationDateTime = DateTimeOf<(Order, unit::Creation)>;

/// [`DateTime`] when an [`Order`]'s rental period starts.
pub type StartDateTime = DateTimeOf<(Order, Start)>;

/// [`DateTime`] when an [`Order`]'s rental period ends.
pub type EndDateTime = DateTimeOf<(Order, End)>;

/// [`DateTime`] when an [`Order`]'s return was confirmed.
pub type ReturnConfirmationDateTime = DateTimeOf<(Order, ReturnConfirmation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};
    use time::macros::datetime;

    use crate::domain::{device, user};

    use super::{Detail, Id, Order, Quantity, Status};

    fn vnd(amount: i64) -> Money {
        Money {
            amount,
            currency: Currency::Vnd,
        }
    }

    fn order() -> Order {
        let at = |dt: time::OffsetDateTime| DateTime::try_from(dt).unwrap();
        Order {
            id: Id::new(),
            customer_id: user::Id::new(),
            currency: Currency::Vnd,
            details: vec![
                Detail {
                    model_id: device::ModelId::new(),
                    quantity: Quantity::new(2).unwrap(),
                    price_per_day: vnd(100_000),
                    deposit_per_unit: vnd(1_000_000),
                },
                Detail {
                    model_id: device::ModelId::new(),
                    quantity: Quantity::new(1).unwrap(),
                    price_per_day: vnd(50_000),
                    deposit_per_unit: vnd(300_000),
                },
            ],
            status: Status::PendingConfirmation,
            start_at: at(datetime!(2024-05-01 09:00 UTC)).coerce(),
            end_at: at(datetime!(2024-05-04 18:00 UTC)).coerce(),
            started_at: None,
            ended_at: None,
            return_confirmed_at: None,
            devices: vec![],
            created_at: DateTime::now().coerce(),
        }
    }

    #[test]
    fn sums_up_details() {
        let order = order();

        assert_eq!(order.daily_price(), Some(vnd(250_000)));
        assert_eq!(order.rental_price(), Some(vnd(750_000)));
        assert_eq!(order.total_deposit(), Some(vnd(2_300_000)));
    }

    #[test]
    fn counts_remaining_days_by_calendar() {
        let order = order();
        let at = |dt: time::OffsetDateTime| DateTime::try_from(dt).unwrap();
        let remaining = |dt| order.days_remaining(&at(dt));

        assert_eq!(remaining(datetime!(2024-05-01 23:00 UTC)), 3);
        assert_eq!(remaining(datetime!(2024-05-03 00:30 UTC)), 1);
        assert_eq!(remaining(datetime!(2024-05-06 12:00 UTC)), -2);
    }

    #[test]
    fn lifecycle_never_regresses() {
        use Status as S;

        for &from in S::ALL {
            for &to in S::ALL {
                if from.can_transit_to(to) && to != S::Cancelled {
                    assert!(to.u8() > from.u8(), "{from} -> {to} regresses");
                }
            }
            assert!(!from.can_transit_to(from), "{from} loops");
        }
        for &from in S::ALL {
            assert!(!S::Completed.can_transit_to(from));
            assert!(!S::Cancelled.can_transit_to(from));
        }
    }

    #[test]
    fn cancels_only_before_delivery() {
        let mut order = order();
        assert!(Status::PendingConfirmation.can_transit_to(Status::Cancelled));
        assert!(Status::Processing.can_transit_to(Status::Cancelled));
        assert!(!Status::DeliveryConfirmed.can_transit_to(Status::Cancelled));
        assert!(!Status::InUse.can_transit_to(Status::Cancelled));

        order.status = Status::DeliveryConfirmed;
        assert_eq!(
            order.transit(Status::Cancelled),
            Err(Status::DeliveryConfirmed),
        );
        assert_eq!(order.status, Status::DeliveryConfirmed);
        assert_eq!(order.transit(Status::InUse), Ok(()));
        assert_eq!(order.status, Status::InUse);
    }
}
