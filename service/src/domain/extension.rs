//! [`Extension`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{annex, order, Order};
#[cfg(doc)]
use crate::domain::Annex;

/// Proposed prolongation of an [`Order`]'s rental period, backed by an
/// [`Annex`].
#[derive(Clone, Debug)]
pub struct Extension {
    /// ID of this [`Extension`].
    pub id: Id,

    /// ID of the [`Order`] being extended.
    pub order_id: order::Id,

    /// ID of the [`Annex`] backing this [`Extension`].
    pub annex_id: annex::Id,

    /// End of the [`Order`]'s rental period before this [`Extension`].
    pub previous_end_at: order::EndDateTime,

    /// End of the [`Order`]'s rental period after this [`Extension`].
    pub new_end_at: order::EndDateTime,

    /// Price to be paid for the additional days.
    pub additional_price: Money,

    /// [`Status`] of this [`Extension`].
    pub status: Status,

    /// [`DateTime`] when this [`Extension`] was requested.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Extension`] was paid.
    pub paid_at: Option<PaymentDateTime>,
}

impl Extension {
    /// Creates a new [`Status::Draft`] [`Extension`] of the provided [`Order`]
    /// up to the provided `new_end_at`.
    ///
    /// [`None`] is returned on the price overflow.
    #[must_use]
    pub fn new(
        order: &Order,
        annex_id: annex::Id,
        new_end_at: order::EndDateTime,
    ) -> Option<Self> {
        Some(Self {
            id: Id::new(),
            order_id: order.id,
            annex_id,
            previous_end_at: order.end_at,
            new_end_at,
            additional_price: Self::price(order, new_end_at)?,
            status: Status::Draft,
            created_at: DateTimeOf::now(),
            paid_at: None,
        })
    }

    /// Calculates the price of extending the provided [`Order`] up to the
    /// provided `new_end_at`.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn price(
        order: &Order,
        new_end_at: order::EndDateTime,
    ) -> Option<Money> {
        order
            .daily_price()?
            .checked_mul(order.end_at.chargeable_days_until(&new_end_at))
    }

    /// Marks this [`Extension`] as awaiting payment, once its [`Annex`] is
    /// signed by both sides.
    pub fn await_payment(&mut self) {
        if self.status == Status::Draft {
            self.status = Status::Processing;
        }
    }

    /// Marks this [`Extension`] as paid.
    ///
    /// Returns `false` if it's paid already.
    ///
    /// # Errors
    ///
    /// If this [`Extension`] is not awaiting payment.
    pub fn pay(&mut self) -> Result<bool, Status> {
        match self.status {
            Status::Paid => Ok(false),
            Status::Processing => {
                self.status = Status::Paid;
                self.paid_at = Some(DateTimeOf::now());
                Ok(true)
            }
            s @ (Status::Draft | Status::Cancelled) => Err(s),
        }
    }

    /// Cancels this [`Extension`].
    ///
    /// # Errors
    ///
    /// If this [`Extension`] is not pending.
    pub fn cancel(&mut self) -> Result<(), Status> {
        if !self.status.is_pending() {
            return Err(self.status);
        }
        self.status = Status::Cancelled;
        Ok(())
    }
}

/// ID of an [`Extension`].
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
    #[doc = "Status of an [`Extension`]."]
    enum Status {
        #[doc = "[`Extension`] awaits its [`Annex`] to be signed."]
        Draft = 1,

        #[doc = "[`Annex`] is signed and the [`Extension`] awaits payment."]
        Processing = 2,

        #[doc = "[`Extension`] is paid and applied to the [`Order`]."]
        Paid = 3,

        #[doc = "[`Extension`] is cancelled."]
        Cancelled = 4,
    }
}

impl Status {
    /// Indicates whether an [`Extension`] in this [`Status`] is still in
    /// progress.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Draft | Self::Processing)
    }
}

/// Marker type indicating an [`Extension`] payment.
#[derive(Clone, Copy, Debug)]
pub struct Payment;

/// [`DateTime`] when an [`Extension`] was requested.
pub type CreationDateTime = DateTimeOf<(Extension, unit::Creation)>;

/// [`DateTime`] when an [`Extension`] was paid.
pub type PaymentDateTime = DateTimeOf<(Extension, Payment)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};

    use crate::domain::{
        annex, device,
        order::{self, Detail, Order, Quantity},
        user,
    };

    use super::{Extension, Status};

    const DAY: i64 = 86_400;

    fn vnd(amount: i64) -> Money {
        Money {
            amount,
            currency: Currency::Vnd,
        }
    }

    fn order() -> Order {
        Order {
            id: order::Id::new(),
            customer_id: user::Id::new(),
            currency: Currency::Vnd,
            details: vec![
                Detail {
                    model_id: device::ModelId::new(),
                    quantity: Quantity::new(3).unwrap(),
                    price_per_day: vnd(40_000),
                    deposit_per_unit: vnd(500_000),
                },
                Detail {
                    model_id: device::ModelId::new(),
                    quantity: Quantity::new(1).unwrap(),
                    price_per_day: vnd(80_000),
                    deposit_per_unit: vnd(900_000),
                },
            ],
            status: order::Status::InUse,
            start_at: DateTime::from_unix_timestamp(0).unwrap().coerce(),
            end_at: DateTime::from_unix_timestamp(10 * DAY + 3600)
                .unwrap()
                .coerce(),
            started_at: None,
            ended_at: None,
            return_confirmed_at: None,
            devices: vec![],
            created_at: DateTime::now().coerce(),
        }
    }

    fn end(secs: i64) -> order::EndDateTime {
        DateTime::from_unix_timestamp(secs).unwrap().coerce()
    }

    #[test]
    fn prices_extra_calendar_days() {
        let order = order();

        assert_eq!(
            Extension::price(&order, end(13 * DAY + 60)),
            Some(vnd(600_000)),
        );
        assert_eq!(
            Extension::price(&order, end(10 * DAY + 7200)),
            Some(vnd(200_000)),
        );
    }

    #[test]
    fn payment_is_idempotent() {
        let mut ext =
            Extension::new(&order(), annex::Id::new(), end(12 * DAY)).unwrap();
        assert_eq!(ext.status, Status::Draft);
        assert_eq!(ext.pay(), Err(Status::Draft));

        ext.await_payment();
        assert_eq!(ext.pay(), Ok(true));
        let paid_at = ext.paid_at;
        assert_eq!(ext.pay(), Ok(false));
        assert_eq!(ext.paid_at, paid_at);
        assert_eq!(ext.cancel(), Err(Status::Paid));
    }

    #[test]
    fn cancels_pending_only() {
        let mut ext =
            Extension::new(&order(), annex::Id::new(), end(12 * DAY)).unwrap();

        assert_eq!(ext.cancel(), Ok(()));
        assert_eq!(ext.cancel(), Err(Status::Cancelled));
        assert!(!ext.status.is_pending());
        assert_eq!(ext.pay(), Err(Status::Cancelled));
    }
}
