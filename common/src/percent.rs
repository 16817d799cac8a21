//! [`Percent`]-related definitions.

use std::str::FromStr;

use derive_more::Display;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::{prelude::ToPrimitive as _, Decimal};

use crate::Money;

/// Floating-point percentage.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Percent(Decimal);

impl Percent {
    /// Creates a new [`Percent`] by checking the provided value is within
    /// `0..=100` range.
    #[must_use]
    pub fn new(val: Decimal) -> Option<Self> {
        if val < Decimal::ZERO || val > Decimal::ONE_HUNDRED {
            None
        } else {
            #[expect(
                clippy::allow_attributes,
                reason = "TODO: Remove once clippy is fixed"
            )]
            #[allow(unsafe_code, reason = "invariants checked already")]
            Some(unsafe { Self::new_unchecked(val) })
        }
    }

    /// Creates a new [`Percent`] without performing any validation.
    ///
    /// # Safety
    ///
    /// The provided value must be within `0..=100` range.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(val: Decimal) -> Self {
        Self(val)
    }
}

impl Percent {
    /// Calculates this [`Percent`] of the provided [`Money`] amount.
    ///
    /// The result is truncated toward zero to whole minor units.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn of(self, money: Money) -> Money {
        let amount = (Decimal::from(money.amount) * self.0
            / Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .expect("cannot exceed the original amount");
        Money {
            amount,
            currency: money.currency,
        }
    }
}

impl FromStr for Percent {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s)
            .ok()
            .and_then(Self::new)
            .ok_or("invalid percent value")
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Floating-point percentage.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Percent = super::Percent;

    impl Percent {
        fn to_output<S: ScalarValue>(m: &Percent) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Percent` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Percent` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use crate::{money::Currency, Money};

    use super::Percent;

    fn vnd(amount: i64) -> Money {
        Money {
            amount,
            currency: Currency::Vnd,
        }
    }

    #[test]
    fn from_str() {
        assert!(Percent::from_str("0").is_ok());
        assert!(Percent::from_str("12.5").is_ok());
        assert!(Percent::from_str("100").is_ok());

        assert!(Percent::from_str("-1").is_err());
        assert!(Percent::from_str("100.01").is_err());
        assert!(Percent::from_str("ten").is_err());
    }

    #[test]
    fn of_truncates_toward_zero() {
        let p = |s| Percent::from_str(s).unwrap();

        assert_eq!(p("30").of(vnd(10_000_000)), vnd(3_000_000));
        assert_eq!(p("33.33").of(vnd(1_000)), vnd(333));
        assert_eq!(p("12.5").of(vnd(999)), vnd(124));
        assert_eq!(p("50").of(vnd(-3)), vnd(-1));
        assert_eq!(p("0").of(vnd(1_000)), vnd(0));
        assert_eq!(p("100").of(vnd(1_000)), vnd(1_000));
    }
}
