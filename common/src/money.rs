//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use crate::define_kind;

/// Amount of money in some [`Currency`].
///
/// The amount is an integer number of the smallest units the [`Currency`] is
/// accounted in, so no fractional rounding ever happens inside arithmetic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`] in minor units.
    ///
    /// May be negative, meaning a debt.
    pub amount: i64,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Indicates whether this [`Money`] amount is negative.
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.amount < 0
    }

    /// Adds the provided [`Money`] to this one.
    ///
    /// [`None`] is returned if the currencies differ or on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        (self.currency == rhs.currency).then_some(())?;
        Some(Self {
            amount: self.amount.checked_add(rhs.amount)?,
            currency: self.currency,
        })
    }

    /// Multiplies this [`Money`] by the provided integer `factor`.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_mul(self, factor: impl Into<i64>) -> Option<Self> {
        Some(Self {
            amount: self.amount.checked_mul(factor.into())?,
            currency: self.currency,
        })
    }

    /// Sums up the provided [`Money`] amounts, starting from a zero in the
    /// provided [`Currency`].
    ///
    /// [`None`] is returned if any of the currencies differ or on overflow.
    #[must_use]
    pub fn checked_sum(
        currency: Currency,
        items: impl IntoIterator<Item = Self>,
    ) -> Option<Self> {
        items
            .into_iter()
            .try_fold(Self::zero(currency), Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        write!(f, "{amount}{currency}")
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() < 4 || !s.is_char_boundary(s.len() - 3) {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = i64::from_str(amount).map_err(|_| "invalid amount")?;
        let currency =
            Currency::from_str(currency).map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "Vietnamese Dong."]
        Vnd = 1,

        #[doc = "US Dollar (in cents)."]
        Usd = 2,

        #[doc = "Euro (in cents)."]
        Eur = 3,
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{amount}{currency}` format, where:
    /// - `amount` is an integer number of the currency minor units, optionally
    ///   prefixed with `-`;
    /// - `currency` is a three-letter currency code.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use super::{Currency, Money};

    fn vnd(amount: i64) -> Money {
        Money {
            amount,
            currency: Currency::Vnd,
        }
    }

    #[test]
    fn from_str() {
        assert_eq!(Money::from_str("1500000VND").unwrap(), vnd(1_500_000));
        assert_eq!(Money::from_str("-300000VND").unwrap(), vnd(-300_000));
        assert_eq!(
            Money::from_str("12345USD").unwrap(),
            Money {
                amount: 12345,
                currency: Currency::Usd,
            },
        );
        assert_eq!(
            Money::from_str("0EUR").unwrap(),
            Money::zero(Currency::Eur),
        );

        assert!(Money::from_str("123").is_err());
        assert!(Money::from_str("VND").is_err());
        assert!(Money::from_str("123.45VND").is_err());
        assert!(Money::from_str("123Vn").is_err());
        assert!(Money::from_str("123Dong").is_err());
    }

    #[test]
    fn to_string() {
        assert_eq!(vnd(1_500_000).to_string(), "1500000VND");
        assert_eq!(vnd(-300_000).to_string(), "-300000VND");
        assert_eq!(Money::zero(Currency::Usd).to_string(), "0USD");
    }

    #[test]
    fn arithmetic_requires_same_currency() {
        let usd = Money {
            amount: 100,
            currency: Currency::Usd,
        };

        assert_eq!(vnd(100).checked_add(vnd(50)), Some(vnd(150)));
        assert_eq!(vnd(100).checked_add(usd), None);
        assert_eq!(vnd(i64::MAX).checked_add(vnd(1)), None);
    }

    #[test]
    fn multiplies_and_sums() {
        assert_eq!(vnd(25_000).checked_mul(3_u32), Some(vnd(75_000)));
        assert_eq!(vnd(i64::MAX).checked_mul(2), None);

        assert_eq!(
            Money::checked_sum(Currency::Vnd, [vnd(1), vnd(2), vnd(3)]),
            Some(vnd(6)),
        );
        assert_eq!(
            Money::checked_sum(Currency::Vnd, []),
            Some(Money::zero(Currency::Vnd)),
        );
        assert_eq!(
            Money::checked_sum(
                Currency::Vnd,
                [vnd(1), Money::zero(Currency::Usd)],
            ),
            None,
        );
    }
}
