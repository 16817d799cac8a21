//! [`Device`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf, Money, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical rentable device instance.
#[derive(Clone, Debug)]
pub struct Device {
    /// ID of this [`Device`].
    pub id: Id,

    /// ID of the [`Model`] of this [`Device`].
    pub model_id: ModelId,

    /// [`SerialNumber`] of this [`Device`].
    pub serial_number: SerialNumber,

    /// [`DateTime`] when this [`Device`] was registered.
    pub created_at: CreationDateTime,
}

/// ID of a [`Device`].
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
    Ord,
    PartialEq,
    PartialOrd,
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

/// Serial number of a [`Device`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Creates a new [`SerialNumber`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        let valid = !number.is_empty()
            && number.len() <= 64
            && number.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then_some(Self(number))
    }
}

impl FromStr for SerialNumber {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `SerialNumber`")
    }
}

/// Catalog model of [`Device`]s, provisioned by the external catalog.
///
/// Carries the commercial terms an order line copies at creation.
#[derive(Clone, Debug)]
pub struct Model {
    /// ID of this [`Model`].
    pub id: ModelId,

    /// [`ModelName`] of this [`Model`].
    pub name: ModelName,

    /// Rental price of a single [`Device`] of this [`Model`] per day.
    pub price_per_day: Money,

    /// Replacement value of a single [`Device`] of this [`Model`].
    pub value: Money,

    /// Share of the [`Model::value`] held as a deposit.
    pub deposit_percent: Percent,
}

impl Model {
    /// Returns the deposit held for a single [`Device`] of this [`Model`].
    #[must_use]
    pub fn deposit_per_unit(&self) -> Money {
        self.deposit_percent.of(self.value)
    }
}

/// ID of a [`Model`].
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
pub struct ModelId(Uuid);

impl ModelId {
    /// Creates a new random [`ModelId`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name of a [`Model`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ModelName(String);

impl ModelName {
    /// Creates a new [`ModelName`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (name.trim() == name && !name.is_empty() && name.len() <= 256)
            .then_some(Self(name))
    }
}

/// [`DateTime`] when a [`Device`] was registered.
pub type CreationDateTime = DateTimeOf<(Device, unit::Creation)>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{money::Currency, Money, Percent};

    use super::{Model, ModelId, ModelName, SerialNumber};

    #[test]
    fn deposit_is_truncated_share_of_value() {
        let model = Model {
            id: ModelId::new(),
            name: ModelName::new("Camera X100").unwrap(),
            price_per_day: Money {
                amount: 150_000,
                currency: Currency::Vnd,
            },
            value: Money {
                amount: 12_345_678,
                currency: Currency::Vnd,
            },
            deposit_percent: Percent::from_str("30").unwrap(),
        };

        assert_eq!(
            model.deposit_per_unit(),
            Money {
                amount: 3_703_703,
                currency: Currency::Vnd,
            },
        );
    }

    #[test]
    fn serial_number_format() {
        assert!(SerialNumber::new("CAM-0001").is_some());
        assert!(SerialNumber::new("").is_none());
        assert!(SerialNumber::new("CAM 0001").is_none());
    }
}
