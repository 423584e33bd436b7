//! Type-safe price representation in minor currency units.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors from price arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// A total overflowed the representable range.
    #[error("price arithmetic overflowed")]
    Overflow,
    /// A price would be negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A monetary amount in minor currency units (e.g., cents for USD).
///
/// Prices are stored and summed as integers; there is no floating point
/// anywhere in money handling. Payment gateways take the same integer
/// minor-unit amounts, so no conversion happens at the charge boundary.
///
/// Deserialization goes through [`Price::from_minor_units`], so a negative
/// amount can't enter through a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct Price(i64);

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let units = i64::deserialize(deserializer)?;
        Self::from_minor_units(units).map_err(serde::de::Error::custom)
    }
}

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price from minor currency units.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for negative amounts.
    pub const fn from_minor_units(units: i64) -> Result<Self, PriceError> {
        if units < 0 {
            return Err(PriceError::Negative);
        }
        Ok(Self(units))
    }

    /// Get the amount in minor currency units.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// Add another price, checking for overflow.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the sum exceeds `i64::MAX`.
    pub const fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        match self.0.checked_add(other.0) {
            Some(v) => Ok(Self(v)),
            None => Err(PriceError::Overflow),
        }
    }

    /// Multiply by a quantity, checking for overflow.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` on overflow, `PriceError::Negative`
    /// for negative quantities.
    pub const fn checked_mul(self, quantity: i64) -> Result<Self, PriceError> {
        if quantity < 0 {
            return Err(PriceError::Negative);
        }
        match self.0.checked_mul(quantity) {
            Some(v) => Ok(Self(v)),
            None => Err(PriceError::Overflow),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let units = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(units))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// ISO 4217 currency codes accepted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// The ISO 4217 code as sent to payment gateways (lowercase).
    #[must_use]
    pub const fn as_gateway_str(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(format!("unsupported currency code: {other}")),
        }
    }
}
