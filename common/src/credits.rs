//! [`Credits`]-related definitions.

use std::{fmt, str::FromStr};

use derive_more::Into;
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Non-negative amount of booking credits.
///
/// Credits are the only currency of the platform: court time and add-on
/// packages are priced in them, and every user owns a single [`Credits`]
/// balance.
#[derive(Clone, Copy, Debug, Default, Eq, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct Credits(i64);

impl Credits {
    /// Zero [`Credits`].
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Credits`] amount.
    ///
    /// [`None`] is returned if the given `amount` is negative.
    #[must_use]
    pub fn new(amount: i64) -> Option<Self> {
        (amount >= 0).then_some(Self(amount))
    }

    /// Returns the raw amount of these [`Credits`].
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Adds the given [`Credits`] to these ones.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Subtracts the given [`Credits`] from these ones.
    ///
    /// [`None`] is returned if the result would be negative.
    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).and_then(Self::new)
    }

    /// Multiplies these [`Credits`] by the given factor.
    ///
    /// [`None`] is returned on overflow.
    #[must_use]
    pub fn checked_mul(self, factor: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(factor)).map(Self)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Credits {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = i64::from_str(s).map_err(|_| "invalid amount")?;
        Self::new(amount).ok_or("negative amount")
    }
}

impl TryFrom<i64> for Credits {
    type Error = &'static str;

    fn try_from(amount: i64) -> Result<Self, Self::Error> {
        Self::new(amount).ok_or("negative amount")
    }
}
