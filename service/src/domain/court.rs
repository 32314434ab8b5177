//! [`Court`] definitions.

use std::{str::FromStr, time::Duration};

use common::{unit, Credits, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;
#[cfg(doc)]
use crate::domain::Booking;

/// Bookable court.
///
/// Courts are owned and administered outside of the reservation core: from
/// this core's point of view a [`Court`] is immutable during a [`Booking`]'s
/// lifetime and is only ever read.
#[derive(Clone, Debug)]
pub struct Court {
    /// ID of this [`Court`].
    pub id: Id,

    /// [`Name`] of this [`Court`].
    pub name: Name,

    /// [`OperatingHours`] of this [`Court`].
    pub hours: OperatingHours,

    /// Price of renting this [`Court`] for one hour.
    pub price_per_hour: Credits,

    /// ID of the [`User`] owning this [`Court`].
    ///
    /// [`User`]: crate::domain::user
    pub owner_id: user::Id,

    /// [`DateTime`] when this [`Court`] was created.
    pub created_at: CreationDateTime,
}

impl Court {
    /// Returns whether the provided `[starts_at, ends_at)` window lies
    /// entirely inside this [`Court`]'s [`OperatingHours`] on the day the
    /// window starts.
    #[must_use]
    pub fn admits_window(&self, starts_at: DateTime, ends_at: DateTime) -> bool {
        let midnight = starts_at.date().midnight::<()>();
        starts_at < ends_at
            && starts_at >= midnight + self.hours.open().since_midnight()
            && ends_at <= midnight + self.hours.close().since_midnight()
    }
}

/// ID of a [`Court`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    derive_more::FromStr,
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

/// Name of a [`Court`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` is not empty.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Hour of day (0..=24) bounding a [`Court`]'s [`OperatingHours`].
#[derive(
    Clone, Copy, Debug, Display, Eq, Hash, Into, Ord, PartialEq, PartialOrd,
)]
pub struct Hour(u8);

impl Hour {
    /// Creates a new [`Hour`] if the given `hour` is valid.
    #[must_use]
    pub fn new(hour: u8) -> Option<Self> {
        (hour <= 24).then_some(Self(hour))
    }

    /// Returns this [`Hour`] as a raw hour of day.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the [`Duration`] between midnight and this [`Hour`].
    #[must_use]
    pub fn since_midnight(self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60 * 60)
    }
}

impl FromStr for Hour {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hour = s.parse().map_err(|_| "invalid `Hour`")?;
        Self::new(hour).ok_or("invalid `Hour`")
    }
}

/// Daily operating hours of a [`Court`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OperatingHours {
    /// [`Hour`] the [`Court`] opens at.
    open: Hour,

    /// [`Hour`] the [`Court`] closes at.
    close: Hour,
}

impl OperatingHours {
    /// Creates new [`OperatingHours`] if `open` is before `close`.
    #[must_use]
    pub fn new(open: Hour, close: Hour) -> Option<Self> {
        (open < close).then_some(Self { open, close })
    }

    /// Returns the [`Hour`] the [`Court`] opens at.
    #[must_use]
    pub fn open(&self) -> Hour {
        self.open
    }

    /// Returns the [`Hour`] the [`Court`] closes at.
    #[must_use]
    pub fn close(&self) -> Hour {
        self.close
    }
}

/// [`DateTime`] when a [`Court`] was created.
pub type CreationDateTime = DateTimeOf<(Court, unit::Creation)>;
