//! [`Booking`] definitions.

use std::{num::NonZeroU16, str::FromStr, time::Duration as StdDuration};

use common::{define_kind, unit, Credits, DateTime, DateTimeOf};
use derive_more::{Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{court, package, user};
#[cfg(doc)]
use crate::domain::{Court, Package};

/// Reservation of a [`Court`] for a time window by a [`User`].
///
/// A [`Booking`] is created in the [`State::Pending`] stored state and is
/// never deleted afterwards, only transitioned until a terminal state is
/// reached.
///
/// [`User`]: crate::domain::user
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the [`Court`] this [`Booking`] reserves.
    pub court_id: court::Id,

    /// ID of the [`User`] who placed this [`Booking`].
    ///
    /// [`User`]: crate::domain::user
    pub user_id: user::Id,

    /// ID of the [`Package`] attached to this [`Booking`], if any.
    pub package_id: Option<package::Id>,

    /// [`DateTime`] when the reserved window starts.
    pub starts_at: StartDateTime,

    /// [`DateTime`] when the reserved window ends (exclusive).
    pub ends_at: EndDateTime,

    /// Stored [`State`] of this [`Booking`].
    pub state: State,

    /// Total amount of [`Credits`] charged for this [`Booking`].
    ///
    /// Fixed at creation. Refunds move the credit ledger, never this field.
    pub total_amount: Credits,

    /// [`Reason`] the [`Booking`] was cancelled for, if it was.
    pub cancellation_reason: Option<Reason>,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Booking`] was approved, if it was.
    pub approved_at: Option<ApprovalDateTime>,
}

impl Booking {
    /// Returns the effective [`Status`] of this [`Booking`] at the provided
    /// moment.
    ///
    /// [`Status::Active`] and [`Status::Completed`] are derived from the
    /// stored [`State`] and the reserved window, so every consumer agrees on
    /// the same derivation.
    #[must_use]
    pub fn status_at(&self, now: DateTime) -> Status {
        use State as S;

        match self.state {
            S::Pending => Status::Pending,
            S::Approved => {
                if now >= self.ends_at.coerce() {
                    Status::Completed
                } else if now >= self.starts_at.coerce() {
                    Status::Active
                } else {
                    Status::Approved
                }
            }
            S::Rejected => Status::Rejected,
            S::Cancelled => Status::Cancelled,
            S::Completed => Status::Completed,
        }
    }

    /// Returns the effective [`Status`] of this [`Booking`] right now.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status_at(DateTime::now())
    }

    /// Returns whether this [`Booking`] occupies its [`Court`]'s time window.
    ///
    /// Only [`State::BLOCKING`] bookings block the window; terminal states
    /// never do.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        State::BLOCKING.contains(&self.state)
    }

    /// Returns whether this [`Booking`]'s window overlaps the provided
    /// `[starts_at, ends_at)` one.
    #[must_use]
    pub fn overlaps(&self, starts_at: DateTime, ends_at: DateTime) -> bool {
        overlaps(
            self.starts_at.coerce(),
            self.ends_at.coerce(),
            starts_at,
            ends_at,
        )
    }
}

/// Checks whether two half-open `[start, end)` windows intersect.
///
/// Back-to-back windows (`a_end == b_start`) don't overlap.
#[must_use]
pub fn overlaps(
    a_start: DateTime,
    a_end: DateTime,
    b_start: DateTime,
    b_end: DateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// ID of a [`Booking`].
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

define_kind! {
    #[doc = "Stored state of a [`Booking`]."]
    enum State {
        #[doc = "Awaiting the [`Court`] owner's decision."]
        Pending = 1,

        #[doc = "Approved by the [`Court`] owner."]
        Approved = 2,

        #[doc = "Rejected by the [`Court`] owner. Terminal."]
        Rejected = 3,

        #[doc = "Cancelled by the [`Booking`] user or the [`Court`] owner. \
                 Terminal."]
        Cancelled = 4,

        #[doc = "The reserved window has elapsed. Terminal."]
        Completed = 5,
    }
}

impl State {
    /// Stored [`State`]s occupying a [`Court`]'s time window.
    ///
    /// The derived [`Status::Active`] is covered by [`State::Approved`].
    pub const BLOCKING: [Self; 2] = [Self::Pending, Self::Approved];
}

/// Effective status of a [`Booking`], derived from its stored [`State`] and
/// its reserved window via [`Booking::status_at()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Awaiting the [`Court`] owner's decision.
    Pending,

    /// Approved, the reserved window hasn't started yet.
    Approved,

    /// Approved and the reserved window is in progress.
    Active,

    /// The reserved window has elapsed.
    Completed,

    /// Cancelled by the [`Booking`] user or the [`Court`] owner.
    Cancelled,

    /// Rejected by the [`Court`] owner.
    Rejected,
}

/// Duration of a [`Booking`] in whole hours.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Duration(NonZeroU16);

impl Duration {
    /// One hour [`Duration`], the default for a [`Booking`].
    #[must_use]
    pub const fn one_hour() -> Self {
        Self(NonZeroU16::MIN)
    }

    /// Creates a new [`Duration`] from the given number of `hours`.
    ///
    /// [`None`] is returned if `hours` is zero.
    #[must_use]
    pub fn from_hours(hours: u16) -> Option<Self> {
        NonZeroU16::new(hours).map(Self)
    }

    /// Returns the number of whole hours of this [`Duration`].
    #[must_use]
    pub const fn hours(self) -> u16 {
        self.0.get()
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::one_hour()
    }
}

impl From<Duration> for StdDuration {
    fn from(duration: Duration) -> Self {
        Self::from_secs(u64::from(duration.hours()) * 60 * 60)
    }
}

/// Reason a [`Booking`] was cancelled for.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Reason(String);

impl Reason {
    /// Creates a new [`Reason`] if the given `reason` is valid.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Option<Self> {
        let reason = reason.into();
        Self::check(&reason).then_some(Self(reason))
    }

    /// Checks whether the given `reason` is a valid [`Reason`].
    fn check(reason: impl AsRef<str>) -> bool {
        let reason = reason.as_ref();
        reason.trim() == reason && !reason.is_empty() && reason.len() <= 512
    }
}

impl FromStr for Reason {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Reason`")
    }
}

/// Marker type indicating a [`Booking`] window start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type indicating a [`Booking`] window end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// [`DateTime`] when a [`Booking`]'s window starts.
pub type StartDateTime = DateTimeOf<(Booking, Start)>;

/// [`DateTime`] when a [`Booking`]'s window ends.
pub type EndDateTime = DateTimeOf<(Booking, End)>;

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

/// [`DateTime`] when a [`Booking`] was approved.
pub type ApprovalDateTime = DateTimeOf<(Booking, unit::Approval)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::infra::database::memory::fixture;

    use super::{overlaps, State, Status};

    fn at(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    #[test]
    fn back_to_back_windows_dont_conflict() {
        let a = (at("2099-05-01T10:00:00Z"), at("2099-05-01T11:00:00Z"));
        let b = (at("2099-05-01T11:00:00Z"), at("2099-05-01T12:00:00Z"));
        assert!(!overlaps(a.0, a.1, b.0, b.1));
        assert!(!overlaps(b.0, b.1, a.0, a.1));
    }

    #[test]
    fn one_minute_overlap_conflicts() {
        let a = (at("2099-05-01T10:00:00Z"), at("2099-05-01T11:00:00Z"));
        let b = (at("2099-05-01T10:59:00Z"), at("2099-05-01T11:30:00Z"));
        assert!(overlaps(a.0, a.1, b.0, b.1));
        assert!(overlaps(b.0, b.1, a.0, a.1));
    }

    #[test]
    fn zero_length_window_doesnt_conflict() {
        let a = (at("2099-05-01T10:00:00Z"), at("2099-05-01T11:00:00Z"));
        assert!(!overlaps(a.0, a.1, a.0, a.0));
    }

    #[test]
    fn status_derivation() {
        let court = fixture::court(6, 22, 200_000);
        let mut booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );

        assert_eq!(booking.status_at(at("2099-05-01T09:00:00Z")), Status::Pending);
        assert_eq!(booking.status_at(at("2099-05-01T10:30:00Z")), Status::Pending);

        booking.state = State::Approved;
        assert_eq!(
            booking.status_at(at("2099-05-01T09:59:59Z")),
            Status::Approved,
        );
        assert_eq!(booking.status_at(at("2099-05-01T10:00:00Z")), Status::Active);
        assert_eq!(booking.status_at(at("2099-05-01T10:59:59Z")), Status::Active);
        assert_eq!(
            booking.status_at(at("2099-05-01T11:00:00Z")),
            Status::Completed,
        );

        booking.state = State::Cancelled;
        assert_eq!(
            booking.status_at(at("2099-05-01T10:30:00Z")),
            Status::Cancelled,
        );
    }

    #[test]
    fn terminal_states_never_block() {
        let court = fixture::court(6, 22, 200_000);
        let mut booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );

        assert!(booking.is_blocking());
        booking.state = State::Approved;
        assert!(booking.is_blocking());

        for state in [State::Rejected, State::Cancelled, State::Completed] {
            booking.state = state;
            assert!(!booking.is_blocking());
        }
    }
}
