//! [`Booking`] read model definition.

use common::Date;

use crate::domain::{booking, court};
#[cfg(doc)]
use crate::domain::{Booking, Court};

/// Wrapper around a [`Booking`] indicating that it [`is_blocking()`].
///
/// [`is_blocking()`]: Booking::is_blocking
#[derive(Clone, Copy, Debug)]
pub struct Blocking<T>(pub T);

/// Selector of blocking [`Booking`]s overlapping a [`Court`]'s time window.
///
/// The authoritative conflict re-check of a reservation attempt: executed
/// inside the reservation transaction, after the per-[`Court`] lock is
/// taken.
#[derive(Clone, Copy, Debug)]
pub struct OverlapWindow {
    /// ID of the [`Court`] to check.
    pub court_id: court::Id,

    /// Start of the candidate window (inclusive).
    pub starts_at: booking::StartDateTime,

    /// End of the candidate window (exclusive).
    pub ends_at: booking::EndDateTime,

    /// ID of a [`Booking`] to ignore.
    ///
    /// Lets an update of an existing [`Booking`] skip its own row; [`None`]
    /// on creation.
    pub exclude: Option<booking::Id>,
}

/// Selector of blocking [`Booking`]s touching a [`Court`]'s day.
///
/// Advisory only: used for availability display and never as the
/// authoritative conflict decision.
#[derive(Clone, Copy, Debug)]
pub struct CourtDay {
    /// ID of the [`Court`] to inspect.
    pub court_id: court::Id,

    /// Day to inspect.
    pub date: Date,
}

/// Selector settling stored states of elapsed [`Booking`]s.
///
/// Marks every approved [`Booking`] whose window ended not later than
/// `before` as completed.
#[derive(Clone, Copy, Debug)]
pub struct SettleElapsed {
    /// Moment the elapsed [`Booking`]s are settled against.
    pub before: booking::EndDateTime,
}

pub mod list {
    //! [`Booking`]s list definitions.

    use crate::domain::{booking, user};
    #[cfg(doc)]
    use crate::domain::Booking;

    /// Filter for a [`User`]'s [`Booking`]s history, newest first.
    ///
    /// [`User`]: crate::domain::user
    #[derive(Clone, Debug)]
    pub struct Filter {
        /// ID of the [`User`] whose [`Booking`]s are listed.
        ///
        /// [`User`]: crate::domain::user
        pub user_id: user::Id,

        /// Stored [`booking::State`]s to keep.
        ///
        /// Empty list means no filtering by state.
        pub states: Vec<booking::State>,

        /// Maximum number of [`Booking`]s to return.
        pub limit: u32,
    }
}
