//! [`Slot`] definitions.

use std::{fmt, time::Duration};

use common::{Date, DateTime};

use crate::domain::{court, Booking, Court};

/// Fixed granularity of the [`Slot`] grid.
pub const GRANULARITY: Duration = Duration::from_secs(30 * 60);

/// Number of [`GRANULARITY`] units in a day.
const UNITS_PER_DAY: u32 = 48;

/// Candidate start time within a [`Court`]'s operating hours.
///
/// [`Slot`]s are derived on demand for availability display and are never
/// persisted. The authoritative conflict decision is always re-checked at
/// reservation time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Slot {
    /// ID of the [`Court`] this [`Slot`] belongs to.
    pub court_id: court::Id,

    /// [`DateTime`] when this [`Slot`] starts.
    pub starts_at: DateTime,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.starts_at.hour(), self.starts_at.minute())
    }
}

/// Generates the [`Slot`] grid of the provided [`Court`] for the given day.
///
/// [`Slot`]s run from the [`Court`]'s opening hour (inclusive) to its closing
/// hour (exclusive of the last start), stepping by [`GRANULARITY`]. On the
/// day `now` falls on, slots whose start is not strictly in the future are
/// omitted.
///
/// This is a pure function of `(court hours, date, now)`: no side effects,
/// restartable.
#[must_use]
pub fn grid(court: &Court, date: Date, now: DateTime) -> Vec<Slot> {
    let midnight = date.midnight::<()>();
    let open = midnight + court.hours.open().since_midnight();
    let close = midnight + court.hours.close().since_midnight();

    let mut slots = Vec::new();
    let mut starts_at = open;
    while starts_at < close {
        if starts_at > now {
            slots.push(Slot {
                court_id: court.id,
                starts_at,
            });
        }
        starts_at = starts_at + GRANULARITY;
    }
    slots
}

/// Generates the [`Slot`] grid of the provided [`Court`] for the given day
/// and removes every [`Slot`] whose window overlaps a blocking [`Booking`].
///
/// Each [`GRANULARITY`] unit covered by a blocking [`Booking`]'s span is
/// marked in a day-wide bitmask first, and then grid [`Slot`]s with a marked
/// unit are dropped, keeping the sweep `O(slots + bookings · span)` rather
/// than `O(slots · bookings)`.
///
/// Non-blocking bookings are ignored.
#[must_use]
pub fn filter_available(
    court: &Court,
    date: Date,
    bookings: &[Booking],
    now: DateTime,
) -> Vec<Slot> {
    let midnight = date.midnight::<()>();
    let next_midnight = date.next().midnight::<()>();

    let mut occupied = 0u64;
    for booking in bookings.iter().filter(|b| b.is_blocking()) {
        let starts_at = booking.starts_at.coerce().max(midnight);
        let ends_at = booking.ends_at.coerce().min(next_midnight);
        if starts_at >= ends_at {
            continue;
        }

        let first = unit_of(midnight, starts_at);
        let last = unit_of(midnight, ends_at - Duration::from_secs(1));
        for unit in first..=last {
            occupied |= 1 << unit;
        }
    }

    grid(court, date, now)
        .into_iter()
        .filter(|slot| occupied & (1 << unit_of(midnight, slot.starts_at)) == 0)
        .collect()
}

/// Returns the [`GRANULARITY`] unit index of `at` within the day starting at
/// `midnight`.
fn unit_of(midnight: DateTime, at: DateTime) -> u32 {
    let unit = (at - midnight).as_secs() / GRANULARITY.as_secs();
    u32::try_from(unit).expect("unit fits a day").min(UNITS_PER_DAY - 1)
}
