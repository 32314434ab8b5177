//! [`Command`] for creating a new [`Booking`].

use common::{
    operations::{
        By, Commit, Insert, Lock, Perform, Select, Transact, Transacted,
    },
    Credits, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, court, ledger, package, user, Booking, Court, Package},
    event::Event,
    infra::{database, Database},
    read::booking::{Blocking, OverlapWindow},
    Service,
};

use super::Command;

/// Name of the database constraint backstopping the conflict check.
const NO_OVERLAP_CONSTRAINT: &str = "bookings_no_overlap";

/// [`Command`] for creating a new [`Booking`].
///
/// The whole reservation is one atomic unit: the conflict re-check, the
/// credit debit and the [`Booking`] insert all happen inside a single
/// transaction serialized per [`Court`], so either everything is applied or
/// nothing is.
#[derive(Clone, Copy, Debug)]
pub struct CreateBooking {
    /// ID of the [`User`] placing the [`Booking`].
    ///
    /// [`User`]: user
    pub user_id: user::Id,

    /// ID of the [`Court`] to reserve.
    pub court_id: court::Id,

    /// [`DateTime`] when the reserved window starts.
    pub starts_at: booking::StartDateTime,

    /// [`booking::Duration`] of the reserved window.
    pub duration: booking::Duration,

    /// ID of the [`Package`] to attach, if any.
    pub package_id: Option<package::Id>,
}

impl<Db> Command<CreateBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Package>, package::Id>>,
            Ok = Option<Package>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Court, court::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Blocking<Booking>>, OverlapWindow>>,
            Ok = Vec<Blocking<Booking>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<ledger::Balance>, user::Id>>,
            Ok = Option<ledger::Balance>,
            Err = Traced<database::Error>,
        > + Database<Perform<ledger::Debit>, Ok = bool, Err = Traced<database::Error>>
        + Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBooking {
            user_id,
            court_id,
            starts_at,
            duration,
            package_id,
        } = cmd;

        let court = self
            .database()
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        if starts_at.coerce() <= now {
            return Err(tracerr::new!(E::PeriodInPast));
        }
        let ends_at: booking::EndDateTime =
            (starts_at + duration.into()).coerce();
        if !court.admits_window(starts_at.coerce(), ends_at.coerce()) {
            return Err(tracerr::new!(E::OutsideOperatingHours));
        }

        let package = match package_id {
            Some(id) => Some(
                self.database()
                    .execute(Select(By::<Option<Package>, _>::new(id)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::PackageNotExists(id))
                    .map_err(tracerr::wrap!())?,
            ),
            None => None,
        };

        let total_amount = court
            .price_per_hour
            .checked_mul(u32::from(duration.hours()))
            .and_then(|amount| {
                amount.checked_add(
                    package.as_ref().map_or(Credits::ZERO, |p| p.price),
                )
            })
            .ok_or(E::AmountOverflow)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes reservation attempts against the same `Court`, closing
        // the check-then-act race between the conflict check and the insert.
        if let Err(e) = tx.execute(Lock(By::new(court.id))).await {
            return Err(if e.as_ref().is_lock_timeout() {
                tracerr::new!(E::LockTimeout)
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            });
        }

        let conflicting = tx
            .execute(Select(By::<Vec<Blocking<Booking>>, _>::new(
                OverlapWindow {
                    court_id: court.id,
                    starts_at,
                    ends_at,
                    exclude: None,
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !conflicting.is_empty() {
            return Err(tracerr::new!(E::SlotUnavailable));
        }

        tx.execute(Select(By::<Option<ledger::Balance>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let debited = tx
            .execute(Perform(ledger::Debit {
                user_id,
                amount: total_amount,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !debited {
            return Err(tracerr::new!(E::InsufficientFunds(total_amount)));
        }

        let booking = Booking {
            id: booking::Id::new(),
            court_id: court.id,
            user_id,
            package_id: package.map(|p| p.id),
            starts_at,
            ends_at,
            state: booking::State::Pending,
            total_amount,
            cancellation_reason: None,
            created_at: now.coerce(),
            approved_at: None,
        };
        // An exclusion violation here means another transaction committed an
        // overlapping `Booking` first: the database-level backstop of the
        // conflict check.
        if let Err(e) = tx.execute(Insert(booking.clone())).await {
            return Err(map_no_overlap(e));
        }
        if let Err(e) = tx.execute(Commit).await {
            return Err(map_no_overlap(e));
        }

        self.publish(Event::BookingCreated { id: booking.id });

        Ok(booking)
    }
}

/// Maps a [`NO_OVERLAP_CONSTRAINT`] violation into
/// [`ExecutionError::SlotUnavailable`].
fn map_no_overlap(e: Traced<database::Error>) -> Traced<ExecutionError> {
    use ExecutionError as E;

    if e.as_ref().is_exclusion_violation(Some(NO_OVERLAP_CONSTRAINT)) {
        tracerr::new!(E::SlotUnavailable)
    } else {
        tracerr::map_from_and_wrap!(=> E)(e)
    }
}

/// Error of [`CreateBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Total amount of the [`Booking`] overflows.
    #[display("total `Booking` amount overflows")]
    AmountOverflow,

    /// [`Court`] with the provided ID does not exist.
    #[display("`Court(id: {_0})` does not exist")]
    CourtNotExists(#[error(not(source))] court::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`User`]'s balance holds less than the required amount.
    ///
    /// [`User`]: user
    #[display("balance holds less than the required {_0} credits")]
    InsufficientFunds(#[error(not(source))] Credits),

    /// Reservation lock of the [`Court`] could not be acquired in time.
    ///
    /// The only retryable outcome of this [`Command`].
    #[display("`Court` reservation lock could not be acquired in time")]
    LockTimeout,

    /// Requested window lies outside of the [`Court`] operating hours.
    #[display("requested window is outside of the `Court` operating hours")]
    OutsideOperatingHours,

    /// [`Package`] with the provided ID does not exist.
    #[display("`Package(id: {_0})` does not exist")]
    PackageNotExists(#[error(not(source))] package::Id),

    /// Requested window does not start strictly in the future.
    #[display("requested window does not start in the future")]
    PeriodInPast,

    /// Requested window overlaps an existing blocking [`Booking`].
    #[display("requested window is already taken")]
    SlotUnavailable,

    /// [`User`] with the provided ID does not exist.
    ///
    /// [`User`]: user
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
