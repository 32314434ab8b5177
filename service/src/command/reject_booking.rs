//! [`Command`] for rejecting a pending [`Booking`].

use common::operations::{
    By, Commit, Lock, Perform, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, court, ledger, user, Booking, Court},
    event::Event,
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for rejecting a pending [`Booking`].
///
/// Only the owner of the booked [`Court`] may reject, and only a pending
/// [`Booking`]. Rejection is terminal and refunds the [`Booking`]'s total
/// amount in the same transaction as the state change, so the refund is
/// applied exactly once.
#[derive(Clone, Copy, Debug)]
pub struct RejectBooking {
    /// ID of the [`Booking`] to reject.
    pub booking_id: booking::Id,

    /// ID of the [`User`] rejecting the [`Booking`].
    ///
    /// [`User`]: user
    pub initiator_id: user::Id,
}

impl<Db> Command<RejectBooking> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Court, court::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Perform<ledger::Credit>, Err = Traced<database::Error>>
        + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RejectBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectBooking {
            booking_id,
            initiator_id,
        } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;

        let court = self
            .database()
            .execute(Select(By::<Option<Court>, _>::new(booking.court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(booking.court_id))
            .map_err(tracerr::wrap!())?;

        if court.owner_id != initiator_id {
            return Err(tracerr::new!(E::NotAuthorized(initiator_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serializes lifecycle transitions against concurrent reservations
        // and other transitions upon the same `Court`.
        if let Err(e) = tx.execute(Lock(By::new(court.id))).await {
            return Err(if e.as_ref().is_lock_timeout() {
                tracerr::new!(E::LockTimeout)
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            });
        }

        let mut booking = tx
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;

        let status = booking.status();
        if booking.state != booking::State::Pending {
            return Err(tracerr::new!(E::InvalidTransition(status)));
        }

        booking.state = booking::State::Rejected;

        // The refund and the state change commit or roll back together.
        tx.execute(Perform(ledger::Credit {
            user_id: booking.user_id,
            amount: booking.total_amount,
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Update(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        self.publish(Event::BookingStatusChanged {
            id: booking.id,
            state: booking.state,
        });

        Ok(booking)
    }
}

/// Error of [`RejectBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Court`] with the provided ID does not exist.
    #[display("`Court(id: {_0})` does not exist")]
    CourtNotExists(#[error(not(source))] court::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Booking`] is not in a state allowing rejection.
    #[display("`Booking` in the `{_0}` status cannot be rejected")]
    InvalidTransition(#[error(not(source))] booking::Status),

    /// Reservation lock of the [`Court`] could not be acquired in time.
    ///
    /// The only retryable outcome of this [`Command`].
    #[display("`Court` reservation lock could not be acquired in time")]
    LockTimeout,

    /// [`User`] is not the owner of the booked [`Court`].
    ///
    /// [`User`]: user
    #[display("`User(id: {_0})` is not the owner of the `Court`")]
    NotAuthorized(#[error(not(source))] user::Id),
}
