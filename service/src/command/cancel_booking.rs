//! [`Command`] for cancelling a [`Booking`].

use common::{
    operations::{
        By, Commit, Lock, Perform, Select, Transact, Transacted, Update,
    },
    DateTime,
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

/// [`Command`] for cancelling a [`Booking`].
///
/// Either the [`Booking`]'s user or the owner of the booked [`Court`] may
/// cancel a pending, approved or active [`Booking`]. Cancellation is
/// terminal and refunds the [`Booking`]'s total amount in the same
/// transaction as the state change, so the refund is applied exactly once.
#[derive(Clone, Debug)]
pub struct CancelBooking {
    /// ID of the [`Booking`] to cancel.
    pub booking_id: booking::Id,

    /// ID of the [`User`] cancelling the [`Booking`].
    ///
    /// [`User`]: user
    pub initiator_id: user::Id,

    /// [`booking::Reason`] of the cancellation, if provided.
    pub reason: Option<booking::Reason>,
}

impl<Db> Command<CancelBooking> for Service<Db>
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
        cmd: CancelBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelBooking {
            booking_id,
            initiator_id,
            reason,
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

        if initiator_id != booking.user_id && initiator_id != court.owner_id {
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

        let status = booking.status_at(DateTime::now());
        if !matches!(
            status,
            booking::Status::Pending
                | booking::Status::Approved
                | booking::Status::Active,
        ) {
            return Err(tracerr::new!(E::InvalidTransition(status)));
        }

        booking.state = booking::State::Cancelled;
        booking.cancellation_reason = reason;

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

/// Error of [`CancelBooking`] [`Command`] execution.
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

    /// [`Booking`] is not in a state allowing cancellation.
    #[display("`Booking` in the `{_0}` status cannot be cancelled")]
    InvalidTransition(#[error(not(source))] booking::Status),

    /// Reservation lock of the [`Court`] could not be acquired in time.
    ///
    /// The only retryable outcome of this [`Command`].
    #[display("`Court` reservation lock could not be acquired in time")]
    LockTimeout,

    /// [`User`] is neither the [`Booking`]'s user nor the [`Court`] owner.
    ///
    /// [`User`]: user
    #[display(
        "`User(id: {_0})` is neither the `Booking` user nor the `Court` owner"
    )]
    NotAuthorized(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::{Credits, DateTime};

    use crate::{
        domain::{booking, user},
        infra::database::memory::{fixture, Memory},
        Command as _,
    };

    use super::{CancelBooking, ExecutionError as E};

    fn at(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    fn credits(amount: i64) -> Credits {
        Credits::new(amount).unwrap()
    }

    #[tokio::test]
    async fn booking_user_cancels_with_a_refund() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        let booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        db.set_balance(booking.user_id, Credits::ZERO).await;
        let (svc, _bg) = fixture::service(db.clone());

        let reason = "rain".parse::<booking::Reason>().unwrap();
        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.user_id,
                reason: Some(reason.clone()),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.state, booking::State::Cancelled);
        assert_eq!(cancelled.cancellation_reason, Some(reason));
        assert_eq!(db.balance(booking.user_id).await, credits(200_000));
    }

    #[tokio::test]
    async fn court_owner_may_cancel_too() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        let mut booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        booking.state = booking::State::Approved;
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        db.set_balance(booking.user_id, Credits::ZERO).await;
        let (svc, _bg) = fixture::service(db.clone());

        let cancelled = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: court.owner_id,
                reason: None,
            })
            .await
            .unwrap();

        assert_eq!(cancelled.state, booking::State::Cancelled);
        assert_eq!(db.balance(booking.user_id).await, credits(200_000));
    }

    #[tokio::test]
    async fn strangers_cannot_cancel() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        let booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        let (svc, _bg) = fixture::service(db.clone());

        let err = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: user::Id::new(),
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn second_cancel_doesnt_refund_again() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        let booking = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        db.set_balance(booking.user_id, Credits::ZERO).await;
        let (svc, _bg) = fixture::service(db.clone());

        let cmd = CancelBooking {
            booking_id: booking.id,
            initiator_id: booking.user_id,
            reason: None,
        };
        _ = svc.execute(cmd.clone()).await.unwrap();
        assert_eq!(db.balance(booking.user_id).await, credits(200_000));

        let err = svc.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidTransition(booking::Status::Cancelled),
        ));
        assert_eq!(db.balance(booking.user_id).await, credits(200_000));
    }

    #[tokio::test]
    async fn completed_bookings_cannot_be_cancelled() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        // An approved window that has already elapsed derives as completed.
        let mut booking = fixture::booking(
            &court,
            at("2020-05-01T10:00:00Z"),
            at("2020-05-01T11:00:00Z"),
        );
        booking.state = booking::State::Approved;
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        db.set_balance(booking.user_id, Credits::ZERO).await;
        let (svc, _bg) = fixture::service(db.clone());

        let err = svc
            .execute(CancelBooking {
                booking_id: booking.id,
                initiator_id: booking.user_id,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidTransition(booking::Status::Completed),
        ));
        assert_eq!(db.balance(booking.user_id).await, Credits::ZERO);
    }
}
