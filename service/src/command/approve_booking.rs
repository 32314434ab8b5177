//! [`Command`] for approving a pending [`Booking`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, court, user, Booking, Court},
    event::Event,
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for approving a pending [`Booking`].
///
/// Only the owner of the booked [`Court`] may approve, and only a pending
/// [`Booking`] whose window hasn't elapsed yet.
#[derive(Clone, Copy, Debug)]
pub struct ApproveBooking {
    /// ID of the [`Booking`] to approve.
    pub booking_id: booking::Id,

    /// ID of the [`User`] approving the [`Booking`].
    ///
    /// [`User`]: user
    pub initiator_id: user::Id,
}

impl<Db> Command<ApproveBooking> for Service<Db>
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
        > + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ApproveBooking,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApproveBooking {
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

        let now = DateTime::now();
        let status = booking.status_at(now);
        // An elapsed pending `Booking` cannot become active anymore, so
        // approving it is refused as well.
        if status != booking::Status::Pending
            || now >= booking.ends_at.coerce()
        {
            return Err(tracerr::new!(E::InvalidTransition(status)));
        }

        booking.state = booking::State::Approved;
        booking.approved_at = Some(now.coerce());

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

/// Error of [`ApproveBooking`] [`Command`] execution.
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

    /// [`Booking`] is not in a state allowing approval.
    #[display("`Booking` in the `{_0}` status cannot be approved")]
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

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::{
        domain::{booking, user},
        infra::database::memory::{fixture, Memory},
        Command as _,
    };

    use super::{ApproveBooking, ExecutionError as E};

    fn at(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    #[tokio::test]
    async fn owner_approves_pending_booking() {
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

        let approved = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: court.owner_id,
            })
            .await
            .unwrap();

        assert_eq!(approved.state, booking::State::Approved);
        assert!(approved.approved_at.is_some());
    }

    #[tokio::test]
    async fn only_the_court_owner_may_approve() {
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

        for initiator_id in [booking.user_id, user::Id::new()] {
            let err = svc
                .execute(ApproveBooking {
                    booking_id: booking.id,
                    initiator_id,
                })
                .await
                .unwrap_err();
            assert!(matches!(err.as_ref(), E::NotAuthorized(_)));
        }
    }

    #[tokio::test]
    async fn approving_twice_is_an_invalid_transition() {
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

        let cmd = ApproveBooking {
            booking_id: booking.id,
            initiator_id: court.owner_id,
        };
        _ = svc.execute(cmd).await.unwrap();

        let err = svc.execute(cmd).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            E::InvalidTransition(booking::Status::Approved),
        ));
    }

    #[tokio::test]
    async fn elapsed_pending_booking_cannot_be_approved() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        // A window far in the past.
        let booking = fixture::booking(
            &court,
            at("2020-05-01T10:00:00Z"),
            at("2020-05-01T11:00:00Z"),
        );
        db.insert_court(court.clone()).await;
        db.insert_booking(booking.clone()).await;
        let (svc, _bg) = fixture::service(db.clone());

        let err = svc
            .execute(ApproveBooking {
                booking_id: booking.id,
                initiator_id: court.owner_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), E::InvalidTransition(_)));
    }
}
