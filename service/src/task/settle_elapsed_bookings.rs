//! [`SettleElapsedBookings`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{By, Perform, Start},
    DateTime,
};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    infra::{database, Database},
    read,
    Service,
};
#[cfg(doc)]
use crate::domain::Booking;

use super::Task;

/// Configuration for [`SettleElapsedBookings`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between settlement sweeps.
    pub interval: time::Duration,
}

/// [`Task`] settling stored states of elapsed [`Booking`]s.
///
/// The effective status of an approved [`Booking`] whose window has ended is
/// derived as completed on every read; this sweep periodically persists that
/// derivation, so stored states catch up and history queries can filter by
/// them directly.
#[derive(Clone, Copy, Debug)]
pub struct SettleElapsedBookings<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<SettleElapsedBookings<Self>, Config>>> for Service<Db>
where
    SettleElapsedBookings<Service<Db>>:
        Task<Perform<()>, Ok = (), Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SettleElapsedBookings<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = SettleElapsedBookings {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            _ = task.execute(Perform(())).await.map_err(|e| {
                log::error!("`task::SettleElapsedBookings` failed: {e}");
            });
        }
    }
}

impl<Db> Task<Perform<()>> for SettleElapsedBookings<Service<Db>>
where
    Db: Database<
        Perform<read::booking::SettleElapsed>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let settled = self
            .service
            .database()
            .execute(Perform(read::booking::SettleElapsed {
                before: DateTime::now().coerce(),
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        if settled > 0 {
            log::debug!("settled {settled} elapsed bookings");
        }
        Ok(())
    }
}

/// Error of [`SettleElapsedBookings`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time;

    use common::{operations::Perform, DateTime};

    use crate::{
        domain::booking,
        infra::database::memory::{fixture, Memory},
        Task as _,
    };

    use super::{Config, SettleElapsedBookings};

    fn at(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    #[tokio::test]
    async fn persists_completed_only_for_elapsed_approved() {
        let db = Memory::default();
        let court = fixture::court(6, 22, 200_000);
        db.insert_court(court.clone()).await;

        let mut elapsed = fixture::booking(
            &court,
            at("2020-05-01T10:00:00Z"),
            at("2020-05-01T11:00:00Z"),
        );
        elapsed.state = booking::State::Approved;
        let mut upcoming = fixture::booking(
            &court,
            at("2099-05-01T10:00:00Z"),
            at("2099-05-01T11:00:00Z"),
        );
        upcoming.state = booking::State::Approved;
        // An elapsed pending booking is not the sweep's business.
        let stale_pending = fixture::booking(
            &court,
            at("2020-05-01T12:00:00Z"),
            at("2020-05-01T13:00:00Z"),
        );
        db.insert_booking(elapsed.clone()).await;
        db.insert_booking(upcoming.clone()).await;
        db.insert_booking(stale_pending.clone()).await;

        let (svc, _bg) = fixture::service(db.clone());
        let task = SettleElapsedBookings {
            config: Config {
                interval: time::Duration::from_secs(60 * 60),
            },
            service: svc,
        };
        task.execute(Perform(())).await.unwrap();

        assert_eq!(
            db.booking(elapsed.id).await.unwrap().state,
            booking::State::Completed,
        );
        assert_eq!(
            db.booking(upcoming.id).await.unwrap().state,
            booking::State::Approved,
        );
        assert_eq!(
            db.booking(stale_pending.id).await.unwrap().state,
            booking::State::Pending,
        );
    }
}
