//! [`Query`] computing available [`Slot`]s of a [`Court`].

use common::{
    operations::{By, Select},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{court, slot, Booking, Court, Slot},
    infra::{database, Database},
    read::booking::{Blocking, CourtDay},
    Service,
};

use super::Query;

/// [`Query`] computing available [`Slot`]s of a [`Court`] for a day.
///
/// Advisory only: the result may be stale by the time the user reserves, so
/// the authoritative conflict decision is always re-checked at reservation
/// time under the per-[`Court`] lock. No locking here.
#[derive(Clone, Copy, Debug)]
pub struct AvailableSlots {
    /// ID of the [`Court`] to inspect.
    pub court_id: court::Id,

    /// Day to inspect.
    pub date: Date,
}

impl<Db> Query<AvailableSlots> for Service<Db>
where
    Db: Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Blocking<Booking>>, CourtDay>>,
            Ok = Vec<Blocking<Booking>>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Slot>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        query: AvailableSlots,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AvailableSlots { court_id, date } = query;

        let court = self
            .database()
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        let blocking = self
            .database()
            .execute(Select(By::<Vec<Blocking<Booking>>, _>::new(CourtDay {
                court_id,
                date,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .map(|Blocking(b)| b)
            .collect::<Vec<_>>();

        Ok(slot::filter_available(
            &court,
            date,
            &blocking,
            DateTime::now(),
        ))
    }
}

/// Error of [`AvailableSlots`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Court`] with the provided ID does not exist.
    #[display("`Court(id: {_0})` does not exist")]
    CourtNotExists(#[error(not(source))] court::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
