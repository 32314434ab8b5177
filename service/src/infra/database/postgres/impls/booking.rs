//! [`Booking`]-related [`Database`] implementations.

use common::operations::{By, Insert, Perform, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{
        self,
        booking::{Blocking, CourtDay, OverlapWindow, SettleElapsed},
    },
};

/// Maps a `bookings` table [`Row`] into a [`Booking`].
fn from_row(row: &Row) -> Booking {
    Booking {
        id: row.get("id"),
        court_id: row.get("court_id"),
        user_id: row.get("user_id"),
        package_id: row.get("package_id"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        state: row.get("status"),
        total_amount: row.get("total_amount"),
        cancellation_reason: row.get("cancellation_reason"),
        created_at: row.get("created_at"),
        approved_at: row.get("approved_at"),
    }
}

/// Blocking [`booking::State`]s as an `INT2[]` SQL parameter.
fn blocking_states() -> Vec<i16> {
    booking::State::BLOCKING
        .into_iter()
        .map(|s| i16::from(s.u8()))
        .collect()
}

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, court_id, user_id, package_id, \
                   starts_at, ends_at, \
                   status, total_amount, \
                   cancellation_reason, \
                   created_at, approved_at \
            FROM bookings \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Blocking<Booking>>, OverlapWindow>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Blocking<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Blocking<Booking>>, OverlapWindow>>,
    ) -> Result<Self::Ok, Self::Err> {
        let OverlapWindow {
            court_id,
            starts_at,
            ends_at,
            exclude,
        } = by.into_inner();
        let states = blocking_states();

        const SQL: &str = "\
            SELECT id, court_id, user_id, package_id, \
                   starts_at, ends_at, \
                   status, total_amount, \
                   cancellation_reason, \
                   created_at, approved_at \
            FROM bookings \
            WHERE court_id = $1::UUID \
              AND status = ANY($2::INT2[]) \
              AND starts_at < $4::TIMESTAMPTZ \
              AND ends_at > $3::TIMESTAMPTZ \
              AND ($5::UUID IS NULL OR id <> $5::UUID) \
            ORDER BY starts_at";
        Ok(self
            .query(SQL, &[&court_id, &states, &starts_at, &ends_at, &exclude])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Blocking(from_row(row)))
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Blocking<Booking>>, CourtDay>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Blocking<Booking>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Blocking<Booking>>, CourtDay>>,
    ) -> Result<Self::Ok, Self::Err> {
        let CourtDay { court_id, date } = by.into_inner();
        let day_start = date.midnight::<()>();
        let day_end = date.next().midnight::<()>();
        let states = blocking_states();

        const SQL: &str = "\
            SELECT id, court_id, user_id, package_id, \
                   starts_at, ends_at, \
                   status, total_amount, \
                   cancellation_reason, \
                   created_at, approved_at \
            FROM bookings \
            WHERE court_id = $1::UUID \
              AND status = ANY($2::INT2[]) \
              AND starts_at < $4::TIMESTAMPTZ \
              AND ends_at > $3::TIMESTAMPTZ \
            ORDER BY starts_at";
        Ok(self
            .query(SQL, &[&court_id, &states, &day_start, &day_end])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Blocking(from_row(row)))
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::list::Filter {
            user_id,
            states,
            limit,
        } = by.into_inner();
        let states = states
            .into_iter()
            .map(|s| i16::from(s.u8()))
            .collect::<Vec<_>>();
        let limit = i64::from(limit);

        const SQL: &str = "\
            SELECT id, court_id, user_id, package_id, \
                   starts_at, ends_at, \
                   status, total_amount, \
                   cancellation_reason, \
                   created_at, approved_at \
            FROM bookings \
            WHERE user_id = $1::UUID \
              AND (cardinality($2::INT2[]) = 0 \
                   OR status = ANY($2::INT2[])) \
            ORDER BY created_at DESC \
            LIMIT $3::INT8";
        Ok(self
            .query(SQL, &[&user_id, &states, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Booking>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(booking))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let Booking {
            id,
            court_id,
            user_id,
            package_id,
            starts_at,
            ends_at,
            state,
            total_amount,
            cancellation_reason,
            created_at,
            approved_at,
        } = booking;

        const SQL: &str = "\
            INSERT INTO bookings (\
                id, court_id, user_id, package_id, \
                starts_at, ends_at, \
                status, total_amount, \
                cancellation_reason, \
                created_at, approved_at \
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, \
                $7::INT2, $8::INT8, \
                $9::VARCHAR, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ \
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                cancellation_reason = EXCLUDED.cancellation_reason, \
                approved_at = EXCLUDED.approved_at";
        self.exec(
            SQL,
            &[
                &id,
                &court_id,
                &user_id,
                &package_id,
                &starts_at,
                &ends_at,
                &state,
                &total_amount,
                &cancellation_reason,
                &created_at,
                &approved_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Perform<SettleElapsed>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(settle): Perform<SettleElapsed>,
    ) -> Result<Self::Ok, Self::Err> {
        let SettleElapsed { before } = settle;
        let completed = i16::from(booking::State::Completed.u8());
        let approved = i16::from(booking::State::Approved.u8());

        const SQL: &str = "\
            UPDATE bookings \
            SET status = $2::INT2 \
            WHERE status = $3::INT2 \
              AND ends_at <= $1::TIMESTAMPTZ";
        self.exec(SQL, &[&before, &completed, &approved])
            .await
            .map_err(tracerr::wrap!())
    }
}
