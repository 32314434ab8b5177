//! [`Court`]-related [`Database`] implementations.

use common::operations::{By, Lock, Select};
use tracerr::Traced;

use crate::{
    domain::{court, Court},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Court>, court::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Court>, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: court::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, \
                   open_hour, close_hour, \
                   price_per_hour, owner_id, \
                   created_at \
            FROM courts \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| {
                let hour = |column: &str| {
                    court::Hour::new(
                        u8::try_from(row.get::<_, i16>(column))
                            .unwrap_or_else(|_| {
                                panic!("`{column}` overflow")
                            }),
                    )
                    .unwrap_or_else(|| panic!("invalid `{column}`"))
                };
                Court {
                    id: row.get("id"),
                    name: row.get("name"),
                    hours: court::OperatingHours::new(
                        hour("open_hour"),
                        hour("close_hour"),
                    )
                    .expect("valid `OperatingHours`"),
                    price_per_hour: row.get("price_per_hour"),
                    owner_id: row.get("owner_id"),
                    created_at: row.get("created_at"),
                }
            }))
    }
}

impl<C> Database<Lock<By<Court, court::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Court, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: court::Id = by.into_inner();

        // Bounded wait: expiration surfaces as a retryable
        // `Error::is_lock_timeout()` error instead of a hang.
        let lock_timeout = format!(
            "SET LOCAL lock_timeout = {}",
            u64::try_from(self.lock_wait().as_millis())
                .expect("`lock_wait` fits milliseconds"),
        );
        self.exec(lock_timeout.as_str(), &[])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)?;

        const SQL: &str = "\
            INSERT INTO courts_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO NOTHING";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
