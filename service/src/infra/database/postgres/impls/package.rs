//! [`Package`]-related [`Database`] implementations.

use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{package, Package},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<Package>, package::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Package>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Package>, package::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: package::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, name, price, duration_minutes \
            FROM packages \
            WHERE id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Package {
                id: row.get("id"),
                name: row.get("name"),
                price: row.get("price"),
                duration: package::Minutes::new(
                    u32::try_from(row.get::<_, i32>("duration_minutes"))
                        .expect("`duration_minutes` overflow"),
                )
                .expect("non-zero `duration_minutes`"),
            }))
    }
}
