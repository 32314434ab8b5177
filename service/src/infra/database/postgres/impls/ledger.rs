//! Credit ledger [`Database`] implementations.
//!
//! The two [`Perform`] implementations below are the only places where a
//! user's balance is ever written: both are single guarded SQL statements,
//! executed inside the same transaction as the booking mutation they
//! accompany.

use common::operations::{By, Perform, Select};
use tracerr::Traced;

use crate::{
    domain::{ledger, user},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Option<ledger::Balance>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ledger::Balance>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ledger::Balance>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT user_id, balance \
            FROM credits \
            WHERE user_id = $1::UUID \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| ledger::Balance {
                user_id: row.get("user_id"),
                amount: row.get("balance"),
            }))
    }
}

impl<C> Database<Perform<ledger::Debit>> for Postgres<C>
where
    C: Connection,
{
    /// Whether the debit was applied. `false` means the balance held less
    /// than the requested amount.
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(debit): Perform<ledger::Debit>,
    ) -> Result<Self::Ok, Self::Err> {
        let ledger::Debit { user_id, amount } = debit;

        // The `balance >= $2` guard makes the non-negativity check and the
        // decrement one atomic statement.
        const SQL: &str = "\
            UPDATE credits \
            SET balance = balance - $2::INT8 \
            WHERE user_id = $1::UUID \
              AND balance >= $2::INT8";
        self.exec(SQL, &[&user_id, &amount])
            .await
            .map_err(tracerr::wrap!())
            .map(|affected| affected > 0)
    }
}

impl<C> Database<Perform<ledger::Credit>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Perform(credit): Perform<ledger::Credit>,
    ) -> Result<Self::Ok, Self::Err> {
        let ledger::Credit { user_id, amount } = credit;

        const SQL: &str = "\
            INSERT INTO credits (user_id, balance) \
            VALUES ($1::UUID, $2::INT8) \
            ON CONFLICT (user_id) DO UPDATE \
            SET balance = credits.balance + EXCLUDED.balance";
        self.exec(SQL, &[&user_id, &amount])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
