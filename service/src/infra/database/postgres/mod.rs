//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use std::time;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::{error::SqlState, NoTls};
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::{domain::Court, infra::Database};

pub use deadpool_postgres::Config as PoolConfig;
pub use refinery::embed_migrations;

pub use self::{
    client::{NonTx, Tx},
    connection::Connection,
};

/// Postgres [`Database`] client.
#[derive(Clone, Debug, Deref)]
pub struct Postgres<T = NonTx> {
    /// Underlying client of this [`Postgres`] database.
    #[deref]
    client: T,

    /// Bounded wait for row locks taken by this client.
    ///
    /// Expiration of the wait surfaces as a retryable
    /// [`Error::is_lock_timeout()`] error rather than a hang.
    lock_wait: time::Duration,
}

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .pool
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self {
            client: NonTx::from_pool(pool),
            lock_wait: conf.lock_wait,
        })
    }
}

impl<T> Postgres<T> {
    /// Returns the bounded row lock wait of this [`Postgres`] client.
    #[must_use]
    pub fn lock_wait(&self) -> time::Duration {
        self.lock_wait
    }
}

/// [`Postgres`] client configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Connection pool configuration.
    pub pool: deadpool_postgres::Config,

    /// Bounded wait for per-[`Court`] row locks.
    pub lock_wait: time::Duration,
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// [`Connection`] error.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// Error of creating a new [`connection::Pool`] client.
    #[display("Failed to create a new `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// [`connection::Pool`] error.
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),
}

impl Error {
    /// Checks if the error is an expiration of a bounded row lock wait.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::LOCK_NOT_AVAILABLE)
            }
            Self::PoolError(..) | Self::PoolCreationError(..) => false,
        }
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Connection(e) => {
                e.code() == Some(&SqlState::EXCLUSION_VIOLATION)
                    && constraint.map_or(true, |c| {
                        e.as_db_error().and_then(|e| e.constraint()) == Some(c)
                    })
            }
            Self::PoolError(..) | Self::PoolCreationError(..) => false,
        }
    }
}
