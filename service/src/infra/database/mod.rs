//! [`Database`]-related implementations.

#[cfg(test)]
pub(crate) mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a bounded lock wait expiration.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        #[cfg(feature = "postgres")]
        if let Self::Postgres(e) = self {
            return e.is_lock_timeout();
        }
        false
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        #[cfg(feature = "postgres")]
        if let Self::Postgres(e) = self {
            return e.is_exclusion_violation(constraint);
        }
        #[cfg(not(feature = "postgres"))]
        let _ = constraint;
        false
    }
}
