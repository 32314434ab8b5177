//! [`Query`] collection related to the credit ledger.

use common::operations::By;

use crate::domain::{ledger, user};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries the credit [`ledger::Balance`] of a user.
pub type OfUser =
    DatabaseQuery<By<Option<ledger::Balance>, user::Id>>;
