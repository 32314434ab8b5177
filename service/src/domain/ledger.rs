//! Credit ledger definitions.
//!
//! The ledger owns every user's credit [`Balance`] and is its single
//! mutation entry point: balances are only ever moved by executing a
//! [`Debit`] or a [`Credit`] operation against the database, never by
//! reading and writing the raw value at a call site.

use common::Credits;

use crate::domain::user;
#[cfg(doc)]
use crate::domain::Booking;

/// Credit balance of a [`User`].
///
/// Never negative: a [`Debit`] bringing the balance below zero is refused
/// as a whole.
///
/// [`User`]: user
#[derive(Clone, Copy, Debug)]
pub struct Balance {
    /// ID of the [`User`] owning this [`Balance`].
    ///
    /// [`User`]: user
    pub user_id: user::Id,

    /// Amount of [`Credits`] on this [`Balance`].
    pub amount: Credits,
}

/// Operation atomically decreasing a [`User`]'s [`Balance`].
///
/// Refused when the [`Balance`] holds less than `amount`. Always executed
/// in the same transaction as the [`Booking`] mutation it pays for.
///
/// [`User`]: user
#[derive(Clone, Copy, Debug)]
pub struct Debit {
    /// ID of the [`User`] to debit.
    ///
    /// [`User`]: user
    pub user_id: user::Id,

    /// Amount of [`Credits`] to debit.
    pub amount: Credits,
}

/// Operation atomically increasing a [`User`]'s [`Balance`].
///
/// Used only for refunds, always with the exact amount previously debited
/// for the [`Booking`] being reversed, and always in the same transaction
/// as the status change triggering the refund.
///
/// [`User`]: user
#[derive(Clone, Copy, Debug)]
pub struct Credit {
    /// ID of the [`User`] to credit.
    ///
    /// [`User`]: user
    pub user_id: user::Id,

    /// Amount of [`Credits`] to credit.
    pub amount: Credits,
}
