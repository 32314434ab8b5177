//! Domain definitions.

pub mod booking;
pub mod court;
pub mod ledger;
pub mod package;
pub mod slot;
pub mod user;

pub use self::{
    booking::Booking, court::Court, package::Package, slot::Slot,
};
