//! [`Command`] definition.

pub mod approve_booking;
pub mod cancel_booking;
pub mod create_booking;
pub mod reject_booking;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    approve_booking::ApproveBooking, cancel_booking::CancelBooking,
    create_booking::CreateBooking, reject_booking::RejectBooking,
};
