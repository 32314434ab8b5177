//! Background [`Task`]s definitions.

mod background;
pub mod settle_elapsed_bookings;

pub use common::Handler as Task;

pub use self::{
    background::Background, settle_elapsed_bookings::SettleElapsedBookings,
};
