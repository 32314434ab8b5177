//! [`Event`] definitions.

use tokio::sync::broadcast;

use crate::domain::booking;
#[cfg(doc)]
use crate::{domain::Booking, Service};

/// Notification emitted by the [`Service`] for external realtime/push
/// delivery.
///
/// Dispatch is fire-and-forget: the [`Service`] never waits for (nor is
/// affected by) subscribers, and [`Event`]s emitted while nobody listens are
/// dropped. Delivery, retries and UI subscriptions are entirely outside of
/// the reservation core.
#[derive(Clone, Copy, Debug)]
pub enum Event {
    /// A new [`Booking`] was created.
    BookingCreated {
        /// ID of the created [`Booking`].
        id: booking::Id,
    },

    /// A [`Booking`]'s stored state changed.
    BookingStatusChanged {
        /// ID of the changed [`Booking`].
        id: booking::Id,

        /// New stored [`booking::State`].
        state: booking::State,
    },
}

/// Fire-and-forget [`Event`] dispatcher.
#[derive(Clone, Debug)]
pub struct Dispatcher(broadcast::Sender<Event>);

impl Dispatcher {
    /// Number of not-yet-received [`Event`]s kept per subscriber.
    const CAPACITY: usize = 256;

    /// Publishes the provided [`Event`] to all current subscribers.
    pub fn publish(&self, event: Event) {
        // An `Err` only means there are no subscribers right now.
        _ = self.0.send(event);
    }

    /// Subscribes to [`Event`]s published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.0.subscribe()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self(broadcast::channel(Self::CAPACITY).0)
    }
}
