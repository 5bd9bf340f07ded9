//! Interrupt to task handoff
//!
//! Register I/O never runs in interrupt context. The DIO0 edge handler and the ACK timer
//! expiry only post an [`Event`] to an [`EventQueue`]; the task owning the radio drains the
//! queue with [`crate::Sx127x::process`] or [`crate::Sx127x::wait_and_process`].
//!
//! ```ignore
//! static EVENTS: EventQueue<CriticalSectionRawMutex, 4> = EventQueue::new();
//!
//! fn on_dio0_edge() {
//!     let _ = EVENTS.signal(Event::Dio0);
//! }
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::Error;

/// Something the radio task has to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The DIO0 interrupt line was asserted
    Dio0,
    /// The ACK deadline timer expired
    AckTimeout,
}

/// Asynchronous notification raised to the upper layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indication {
    /// A frame is ready to be read
    RxDone,
    /// A requested transmission finished, confirm it with [`crate::Op::Transmit`]
    TxDone,
    /// A frame was received with a bad CRC
    CrcError,
    /// Clear channel assessment finished, confirm it with [`crate::Op::Cca`]
    CcaDone,
}

/// Upper layer callback.
///
/// Called from the radio task. Implementations must not call back into the driver; they
/// should only record the indication for the upper layer's own scheduler.
pub trait EventHandler {
    fn on_event(&mut self, indication: Indication);
}

impl<F> EventHandler for F
where
    F: FnMut(Indication),
{
    fn on_event(&mut self, indication: Indication) {
        self(indication)
    }
}

/// Single consumer queue of pending [`Event`]s
pub struct EventQueue<M: RawMutex, const N: usize> {
    channel: Channel<M, Event, N>,
}

impl<M: RawMutex, const N: usize> EventQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Posts an event without blocking, safe to call from an interrupt handler.
    ///
    /// # Errors
    /// * `Error::QueueFull` - the radio task fell `N` events behind
    pub fn signal(&self, event: Event) -> Result<(), Error> {
        self.channel.try_send(event).map_err(|_| Error::QueueFull)
    }

    pub(crate) fn try_next(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    pub(crate) async fn next(&self) -> Event {
        self.channel.receive().await
    }
}

impl<M: RawMutex, const N: usize> Default for EventQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn events_come_out_in_arrival_order() {
        let queue: EventQueue<NoopRawMutex, 4> = EventQueue::new();
        queue.signal(Event::Dio0).unwrap();
        queue.signal(Event::AckTimeout).unwrap();

        assert_eq!(queue.try_next(), Some(Event::Dio0));
        assert_eq!(queue.try_next(), Some(Event::AckTimeout));
        assert_eq!(queue.try_next(), None);
    }

    #[test]
    fn full_queue_reports_overflow() {
        let queue: EventQueue<NoopRawMutex, 1> = EventQueue::new();
        queue.signal(Event::Dio0).unwrap();
        assert_eq!(queue.signal(Event::Dio0), Err(Error::QueueFull));
    }
}
