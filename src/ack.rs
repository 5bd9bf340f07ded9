//! Deferred acknowledgement scheduling
//!
//! A frame that requests an acknowledgement is answered after a fixed turnaround. The
//! [`AckScheduler`] arms a one-shot [`AckTimer`]; when it fires, the timer posts
//! [`crate::Event::AckTimeout`] and the radio task sends the ACK.

/// One-shot timer service used for the ACK deadline.
///
/// On expiry the implementation must post [`crate::Event::AckTimeout`] to the radio's
/// [`crate::EventQueue`] instead of calling into the driver, so that the expiry runs on the
/// same task as interrupt reactions.
pub trait AckTimer {
    /// Starts the timer, replacing any previous deadline
    fn arm(&mut self, duration_us: u32);
    /// Stops the timer if running
    fn cancel(&mut self);
}

/// Tracks whether an ACK deadline is outstanding
pub struct AckScheduler<T> {
    timer: T,
    armed: bool,
}

impl<T: AckTimer> AckScheduler<T> {
    /// Wraps `timer`, initially disarmed
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            armed: false,
        }
    }

    /// Starts the ACK deadline.
    ///
    /// # Arguments
    /// * `deadline_us` - Turnaround until the ACK is sent, in microseconds
    pub fn arm(&mut self, deadline_us: u32) {
        self.timer.arm(deadline_us);
        self.armed = true;
    }

    /// Cancels the pending deadline. Does nothing when no deadline is armed.
    pub fn disarm(&mut self) {
        if self.armed {
            self.timer.cancel();
            self.armed = false;
        }
    }

    /// Whether a deadline is outstanding
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Consumes an expiry. Returns `false` for an expiry that was queued before a `disarm`.
    pub(crate) fn expire(&mut self) -> bool {
        core::mem::replace(&mut self.armed, false)
    }

    /// The wrapped timer
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Gives the timer back
    pub fn into_timer(self) -> T {
        self.timer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct MockTimer {
        pub deadline: Option<u32>,
        pub arms: usize,
        pub cancels: usize,
    }

    impl AckTimer for MockTimer {
        fn arm(&mut self, duration_us: u32) {
            self.deadline = Some(duration_us);
            self.arms += 1;
        }

        fn cancel(&mut self) {
            self.deadline = None;
            self.cancels += 1;
        }
    }

    #[test]
    fn disarm_twice_cancels_once() {
        let mut ack = AckScheduler::new(MockTimer::default());
        ack.arm(1024);
        assert_eq!(ack.timer().deadline, Some(1024));

        ack.disarm();
        ack.disarm();
        assert_eq!(ack.timer().cancels, 1);
        assert!(!ack.is_armed());
    }

    #[test]
    fn disarm_without_arm_is_a_no_op() {
        let mut ack = AckScheduler::new(MockTimer::default());
        ack.disarm();
        assert_eq!(ack.timer().cancels, 0);
    }

    #[test]
    fn expiry_after_disarm_is_stale() {
        let mut ack = AckScheduler::new(MockTimer::default());
        ack.arm(1024);
        assert!(ack.expire());
        assert!(!ack.expire());

        ack.arm(1024);
        ack.disarm();
        assert!(!ack.expire());
    }
}
