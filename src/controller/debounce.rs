//! Search debounce control
//!
//! One `Debouncer` per channel. Every input change restarts the timer, so
//! a burst of keystrokes produces a single fire after the quiet period.
//! Fires are delivered as `TimerFired` messages to the controller loop.

use crate::controller::channel::Channel;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Message sent when a debounce timer elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub channel: Channel,
    pub generation: u64,
}

/// Restartable quiet-period timer for one channel
#[derive(Debug)]
pub struct Debouncer {
    channel: Channel,
    delay: Duration,
    /// Bumped on every schedule and cancel; fires from older generations
    /// are stale
    generation: u64,
    timer: Option<JoinHandle<()>>,
    last_input_time: Option<Instant>,
    fired: mpsc::UnboundedSender<TimerFired>,
}

impl Debouncer {
    pub fn new(channel: Channel, delay: Duration, fired: mpsc::UnboundedSender<TimerFired>) -> Self {
        Self {
            channel,
            delay,
            generation: 0,
            timer: None,
            last_input_time: None,
            fired,
        }
    }

    /// Start or restart the quiet period. Must be called inside a tokio
    /// runtime.
    pub fn schedule(&mut self) -> u64 {
        self.abort_timer();
        self.generation += 1;
        self.last_input_time = Some(Instant::now());

        let fired = TimerFired {
            channel: self.channel,
            generation: self.generation,
        };
        let delay = self.delay;
        let sender = self.fired.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(fired);
        }));

        log::trace!(
            "Scheduled {} timer generation {} ({}ms)",
            self.channel,
            self.generation,
            delay.as_millis()
        );
        self.generation
    }

    /// Drop any pending fire. Returns true if a timer was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.abort_timer();
        self.generation += 1;
        self.last_input_time = None;
        if was_pending {
            log::trace!("Cancelled {} timer", self.channel);
        }
        was_pending
    }

    /// Accept a fire if it belongs to the live generation. Accepting
    /// consumes the pending timer.
    pub fn accept(&mut self, fired: &TimerFired) -> bool {
        if fired.channel != self.channel || fired.generation != self.generation || self.timer.is_none() {
            log::trace!(
                "Ignoring stale {} timer generation {} (live {})",
                fired.channel,
                fired.generation,
                self.generation
            );
            return false;
        }
        self.timer = None;
        self.last_input_time = None;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Remaining quiet time before the pending timer fires
    pub fn time_until_ready(&self) -> Option<Duration> {
        let last = self.last_input_time?;
        Some(self.delay.saturating_sub(last.elapsed()))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.abort_timer();
    }
}
