//! Lamport logical clock.
//!
//! Every `data` object on the wire carries a `clock` value. The session
//! ticks the clock before each send and merges the remote value on every
//! receive, on both the command and notification paths.

use std::sync::Mutex;

/// A session-local Lamport clock shared by both channels.
#[derive(Debug, Default)]
pub struct LogicalClock {
    counter: Mutex<u64>,
}

impl LogicalClock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock for an outgoing message and returns the new value.
    pub fn tick(&self) -> u64 {
        let mut counter = self.counter.lock().expect("clock lock poisoned");
        *counter += 1;
        *counter
    }

    /// Merges a remote clock value on receive and returns the new value.
    pub fn observe(&self, remote: u64) -> u64 {
        let mut counter = self.counter.lock().expect("clock lock poisoned");
        *counter = (*counter).max(remote) + 1;
        *counter
    }

    /// Returns the current clock value without advancing it.
    pub fn current(&self) -> u64 {
        *self.counter.lock().expect("clock lock poisoned")
    }
}
