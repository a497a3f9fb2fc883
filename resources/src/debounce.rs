//! Input debouncing for search fields.
//!
//! The debouncer itself has no timer. Each input returns a [`Ticket`]; the
//! caller schedules a timer for [`Debouncer::window_ms`] and calls
//! [`Debouncer::fire`] with that ticket when it elapses. Only the ticket of
//! the latest input yields a value, so a burst of keystrokes produces one
//! search.

pub const DEFAULT_DEBOUNCE_MS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window_ms: u32,
    latest: u64,
    pending: Option<T>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl<T> Debouncer<T> {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            latest: 0,
            pending: None,
        }
    }

    pub fn window_ms(&self) -> u32 {
        self.window_ms
    }

    /// Applies to inputs from now on; a pending input keeps its ticket.
    pub fn set_window_ms(&mut self, window_ms: u32) {
        self.window_ms = window_ms;
    }

    /// Record an input, superseding any earlier one still waiting.
    pub fn input(&mut self, value: T) -> Ticket {
        self.latest += 1;
        self.pending = Some(value);
        Ticket(self.latest)
    }

    /// The pending value if `ticket` belongs to the latest input.
    pub fn fire(&mut self, ticket: Ticket) -> Option<T> {
        if ticket.0 != self.latest {
            return None;
        }
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
