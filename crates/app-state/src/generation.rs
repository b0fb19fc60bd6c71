//! Load generation tracking
//!
//! Every load of a view takes a ticket. A load that settles after a newer
//! one has started holds a stale ticket and its result is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ticket identifying one load invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Generation number of this ticket
    pub fn generation(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic counter of load invocations
///
/// Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct LoadGeneration {
    latest: Arc<AtomicU64>,
}

impl LoadGeneration {
    /// Create a counter with no loads started
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load and return its ticket
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the most recently started load
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Generation of the most recently started load, 0 if none
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_increase() {
        let generation = LoadGeneration::new();
        assert_eq!(generation.latest(), 0);

        let first = generation.begin();
        let second = generation.begin();

        assert!(second > first);
        assert_eq!(second.generation(), 2);
        assert_eq!(second.to_string(), "#2");
    }

    #[test]
    fn test_only_latest_ticket_is_current() {
        let generation = LoadGeneration::new();
        let first = generation.begin();
        assert!(generation.is_current(first));

        let second = generation.clone().begin();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }
}
