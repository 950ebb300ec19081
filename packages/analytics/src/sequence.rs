//! "Last request wins" sequencing for overlapping async requests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number handed out when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw sequence number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Issues monotonically increasing tickets and discards responses that
/// belong to a superseded request.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    /// Creates a sequencer with no requests issued.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Starts a new request, superseding every earlier ticket.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is the most recently issued one.
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns `value` if `ticket` is still current, dropping it otherwise.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            log::debug!(
                "Discarding stale response for request {} (latest is {})",
                ticket.0,
                self.latest.load(Ordering::SeqCst)
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ticket_supersedes_earlier() {
        let sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        let second = sequencer.issue();
        assert!(second > first);
        assert!(!sequencer.is_current(first));
        assert_eq!(sequencer.accept(first, "old"), None);
        assert_eq!(sequencer.accept(second, "new"), Some("new"));
    }

    #[tokio::test]
    async fn out_of_order_completion_keeps_latest() {
        let sequencer = std::sync::Arc::new(RequestSequencer::new());
        let slow = sequencer.issue();
        let fast = sequencer.issue();

        let s = sequencer.clone();
        let slow_result = tokio::spawn(async move {
            tokio::task::yield_now().await;
            s.accept(slow, 1)
        });
        let fast_result = sequencer.accept(fast, 2);

        assert_eq!(fast_result, Some(2));
        assert_eq!(slow_result.await.unwrap(), None);
    }
}
