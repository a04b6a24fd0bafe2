use core::cell::Cell;
use core::net::Ipv4Addr;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Result of the association attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOutcome {
    /// Station obtained an address
    Connected(Ipv4Addr),
    /// Retry policy exhausted
    Failed { attempts: u32 },
}

/// Single-use "network acquired" notification.
///
/// Completed by the association handler, awaited once by the startup
/// sequence. Only the first completion is recorded; the signal is never
/// cleared.
pub struct ConnectionSignal {
    completed: Mutex<CriticalSectionRawMutex, Cell<bool>>,
    outcome: Signal<CriticalSectionRawMutex, AssociationOutcome>,
}

impl Default for ConnectionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSignal {
    pub const fn new() -> Self {
        Self {
            completed: Mutex::new(Cell::new(false)),
            outcome: Signal::new(),
        }
    }

    /// Complete the signal.
    ///
    /// Returns `false` (and drops `outcome`) if it was already completed.
    pub fn complete(&self, outcome: AssociationOutcome) -> bool {
        let first = !self.completed.lock(|completed| completed.replace(true));
        if first {
            self.outcome.signal(outcome);
        }
        first
    }

    /// Whether the signal has been completed
    pub fn is_set(&self) -> bool {
        self.completed.lock(Cell::get)
    }

    /// Suspend until the signal is completed and take the outcome
    pub async fn wait(&self) -> AssociationOutcome {
        self.outcome.wait().await
    }

    /// Take the outcome without waiting
    pub fn try_take(&self) -> Option<AssociationOutcome> {
        self.outcome.try_take()
    }
}

#[cfg(test)]
mod tests {
    use core::task::Poll;

    use embassy_futures::{block_on, poll_once};

    use super::*;

    const FIRST: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const SECOND: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);

    #[test]
    fn starts_unset_and_pending() {
        let signal = ConnectionSignal::new();

        assert!(!signal.is_set());
        assert_eq!(poll_once(signal.wait()), Poll::Pending);
    }

    #[test]
    fn first_completion_wins() {
        let signal = ConnectionSignal::new();

        assert!(signal.complete(AssociationOutcome::Connected(FIRST)));
        assert!(!signal.complete(AssociationOutcome::Connected(SECOND)));
        assert!(!signal.complete(AssociationOutcome::Failed { attempts: 1 }));

        assert!(signal.is_set());
        assert_eq!(
            block_on(signal.wait()),
            AssociationOutcome::Connected(FIRST)
        );
    }

    #[test]
    fn stays_set_after_outcome_is_taken() {
        let signal = ConnectionSignal::new();
        signal.complete(AssociationOutcome::Connected(FIRST));

        assert_eq!(signal.try_take(), Some(AssociationOutcome::Connected(FIRST)));
        assert!(signal.is_set());
        assert!(!signal.complete(AssociationOutcome::Connected(SECOND)));
        assert_eq!(signal.try_take(), None);
    }
}
