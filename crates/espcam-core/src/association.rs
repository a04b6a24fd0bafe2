//! WiFi station association state machine
//!
//! Pure synchronous logic: every [`StationEvent`] is turned into a state
//! transition plus an [`Action`] for the caller to execute. The async loop in
//! [`crate::handler`] owns the side effects.

use core::net::Ipv4Addr;
use core::time::Duration;

use rand_core::RngCore;

use crate::retry::RetryPolicy;

/// Events reported by the network stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationEvent {
    /// Station interface started
    Started,
    /// Station lost (or never got) the access point
    Disconnected,
    /// DHCP handed out an IPv4 address
    AddressAcquired(Ipv4Addr),
}

/// Association progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    /// Interface not started yet
    Idle,
    /// Connect requested, `attempt` is 1-based
    Connecting { attempt: u32 },
    /// Address acquired
    Connected { address: Ipv4Addr },
    /// Retry policy exhausted, terminal
    Failed { attempts: u32 },
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Request a connect after waiting `delay`
    Connect { attempt: u32, delay: Duration },
    /// Address obtained, complete the connection signal
    Acquired(Ipv4Addr),
    /// Address changed after the first acquisition
    AddressRenewed(Ipv4Addr),
    /// Retry policy exhausted
    GiveUp { attempts: u32 },
    /// Nothing to do
    Ignore,
}

/// Association state machine
pub struct AssociationMachine<R> {
    state: AssociationState,
    policy: RetryPolicy,
    rng: R,
    reconnects: u32,
}

impl<R> AssociationMachine<R> {
    /// Create a machine in [`AssociationState::Idle`].
    ///
    /// `rng` feeds the backoff jitter and is never used by the unbounded policy.
    pub const fn new(policy: RetryPolicy, rng: R) -> Self {
        Self {
            state: AssociationState::Idle,
            policy,
            rng,
            reconnects: 0,
        }
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Number of times the link dropped after an address was acquired
    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, AssociationState::Failed { .. })
    }

    /// Stop for good, e.g. when the station can no longer be driven
    pub fn abort(&mut self) -> Action {
        let attempts = match self.state {
            AssociationState::Failed { .. } => return Action::Ignore,
            AssociationState::Connecting { attempt } => attempt,
            AssociationState::Idle | AssociationState::Connected { .. } => 0,
        };
        self.state = AssociationState::Failed { attempts };
        Action::GiveUp { attempts }
    }
}

impl<R: RngCore> AssociationMachine<R> {

    /// Apply one event and return what the caller must do
    pub fn handle(&mut self, event: StationEvent) -> Action {
        let (next, action) = match (self.state, event) {
            (AssociationState::Failed { .. }, _) => return Action::Ignore,

            (AssociationState::Idle, StationEvent::Started) => self.start_attempt(1),

            (AssociationState::Connecting { attempt }, StationEvent::Disconnected) => {
                self.start_attempt(attempt.saturating_add(1))
            }

            (AssociationState::Connected { .. }, StationEvent::Disconnected) => {
                self.reconnects = self.reconnects.saturating_add(1);
                self.start_attempt(1)
            }

            (
                AssociationState::Idle | AssociationState::Connecting { .. },
                StationEvent::AddressAcquired(address),
            ) => (
                AssociationState::Connected { address },
                Action::Acquired(address),
            ),

            (AssociationState::Connected { address: current }, StationEvent::AddressAcquired(address)) => {
                let action = if current == address {
                    Action::Ignore
                } else {
                    Action::AddressRenewed(address)
                };
                (AssociationState::Connected { address }, action)
            }

            // Disconnect before start, duplicate start
            (state, _) => (state, Action::Ignore),
        };

        self.state = next;
        action
    }

    fn start_attempt(&mut self, attempt: u32) -> (AssociationState, Action) {
        match self.policy.delay_before(attempt, &mut self.rng) {
            Some(delay) => (
                AssociationState::Connecting { attempt },
                Action::Connect { attempt, delay },
            ),
            None => {
                let attempts = attempt.saturating_sub(1);
                (
                    AssociationState::Failed { attempts },
                    Action::GiveUp { attempts },
                )
            }
        }
    }
}
