//! Startup milestones and the idle heartbeat

use core::net::Ipv4Addr;

use embedded_hal_async::delay::DelayNs;

use crate::signal::AssociationOutcome;

/// Idle loop period
pub const HEARTBEAT_PERIOD_MS: u32 = 1_000;

/// Log how the association wait ended.
///
/// `None` means the caller stopped waiting before the signal completed.
/// Returns the station address when connected.
pub fn log_association(outcome: Option<AssociationOutcome>) -> Option<Ipv4Addr> {
    match outcome {
        Some(AssociationOutcome::Connected(address)) => {
            log::info!("Connected to AP ({})", address);
            Some(address)
        }
        Some(AssociationOutcome::Failed { attempts }) => {
            log::error!("Failed to connect to AP after {} attempts", attempts);
            None
        }
        None => {
            log::error!("Failed to connect to AP: timed out");
            None
        }
    }
}

/// Periodic "still alive" console line
pub struct Heartbeat<D: DelayNs> {
    delay: D,
    period_ms: u32,
    beats: u32,
}

impl<D: DelayNs> Heartbeat<D> {
    pub fn new(delay: D) -> Self {
        Self::with_period(delay, HEARTBEAT_PERIOD_MS)
    }

    pub fn with_period(delay: D, period_ms: u32) -> Self {
        Self {
            delay,
            period_ms,
            beats: 0,
        }
    }

    pub fn beats(&self) -> u32 {
        self.beats
    }

    /// Log one heartbeat line, then sleep for one period
    pub async fn beat(&mut self) {
        log::info!("Hello from app_main!");
        self.beats = self.beats.wrapping_add(1);
        self.delay.delay_ms(self.period_ms).await;
    }

    pub async fn run(mut self) -> ! {
        loop {
            self.beat().await;
        }
    }
}
