//! Association handler
//!
//! Drives [`AssociationMachine`] from the inbound station event channel and
//! executes the requested actions against a [`StationControl`] port. The
//! first acquired address (or the final give-up) completes the
//! [`ConnectionSignal`].

use core::time::Duration;

use embedded_hal_async::delay::DelayNs;
use rand_core::RngCore;

use crate::association::{Action, AssociationMachine, AssociationState, StationEvent};
use crate::signal::{AssociationOutcome, ConnectionSignal};
use crate::station::{StationControl, StationError, StationEventReceiver};

pub struct AssociationHandler<'a, S: StationControl, D: DelayNs, R: RngCore> {
    machine: AssociationMachine<R>,
    station: S,
    delay: D,
    signal: &'a ConnectionSignal,
}

impl<'a, S: StationControl, D: DelayNs, R: RngCore> AssociationHandler<'a, S, D, R> {
    pub fn new(
        machine: AssociationMachine<R>,
        station: S,
        delay: D,
        signal: &'a ConnectionSignal,
    ) -> Self {
        Self {
            machine,
            station,
            delay,
            signal,
        }
    }

    pub fn state(&self) -> AssociationState {
        self.machine.state()
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    /// Links lost after an address was acquired
    pub fn reconnects(&self) -> u32 {
        self.machine.reconnects()
    }

    /// Process station events until the retry policy gives up.
    ///
    /// With [`crate::RetryPolicy::Unbounded`] this never returns.
    pub async fn run(&mut self, events: StationEventReceiver<'_>) -> AssociationOutcome {
        loop {
            let event = events.receive().await;
            if let Some(outcome) = self.handle(event).await {
                return outcome;
            }
        }
    }

    /// Process a single event.
    ///
    /// Returns the final outcome once the machine reached its terminal state.
    pub async fn handle(&mut self, event: StationEvent) -> Option<AssociationOutcome> {
        match self.machine.handle(event) {
            Action::Connect { attempt, delay } => {
                match (attempt, self.machine.reconnects()) {
                    (1, 0) => log::info!("wifi: station started, connecting"),
                    (1, reconnects) => {
                        log::info!("wifi: link lost, reconnecting (reconnect {})", reconnects);
                    }
                    _ => log::info!("Retrying connection to WiFi... (attempt {})", attempt),
                }
                self.wait(delay).await;
                match self.station.connect().await {
                    Ok(()) => None,
                    Err(StationError::Closed) => {
                        log::error!("wifi: station is gone, stopping association");
                        self.finish()
                    }
                    Err(e) => {
                        log::warn!("wifi: connect request failed: {}", e);
                        None
                    }
                }
            }
            Action::Acquired(address) => {
                log::info!("Got IP: {}", address);
                self.signal.complete(AssociationOutcome::Connected(address));
                None
            }
            Action::AddressRenewed(address) => {
                log::info!("Got IP: {} (renewed)", address);
                None
            }
            Action::GiveUp { attempts } => {
                log::error!("wifi: giving up after {} connect attempts", attempts);
                self.fail(attempts)
            }
            Action::Ignore => {
                log::debug!("wifi: ignoring {:?} in {:?}", event, self.machine.state());
                None
            }
        }
    }

    fn finish(&mut self) -> Option<AssociationOutcome> {
        match self.machine.abort() {
            Action::GiveUp { attempts } => self.fail(attempts),
            _ => None,
        }
    }

    fn fail(&self, attempts: u32) -> Option<AssociationOutcome> {
        let outcome = AssociationOutcome::Failed { attempts };
        self.signal.complete(outcome);
        Some(outcome)
    }

    async fn wait(&mut self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(ms).await;
    }
}
