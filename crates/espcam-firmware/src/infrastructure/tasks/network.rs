use embassy_futures::select::{Either3, select3};
use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::Delay;
use esp_radio::wifi::{
    AuthMethod, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent,
};

use espcam_core::station::{StationEventReceiver, StationEventSender};

use crate::infrastructure::drivers::HardwareRng;
use espcam_core::{
    AssociationHandler, StationControl, StationCredentials, StationError, StationEvent,
};

const RADIO_COMMAND_QUEUE_SIZE: usize = 2;

/// Requests from the association handler to the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RadioCommand {
    Connect,
}

pub(crate) type RadioCommandChannel =
    Channel<CriticalSectionRawMutex, RadioCommand, RADIO_COMMAND_QUEUE_SIZE>;

pub(crate) type RadioCommandSender =
    Sender<'static, CriticalSectionRawMutex, RadioCommand, RADIO_COMMAND_QUEUE_SIZE>;

pub(crate) type RadioCommandReceiver =
    Receiver<'static, CriticalSectionRawMutex, RadioCommand, RADIO_COMMAND_QUEUE_SIZE>;

/// [`StationControl`] backed by the radio task's command queue
pub(crate) struct RadioLink {
    commands: RadioCommandSender,
}

impl RadioLink {
    pub(crate) fn new(commands: RadioCommandSender) -> Self {
        Self { commands }
    }
}

impl StationControl for RadioLink {
    async fn connect(&mut self) -> Result<(), StationError> {
        self.commands.send(RadioCommand::Connect).await;
        Ok(())
    }
}

/// Background task owning the `WiFi` controller
///
/// Starts the station interface and translates driver events and DHCP state
/// into [`StationEvent`]s. Connect requests arrive on `commands`. Failing to
/// configure or start the station is fatal.
#[embassy_executor::task]
pub(crate) async fn radio_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    credentials: StationCredentials,
    commands: RadioCommandReceiver,
    events: StationEventSender<'static>,
) {
    let client_config = if credentials.is_open() {
        ClientConfig::default()
            .with_ssid(credentials.ssid().into())
            .with_auth_method(AuthMethod::None)
    } else {
        ClientConfig::default()
            .with_ssid(credentials.ssid().into())
            .with_password(credentials.password().into())
    };
    // Without a started station nothing can ever complete the signal
    if let Err(e) = controller.set_config(&ModeConfig::Client(client_config)) {
        panic!("wifi: rejected station config: {:?}", e);
    }
    if let Err(e) = controller.start_async().await {
        panic!("wifi: failed to start station: {:?}", e);
    }
    events.send(StationEvent::Started).await;

    let mut has_address = false;
    loop {
        let next = select3(
            controller.wait_for_event(WifiEvent::StaDisconnected),
            address_change(stack, has_address),
            commands.receive(),
        )
        .await;

        match next {
            Either3::First(()) => {
                log::info!("wifi: disconnected from AP");
                events.send(StationEvent::Disconnected).await;
            }
            Either3::Second(()) => {
                has_address = !has_address;
                if let Some(config) = stack.config_v4() {
                    events
                        .send(StationEvent::AddressAcquired(config.address.address()))
                        .await;
                }
            }
            Either3::Third(RadioCommand::Connect) => {
                if let Err(e) = controller.connect_async().await {
                    log::warn!("wifi: error connecting: {:?}", e);
                    events.send(StationEvent::Disconnected).await;
                }
            }
        }
    }
}

/// Resolves when DHCP acquires an address (or loses it, if `has_address`)
async fn address_change(stack: Stack<'static>, has_address: bool) {
    if has_address {
        stack.wait_config_down().await;
    } else {
        stack.wait_config_up().await;
    }
}

/// Background task running the association state machine
#[embassy_executor::task]
pub(crate) async fn association_task(
    mut handler: AssociationHandler<'static, RadioLink, Delay, HardwareRng>,
    events: StationEventReceiver<'static>,
) {
    let outcome = handler.run(events).await;
    log::warn!("wifi: association stopped: {:?}", outcome);
}

/// Background task for running the network stack
#[embassy_executor::task]
pub(crate) async fn network_runner_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}
