//! Radio and IP stack setup
//!
//! Creates the esp-radio controller and a DHCPv4 station interface that
//! announces the configured hostname. The controller is handed to the radio
//! task, the runner to the network runner task.

use core::str::FromStr;

use heapless::String;

use embassy_net::{DhcpConfig, Runner, Stack, StackResources};
use esp_hal::peripherals::WIFI;
use esp_radio::wifi::{Config as WifiConfig, WifiController, WifiDevice};
use static_cell::make_static;

use super::random::get_seed;

const MAX_CONNECTIONS: usize = 4;

/// Bring up the radio and a DHCP-configured station interface.
///
/// Radio init failures are fatal.
pub(crate) fn init_network_stack(
    wifi_device: WIFI<'static>,
    hostname: &str,
) -> (
    Stack<'static>,
    Runner<'static, WifiDevice<'static>>,
    WifiController<'static>,
) {
    let esp_radio_ctrl = &*make_static!(esp_radio::init().unwrap());
    let (controller, interfaces) =
        esp_radio::wifi::new(esp_radio_ctrl, wifi_device, WifiConfig::default()).unwrap();

    let mut dhcp_config = DhcpConfig::default();
    dhcp_config.hostname = Some(String::from_str(hostname).expect("Invalid hostname"));
    let net_config = embassy_net::Config::dhcpv4(dhcp_config);

    let network_resources = make_static!(StackResources::<MAX_CONNECTIONS>::new());
    let (stack, runner) =
        embassy_net::new(interfaces.sta, net_config, network_resources, get_seed());

    (stack, runner, controller)
}
