#![no_std]
#![no_main]
#![feature(type_alias_impl_trait)]

extern crate alloc;

mod config;
mod infrastructure;

use embassy_executor::Spawner;
use embassy_time::{Delay, with_timeout};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, timer::timg::TimerGroup};

use espcam_core::app::log_association;
use espcam_core::station::StationEventChannel;
use espcam_core::{
    AssociationHandler, AssociationMachine, ConnectionSignal, Heartbeat, StationCredentials,
    bring_up,
};

use crate::infrastructure::drivers::{
    CameraPeripherals, EspCameraDriver, HardwareRng, init_network_stack,
};
use crate::infrastructure::tasks::{
    RadioCommandChannel, RadioLink, association_task, network_runner_task, radio_task,
};

esp_bootloader_esp_idf::esp_app_desc!();

// static_cell::make_static! in main causes a compiler error
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    // Internal heap (64 + 32 KB), frame buffers go to PSRAM
    esp_alloc::heap_allocator!(
        #[unsafe(link_section = ".dram2_uninit")] size: 64 * 1024
    );
    esp_alloc::heap_allocator!(size: 32 * 1024);
    esp_alloc::psram_allocator!(peripherals.PSRAM, esp_hal::psram);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Camera failure halts startup through the panic handler
    let mut camera = EspCameraDriver::new(CameraPeripherals {
        lcd_cam: peripherals.LCD_CAM,
        dma: peripherals.DMA_CH0,
        ledc: peripherals.LEDC,
        i2c0: peripherals.I2C0,
        i2c1: peripherals.I2C1,
    });
    if let Err(e) = bring_up(&mut camera, &config::CAMERA) {
        panic!("camera bring-up failed: {}", e);
    }
    log::debug!(
        "camera: ready={} frame_buffers={} control_lines={}",
        camera.is_ready(),
        camera.frame_buffer_count(),
        camera.control_line_count()
    );

    let credentials = match StationCredentials::new(config::WIFI.ssid, config::WIFI.password) {
        Ok(credentials) => credentials,
        Err(e) => panic!("invalid WiFi credentials: {}", e),
    };

    // Initialize network stack and spawn network tasks
    let (stack, runner, controller) = init_network_stack(peripherals.WIFI, config::WIFI.hostname);
    let events: &'static StationEventChannel =
        mk_static!(StationEventChannel, StationEventChannel::new());
    let commands: &'static RadioCommandChannel =
        mk_static!(RadioCommandChannel, RadioCommandChannel::new());
    let signal: &'static ConnectionSignal = mk_static!(ConnectionSignal, ConnectionSignal::new());

    let handler = AssociationHandler::new(
        AssociationMachine::new(config::WIFI.retry, HardwareRng::new()),
        RadioLink::new(commands.sender()),
        Delay,
        signal,
    );

    spawner.spawn(network_runner_task(runner)).ok();
    spawner
        .spawn(radio_task(
            controller,
            stack,
            credentials,
            commands.receiver(),
            events.sender(),
        ))
        .ok();
    spawner
        .spawn(association_task(handler, events.receiver()))
        .ok();
    log::info!("wifi_init_sta finished.");

    // Wait for the association handler to finish, events keep flowing meanwhile
    let outcome = match config::WIFI.wait_timeout {
        Some(timeout) => with_timeout(timeout, signal.wait()).await.ok(),
        None => Some(signal.wait().await),
    };
    log_association(outcome);

    Heartbeat::new(Delay).run().await
}
