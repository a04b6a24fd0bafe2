use alloc::vec::Vec;
use core::alloc::Layout;

use esp_alloc::MemoryCapability;
use esp_hal::Blocking;
use esp_hal::delay::Delay;
use esp_hal::dma::{BurstConfig, DmaDescriptor, DmaRxBuf};
use esp_hal::gpio::{AnyPin, DriveMode, Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::lcd_cam::LcdCam;
use esp_hal::lcd_cam::cam::{Camera, Config as CamConfig};
use esp_hal::ledc::channel::{self, ChannelIFace};
use esp_hal::ledc::timer::{self, TimerIFace};
use esp_hal::ledc::{LSGlobalClkSource, Ledc, LowSpeed};
use esp_hal::peripherals::{DMA_CH0, I2C0, I2C1, LCD_CAM, LEDC};
use esp_hal::time::Rate;
use static_cell::StaticCell;

use espcam_core::camera::{DMA_BUFFER_ALIGN, FrameBufferLocation};
use espcam_core::{CameraConfig, CameraDriver, CameraError, CameraPins, Ov2640};

const SCCB_FREQUENCY_KHZ: u32 = 100;

static XCLK_LEDC: StaticCell<Ledc<'static>> = StaticCell::new();
static XCLK_TIMER: StaticCell<timer::Timer<'static, LowSpeed>> = StaticCell::new();

/// Peripherals handed over to the camera driver
pub(crate) struct CameraPeripherals {
    pub lcd_cam: LCD_CAM<'static>,
    pub dma: DMA_CH0<'static>,
    pub ledc: LEDC<'static>,
    pub i2c0: I2C0<'static>,
    pub i2c1: I2C1<'static>,
}

/// OV2640 on the LCD_CAM DVP interface
///
/// XCLK is generated by LEDC, the sensor is programmed over SCCB and frames
/// land in DMA buffers allocated from the heap region picked by
/// [`CameraConfig::fb_location`].
pub(crate) struct EspCameraDriver {
    peripherals: Option<CameraPeripherals>,
    // Dropping these would release the lines and stop the clock
    power: Vec<Output<'static>>,
    xclk: Option<channel::Channel<'static, LowSpeed>>,
    camera: Option<Camera<'static>>,
    frame_buffers: Vec<DmaRxBuf>,
}

impl EspCameraDriver {
    pub(crate) fn new(peripherals: CameraPeripherals) -> Self {
        Self {
            peripherals: Some(peripherals),
            power: Vec::new(),
            xclk: None,
            camera: None,
            frame_buffers: Vec::new(),
        }
    }

    pub(crate) fn frame_buffer_count(&self) -> usize {
        self.frame_buffers.len()
    }

    /// Capture interface, clock and buffers are all in place
    pub(crate) fn is_ready(&self) -> bool {
        self.camera.is_some() && self.xclk.is_some() && !self.frame_buffers.is_empty()
    }

    /// Power-down and reset lines held by the driver
    pub(crate) fn control_line_count(&self) -> usize {
        self.power.len()
    }

    fn power_up(&mut self, pins: &CameraPins, delay: &Delay) {
        if let Some(pwdn) = pins.pwdn {
            // Power-down is active high
            self.power
                .push(Output::new(gpio(pwdn), Level::Low, OutputConfig::default()));
        }
        if let Some(reset) = pins.reset {
            let mut reset = Output::new(gpio(reset), Level::Low, OutputConfig::default());
            delay.delay_millis(10);
            reset.set_high();
            self.power.push(reset);
        }
        delay.delay_millis(10);
    }

    fn start_xclk(&mut self, ledc: LEDC<'static>, config: &CameraConfig) -> Result<(), CameraError> {
        let mut ledc = Ledc::new(ledc);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);
        let ledc: &'static Ledc<'static> = XCLK_LEDC
            .try_init(ledc)
            .ok_or(CameraError::AlreadyInitialized)?;

        let mut xclk_timer = ledc.timer::<LowSpeed>(timer::Number::Timer0);
        xclk_timer
            .configure(timer::config::Config {
                duty: timer::config::Duty::Duty1Bit,
                clock_source: timer::LSClockSource::APBClk,
                frequency: Rate::from_hz(config.xclk_freq_hz),
            })
            .map_err(|e| {
                log::error!("camera: XCLK timer: {:?}", e);
                CameraError::Peripheral
            })?;
        let xclk_timer = XCLK_TIMER
            .try_init(xclk_timer)
            .ok_or(CameraError::AlreadyInitialized)?;

        let mut xclk = ledc.channel(channel::Number::Channel0, gpio(config.pins.xclk));
        xclk.configure(channel::config::Config {
            timer: xclk_timer,
            duty_pct: 50,
            drive_mode: DriveMode::PushPull,
        })
        .map_err(|e| {
            log::error!("camera: XCLK channel: {:?}", e);
            CameraError::Peripheral
        })?;
        self.xclk = Some(xclk);
        Ok(())
    }

    fn open_sccb(
        i2c0: I2C0<'static>,
        i2c1: I2C1<'static>,
        config: &CameraConfig,
    ) -> Result<I2c<'static, Blocking>, CameraError> {
        let i2c_config = I2cConfig::default().with_frequency(Rate::from_khz(SCCB_FREQUENCY_KHZ));
        let bus = match config.sccb_i2c_port {
            0 => I2c::new(i2c0, i2c_config),
            _ => I2c::new(i2c1, i2c_config),
        }
        .map_err(|e| {
            log::error!("camera: SCCB bus: {:?}", e);
            CameraError::Sccb
        })?;

        Ok(bus
            .with_sda(gpio(config.pins.sccb_sda))
            .with_scl(gpio(config.pins.sccb_scl)))
    }

    fn open_capture(
        lcd_cam: LCD_CAM<'static>,
        dma: DMA_CH0<'static>,
        pins: &CameraPins,
    ) -> Result<Camera<'static>, CameraError> {
        let lcd_cam = LcdCam::new(lcd_cam);
        let camera = Camera::new(lcd_cam.cam, dma, CamConfig::default()).map_err(|e| {
            log::error!("camera: DVP interface: {:?}", e);
            CameraError::Peripheral
        })?;

        let [d0, d1, d2, d3, d4, d5, d6, d7] = pins.data;
        Ok(camera
            .with_pixel_clock(gpio(pins.pclk))
            .with_vsync(gpio(pins.vsync))
            .with_h_enable(gpio(pins.href))
            .with_data0(gpio(d0))
            .with_data1(gpio(d1))
            .with_data2(gpio(d2))
            .with_data3(gpio(d3))
            .with_data4(gpio(d4))
            .with_data5(gpio(d5))
            .with_data6(gpio(d6))
            .with_data7(gpio(d7)))
    }

    fn allocate_frame_buffers(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        let len = config.dma_buffer_len();
        let descriptor_count =
            config.dma_descriptor_count(BurstConfig::default().max_compatible_chunk_size());
        let location = match config.fb_location {
            FrameBufferLocation::Psram => MemoryCapability::External,
            FrameBufferLocation::Dram => MemoryCapability::Internal,
        };

        for _ in 0..config.fb_count {
            let buffer = alloc_static::<u8>(location, len, DMA_BUFFER_ALIGN, 0)?;
            let descriptors = alloc_static(
                MemoryCapability::Internal,
                descriptor_count,
                core::mem::align_of::<DmaDescriptor>(),
                DmaDescriptor::EMPTY,
            )?;
            let buffer = DmaRxBuf::new(descriptors, buffer).map_err(|e| {
                log::error!("camera: frame buffer: {:?}", e);
                CameraError::Dma
            })?;
            self.frame_buffers.push(buffer);
        }
        Ok(())
    }
}

impl CameraDriver for EspCameraDriver {
    fn init(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        let CameraPeripherals {
            lcd_cam,
            dma,
            ledc,
            i2c0,
            i2c1,
        } = self
            .peripherals
            .take()
            .ok_or(CameraError::AlreadyInitialized)?;
        let delay = Delay::new();

        self.power_up(&config.pins, &delay);
        self.start_xclk(ledc, config)?;
        self.camera = Some(Self::open_capture(lcd_cam, dma, &config.pins)?);

        let sccb = Self::open_sccb(i2c0, i2c1, config)?;
        let mut sensor = Ov2640::new(sccb, delay);
        sensor.reset()?;
        let id = sensor.probe()?;
        log::info!("camera: OV2640 PID=0x{:02x} VER=0x{:02x}", id.pid, id.ver);
        sensor.configure(config)?;

        self.allocate_frame_buffers(config)
    }
}

/// Pin by GPIO number
fn gpio(number: u8) -> AnyPin<'static> {
    // SAFETY: numbers come from a validated CameraConfig with every pin used
    // exactly once, and the driver is the only user of those pins
    unsafe { AnyPin::steal(number) }
}

/// Leak a heap slice filled with `fill` from the given memory region
fn alloc_static<T: Copy>(
    capability: MemoryCapability,
    len: usize,
    align: usize,
    fill: T,
) -> Result<&'static mut [T], CameraError> {
    let requested = len * core::mem::size_of::<T>();
    let layout = Layout::array::<T>(len)
        .and_then(|layout| layout.align_to(align))
        .map_err(|_| CameraError::OutOfMemory { requested })?;

    let ptr = unsafe { esp_alloc::HEAP.alloc_caps(capability.into(), layout) }.cast::<T>();
    if ptr.is_null() {
        return Err(CameraError::OutOfMemory { requested });
    }

    // SAFETY: fresh allocation of `len` elements that is never freed
    unsafe {
        for i in 0..len {
            ptr.add(i).write(fill);
        }
        Ok(core::slice::from_raw_parts_mut(ptr, len))
    }
}
