use core::fmt;

use crate::camera::{CameraConfig, CameraConfigError};

/// Camera driver initialization failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// Configuration record rejected before touching hardware
    InvalidConfig(CameraConfigError),
    /// SCCB bus transfer failed
    Sccb,
    /// No supported sensor answered on the SCCB bus
    SensorNotDetected { pid: u8, ver: u8 },
    /// Capture peripheral rejected its configuration
    Peripheral,
    /// Frame buffer allocation failed
    OutOfMemory { requested: usize },
    /// DMA buffer setup failed
    Dma,
    /// Driver was already initialized
    AlreadyInitialized,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::InvalidConfig(e) => write!(f, "invalid configuration: {}", e),
            CameraError::Sccb => write!(f, "SCCB bus error"),
            CameraError::SensorNotDetected { pid, ver } => {
                write!(f, "sensor not detected (PID=0x{:02x} VER=0x{:02x})", pid, ver)
            }
            CameraError::Peripheral => write!(f, "capture peripheral configuration failed"),
            CameraError::OutOfMemory { requested } => {
                write!(f, "cannot allocate {} bytes of frame buffer", requested)
            }
            CameraError::Dma => write!(f, "DMA buffer setup failed"),
            CameraError::AlreadyInitialized => write!(f, "camera already initialized"),
        }
    }
}

impl From<CameraConfigError> for CameraError {
    fn from(e: CameraConfigError) -> Self {
        CameraError::InvalidConfig(e)
    }
}

/// Port for the camera hardware
pub trait CameraDriver {
    /// Bring the sensor and capture interface up with `config`.
    ///
    /// `config` has already passed [`CameraConfig::validate`].
    fn init(&mut self, config: &CameraConfig) -> Result<(), CameraError>;
}

/// Validate `config` and submit it to the driver.
///
/// There is no retry: the caller treats an error as fatal.
pub fn bring_up<D: CameraDriver + ?Sized>(
    driver: &mut D,
    config: &CameraConfig,
) -> Result<(), CameraError> {
    let result = config
        .validate()
        .map_err(CameraError::from)
        .and_then(|()| {
            if config.effective_grab_mode() != config.grab_mode {
                log::warn!("camera: latest-frame grab needs two buffers, using when-empty");
            }
            driver.init(config)
        });

    match result {
        Ok(()) => {
            let (width, height) = config.frame_size.dimensions();
            log::info!(
                "Camera initialized: {:?} {}x{}, {} x {} byte buffer(s) in {:?}",
                config.pixel_format,
                width,
                height,
                config.fb_count,
                config.frame_buffer_len(),
                config.fb_location
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Camera init failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraPins, FrameBufferLocation, FrameSize, GrabMode, PixelFormat};

    #[derive(Default)]
    struct FakeDriver {
        calls: usize,
        failure: Option<CameraError>,
    }

    impl CameraDriver for FakeDriver {
        fn init(&mut self, _config: &CameraConfig) -> Result<(), CameraError> {
            self.calls += 1;
            match self.failure {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    fn config() -> CameraConfig {
        CameraConfig {
            pins: CameraPins {
                pwdn: None,
                reset: None,
                xclk: 10,
                sccb_sda: 40,
                sccb_scl: 39,
                data: [15, 17, 18, 16, 14, 12, 11, 48],
                vsync: 38,
                href: 47,
                pclk: 13,
            },
            xclk_freq_hz: 20_000_000,
            pixel_format: PixelFormat::Rgb565,
            frame_size: FrameSize::Qvga,
            jpeg_quality: 12,
            fb_count: 1,
            fb_location: FrameBufferLocation::Psram,
            grab_mode: GrabMode::WhenEmpty,
            sccb_i2c_port: 1,
        }
    }

    #[test]
    fn valid_config_reaches_driver() {
        let mut driver = FakeDriver::default();

        assert_eq!(bring_up(&mut driver, &config()), Ok(()));
        assert_eq!(driver.calls, 1);
    }

    #[test]
    fn invalid_config_never_reaches_driver() {
        let mut driver = FakeDriver::default();
        let mut config = config();
        config.pins.pclk = config.pins.xclk;

        assert_eq!(
            bring_up(&mut driver, &config),
            Err(CameraError::InvalidConfig(CameraConfigError::PinConflict {
                pin: 10
            }))
        );
        assert_eq!(driver.calls, 0);
    }

    #[test]
    fn driver_failure_is_propagated_without_retry() {
        let mut driver = FakeDriver {
            failure: Some(CameraError::SensorNotDetected { pid: 0, ver: 0 }),
            ..FakeDriver::default()
        };

        assert_eq!(
            bring_up(&mut driver, &config()),
            Err(CameraError::SensorNotDetected { pid: 0, ver: 0 })
        );
        assert_eq!(driver.calls, 1);
    }
}
