//! Camera configuration record
//!
//! Everything the camera driver needs to bring the sensor up: pin map,
//! master clock, output format, frame size and frame-buffer policy. The
//! record is checked at the driver boundary with [`CameraConfig::validate`]
//! before any hardware is touched.

use core::fmt;

/// Highest GPIO number on the ESP32-S3
pub const MAX_GPIO: u8 = 48;

/// GPIOs that do not exist on the ESP32-S3
const MISSING_GPIOS: core::ops::RangeInclusive<u8> = 22..=25;

/// Accepted master clock range
pub const XCLK_MIN_HZ: u32 = 1_000_000;
pub const XCLK_MAX_HZ: u32 = 40_000_000;

/// Worst (highest) accepted JPEG quality value
pub const JPEG_QUALITY_MAX: u8 = 63;

/// Number of SCCB-capable I2C controllers
pub const SCCB_PORTS: u8 = 2;

/// Address and length granularity of DMA frame buffers.
///
/// Covers the largest external-memory burst, so buffers are valid in PSRAM
/// as well as in DRAM.
pub const DMA_BUFFER_ALIGN: usize = 64;

/// Sensor output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb565,
    Yuv422,
    Grayscale,
    Jpeg,
}

impl PixelFormat {
    /// Bytes per pixel for raw formats, `None` for JPEG
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            PixelFormat::Rgb565 | PixelFormat::Yuv422 => Some(2),
            PixelFormat::Grayscale => Some(1),
            PixelFormat::Jpeg => None,
        }
    }
}

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    /// 160x120
    Qqvga,
    /// 176x144
    Qcif,
    /// 240x176
    Hqvga,
    /// 320x240
    Qvga,
    /// 400x296
    Cif,
    /// 640x480
    Vga,
    /// 800x600
    Svga,
    /// 1024x768
    Xga,
    /// 1280x1024
    Sxga,
    /// 1600x1200
    Uxga,
}

impl FrameSize {
    pub const fn dimensions(self) -> (u16, u16) {
        match self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }

    pub const fn width(self) -> u16 {
        self.dimensions().0
    }

    pub const fn height(self) -> u16 {
        self.dimensions().1
    }
}

/// Where frame buffers are allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBufferLocation {
    /// External PSRAM
    Psram,
    /// Internal RAM
    Dram,
}

/// Frame-buffer acquisition policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    /// Fill a buffer only once the previous one was returned
    WhenEmpty,
    /// Keep overwriting so the newest frame is always available
    Latest,
}

/// GPIO assignment of the DVP camera connector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraPins {
    /// Power-down line, `None` if not wired
    pub pwdn: Option<u8>,
    /// Reset line, `None` if not wired
    pub reset: Option<u8>,
    pub xclk: u8,
    pub sccb_sda: u8,
    pub sccb_scl: u8,
    /// Data lines D0..D7
    pub data: [u8; 8],
    pub vsync: u8,
    pub href: u8,
    pub pclk: u8,
}

impl CameraPins {
    /// Every assigned GPIO, unassigned optional lines skipped
    pub fn assigned(&self) -> impl Iterator<Item = u8> + '_ {
        self.pwdn
            .into_iter()
            .chain(self.reset)
            .chain([
                self.xclk,
                self.sccb_sda,
                self.sccb_scl,
                self.vsync,
                self.href,
                self.pclk,
            ])
            .chain(self.data)
    }
}

/// Camera configuration record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    pub pins: CameraPins,
    /// Master clock fed to the sensor
    pub xclk_freq_hz: u32,
    pub pixel_format: PixelFormat,
    pub frame_size: FrameSize,
    /// 0..=63, lower is better. Only used for JPEG
    pub jpeg_quality: u8,
    pub fb_count: u8,
    pub fb_location: FrameBufferLocation,
    pub grab_mode: GrabMode,
    /// I2C controller used for SCCB
    pub sccb_i2c_port: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraConfigError {
    /// The same GPIO is assigned to two signals
    PinConflict { pin: u8 },
    /// GPIO does not exist on this chip
    InvalidPin { pin: u8 },
    /// Master clock outside of the supported range
    InvalidClock { hz: u32 },
    /// JPEG quality above [`JPEG_QUALITY_MAX`]
    InvalidJpegQuality { quality: u8 },
    /// At least one frame buffer is required
    NoFrameBuffers,
    /// SCCB port does not exist
    InvalidSccbPort { port: u8 },
}

impl fmt::Display for CameraConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraConfigError::PinConflict { pin } => {
                write!(f, "GPIO{} is assigned more than once", pin)
            }
            CameraConfigError::InvalidPin { pin } => write!(f, "GPIO{} does not exist", pin),
            CameraConfigError::InvalidClock { hz } => {
                write!(f, "XCLK frequency {} Hz is out of range", hz)
            }
            CameraConfigError::InvalidJpegQuality { quality } => {
                write!(f, "JPEG quality {} is above {}", quality, JPEG_QUALITY_MAX)
            }
            CameraConfigError::NoFrameBuffers => write!(f, "frame buffer count is zero"),
            CameraConfigError::InvalidSccbPort { port } => {
                write!(f, "SCCB port {} does not exist", port)
            }
        }
    }
}

impl CameraConfig {
    /// Check the record before handing it to the hardware
    pub fn validate(&self) -> Result<(), CameraConfigError> {
        let mut seen: u64 = 0;
        for pin in self.pins.assigned() {
            if pin > MAX_GPIO || MISSING_GPIOS.contains(&pin) {
                return Err(CameraConfigError::InvalidPin { pin });
            }
            let bit = 1u64 << pin;
            if seen & bit != 0 {
                return Err(CameraConfigError::PinConflict { pin });
            }
            seen |= bit;
        }

        if !(XCLK_MIN_HZ..=XCLK_MAX_HZ).contains(&self.xclk_freq_hz) {
            return Err(CameraConfigError::InvalidClock {
                hz: self.xclk_freq_hz,
            });
        }
        if self.pixel_format == PixelFormat::Jpeg && self.jpeg_quality > JPEG_QUALITY_MAX {
            return Err(CameraConfigError::InvalidJpegQuality {
                quality: self.jpeg_quality,
            });
        }
        if self.fb_count == 0 {
            return Err(CameraConfigError::NoFrameBuffers);
        }
        if self.sccb_i2c_port >= SCCB_PORTS {
            return Err(CameraConfigError::InvalidSccbPort {
                port: self.sccb_i2c_port,
            });
        }

        Ok(())
    }

    /// Grab mode the driver actually uses.
    ///
    /// `Latest` needs at least two buffers and falls back to `WhenEmpty`.
    pub fn effective_grab_mode(&self) -> GrabMode {
        match self.grab_mode {
            GrabMode::Latest if self.fb_count < 2 => GrabMode::WhenEmpty,
            mode => mode,
        }
    }

    /// Size of a single frame buffer in bytes
    pub fn frame_buffer_len(&self) -> usize {
        let (width, height) = self.frame_size.dimensions();
        let pixels = usize::from(width) * usize::from(height);
        match self.pixel_format.bytes_per_pixel() {
            Some(bytes) => pixels * bytes,
            // Compressed frames are budgeted at a fifth of the pixel count
            None => pixels / 5,
        }
    }

    /// Allocation size of a frame buffer, rounded up to [`DMA_BUFFER_ALIGN`]
    pub fn dma_buffer_len(&self) -> usize {
        self.frame_buffer_len().next_multiple_of(DMA_BUFFER_ALIGN)
    }

    /// Descriptors needed to cover one frame buffer in `chunk_size` pieces
    pub fn dma_descriptor_count(&self, chunk_size: usize) -> usize {
        self.dma_buffer_len().div_ceil(chunk_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Seeed XIAO ESP32S3 Sense connector
    const PINS: CameraPins = CameraPins {
        pwdn: None,
        reset: None,
        xclk: 10,
        sccb_sda: 40,
        sccb_scl: 39,
        data: [15, 17, 18, 16, 14, 12, 11, 48],
        vsync: 38,
        href: 47,
        pclk: 13,
    };

    const CONFIG: CameraConfig = CameraConfig {
        pins: PINS,
        xclk_freq_hz: 20_000_000,
        pixel_format: PixelFormat::Rgb565,
        frame_size: FrameSize::Qvga,
        jpeg_quality: 12,
        fb_count: 1,
        fb_location: FrameBufferLocation::Psram,
        grab_mode: GrabMode::WhenEmpty,
        sccb_i2c_port: 1,
    };

    #[test]
    fn valid_configuration_passes() {
        assert_eq!(CONFIG.validate(), Ok(()));
    }

    #[test]
    fn conflicting_pins_are_rejected() {
        let mut config = CONFIG;
        config.pins.href = config.pins.vsync;
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::PinConflict { pin: 38 })
        );

        let mut config = CONFIG;
        config.pins.pwdn = Some(15);
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::PinConflict { pin: 15 })
        );
    }

    #[test]
    fn missing_gpios_are_rejected() {
        let mut config = CONFIG;
        config.pins.reset = Some(23);
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::InvalidPin { pin: 23 })
        );

        let mut config = CONFIG;
        config.pins.xclk = 49;
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::InvalidPin { pin: 49 })
        );
    }

    #[test]
    fn scalar_fields_are_range_checked() {
        let mut config = CONFIG;
        config.xclk_freq_hz = 80_000_000;
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::InvalidClock { hz: 80_000_000 })
        );

        let mut config = CONFIG;
        config.fb_count = 0;
        assert_eq!(config.validate(), Err(CameraConfigError::NoFrameBuffers));

        let mut config = CONFIG;
        config.sccb_i2c_port = 2;
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::InvalidSccbPort { port: 2 })
        );
    }

    #[test]
    fn jpeg_quality_only_matters_for_jpeg() {
        let mut config = CONFIG;
        config.jpeg_quality = 64;
        assert_eq!(config.validate(), Ok(()));

        config.pixel_format = PixelFormat::Jpeg;
        assert_eq!(
            config.validate(),
            Err(CameraConfigError::InvalidJpegQuality { quality: 64 })
        );
    }

    #[test]
    fn frame_buffer_len_follows_format() {
        assert_eq!(CONFIG.frame_buffer_len(), 320 * 240 * 2);

        let mut config = CONFIG;
        config.pixel_format = PixelFormat::Grayscale;
        assert_eq!(config.frame_buffer_len(), 320 * 240);

        config.pixel_format = PixelFormat::Jpeg;
        config.frame_size = FrameSize::Vga;
        assert_eq!(config.frame_buffer_len(), 640 * 480 / 5);
    }

    #[test]
    fn dma_buffers_are_burst_aligned_for_every_mode() {
        const FORMATS: [PixelFormat; 4] = [
            PixelFormat::Rgb565,
            PixelFormat::Yuv422,
            PixelFormat::Grayscale,
            PixelFormat::Jpeg,
        ];
        const SIZES: [FrameSize; 10] = [
            FrameSize::Qqvga,
            FrameSize::Qcif,
            FrameSize::Hqvga,
            FrameSize::Qvga,
            FrameSize::Cif,
            FrameSize::Vga,
            FrameSize::Svga,
            FrameSize::Xga,
            FrameSize::Sxga,
            FrameSize::Uxga,
        ];
        // Largest chunk a descriptor takes with 64-byte external bursts
        const CHUNK: usize = 4032;

        for pixel_format in FORMATS {
            for frame_size in SIZES {
                let mut config = CONFIG;
                config.pixel_format = pixel_format;
                config.frame_size = frame_size;

                let frame = config.frame_buffer_len();
                let len = config.dma_buffer_len();
                assert_eq!(len % DMA_BUFFER_ALIGN, 0, "{pixel_format:?} {frame_size:?}");
                assert!(len >= frame && len - frame < DMA_BUFFER_ALIGN);
                assert!(config.dma_descriptor_count(CHUNK) * CHUNK >= len);
            }
        }
    }

    #[test]
    fn odd_jpeg_budget_is_padded() {
        let mut config = CONFIG;
        config.pixel_format = PixelFormat::Jpeg;
        config.frame_size = FrameSize::Qcif;

        assert_eq!(config.frame_buffer_len(), 5068);
        assert_eq!(config.dma_buffer_len(), 5120);
        assert_eq!(config.dma_descriptor_count(4032), 2);
    }

    #[test]
    fn latest_grab_needs_two_buffers() {
        let mut config = CONFIG;
        config.grab_mode = GrabMode::Latest;
        assert_eq!(config.effective_grab_mode(), GrabMode::WhenEmpty);

        config.fb_count = 2;
        assert_eq!(config.effective_grab_mode(), GrabMode::Latest);
    }
}
