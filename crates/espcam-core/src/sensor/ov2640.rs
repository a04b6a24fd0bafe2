use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::bringup::CameraError;
use crate::camera::{CameraConfig, FrameSize, PixelFormat};

/// 7-bit SCCB address of the OV2640
pub const OV2640_ADDRESS: u8 = 0x30;

/// Product id high byte reported by the OV2640
pub const OV2640_PID: u8 = 0x26;

// Register bank selector, shared by both banks
const BANK_SEL: u8 = 0xFF;
const BANK_DSP: u8 = 0x00;
const BANK_SENSOR: u8 = 0x01;

// Sensor bank
const COM7: u8 = 0x12;
const COM7_SRST: u8 = 0x80;
const COM7_RES_UXGA: u8 = 0x00;
const COM7_RES_SVGA: u8 = 0x40;
const COM7_RES_CIF: u8 = 0x20;
const PIDH: u8 = 0x0A;
const PIDL: u8 = 0x0B;

// DSP bank
const R_BYPASS: u8 = 0x05;
const R_BYPASS_DSP_EN: u8 = 0x00;
const QS: u8 = 0x44;
const ZMOW: u8 = 0x5A;
const ZMOH: u8 = 0x5B;
const ZMHH: u8 = 0x5C;
const IMAGE_MODE: u8 = 0xDA;
const IMAGE_MODE_Y8_DVP_EN: u8 = 0x40;
const IMAGE_MODE_JPEG_EN: u8 = 0x10;
const IMAGE_MODE_YUV422: u8 = 0x00;
const IMAGE_MODE_RGB565: u8 = 0x08;
const RESET: u8 = 0xE0;
const RESET_DVP: u8 = 0x04;

/// Sensor identification read from the product id registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorId {
    pub pid: u8,
    pub ver: u8,
}

#[derive(Debug)]
pub enum SensorError<E> {
    /// SCCB transfer failed
    Bus(E),
    /// Something answered, but it is not an OV2640
    NotDetected(SensorId),
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus(e) => write!(f, "SCCB error: {:?}", e),
            SensorError::NotDetected(id) => write!(
                f,
                "unexpected sensor PID=0x{:02x} VER=0x{:02x}",
                id.pid, id.ver
            ),
        }
    }
}

impl<E> From<SensorError<E>> for CameraError {
    fn from(e: SensorError<E>) -> Self {
        match e {
            SensorError::Bus(_) => CameraError::Sccb,
            SensorError::NotDetected(id) => CameraError::SensorNotDetected {
                pid: id.pid,
                ver: id.ver,
            },
        }
    }
}

/// OV2640 control over an SCCB (I2C) bus
pub struct Ov2640<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Ov2640<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: OV2640_ADDRESS,
        }
    }

    /// Release the bus
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Software reset; all registers return to their defaults
    pub fn reset(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.select_bank(BANK_SENSOR)?;
        self.write_register(COM7, COM7_SRST)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    /// Read the product id and check that this is an OV2640
    pub fn probe(&mut self) -> Result<SensorId, SensorError<I2C::Error>> {
        self.select_bank(BANK_SENSOR)?;
        let id = SensorId {
            pid: self.read_register(PIDH)?,
            ver: self.read_register(PIDL)?,
        };
        if id.pid != OV2640_PID {
            return Err(SensorError::NotDetected(id));
        }
        Ok(id)
    }

    /// Program window, output format, output size and JPEG quality
    pub fn configure(&mut self, config: &CameraConfig) -> Result<(), SensorError<I2C::Error>> {
        self.select_bank(BANK_SENSOR)?;
        self.write_register(COM7, sensor_window(config.frame_size))?;

        self.select_bank(BANK_DSP)?;
        self.write_register(RESET, RESET_DVP)?;
        self.write_register(IMAGE_MODE, image_mode(config.pixel_format))?;
        if config.pixel_format == PixelFormat::Jpeg {
            self.write_register(QS, config.jpeg_quality)?;
        }

        let [zmow, zmoh, zmhh] = output_size(config.frame_size);
        self.write_register(ZMOW, zmow)?;
        self.write_register(ZMOH, zmoh)?;
        self.write_register(ZMHH, zmhh)?;

        self.write_register(R_BYPASS, R_BYPASS_DSP_EN)?;
        self.write_register(RESET, 0x00)?;
        self.delay.delay_ms(10);
        Ok(())
    }

    fn select_bank(&mut self, bank: u8) -> Result<(), SensorError<I2C::Error>> {
        self.write_register(BANK_SEL, bank)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError<I2C::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(SensorError::Bus)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, SensorError<I2C::Error>> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[register], &mut value)
            .map_err(SensorError::Bus)?;
        Ok(value[0])
    }
}

/// Smallest sensor window covering the requested frame
fn sensor_window(frame_size: FrameSize) -> u8 {
    match frame_size.width() {
        0..=400 => COM7_RES_CIF,
        401..=800 => COM7_RES_SVGA,
        _ => COM7_RES_UXGA,
    }
}

fn image_mode(format: PixelFormat) -> u8 {
    match format {
        PixelFormat::Rgb565 => IMAGE_MODE_RGB565,
        PixelFormat::Yuv422 => IMAGE_MODE_YUV422,
        PixelFormat::Grayscale => IMAGE_MODE_YUV422 | IMAGE_MODE_Y8_DVP_EN,
        PixelFormat::Jpeg => IMAGE_MODE_JPEG_EN,
    }
}

/// Output zoom registers, dimensions are programmed in units of four pixels
fn output_size(frame_size: FrameSize) -> [u8; 3] {
    let [w_hi, w_lo] = (frame_size.width() / 4).to_be_bytes();
    let [h_hi, h_lo] = (frame_size.height() / 4).to_be_bytes();
    // ZMHH: bit 2 is OUTH[8], bits 1:0 are OUTW[9:8]
    [w_lo, h_lo, ((h_hi & 0x01) << 2) | (w_hi & 0x03)]
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    use super::*;
    use crate::camera::{CameraPins, FrameBufferLocation, GrabMode};

    /// Register file of a fake sensor with two banks
    struct FakeSccb {
        banks: [[u8; 256]; 2],
        bank: usize,
        pointer: u8,
        writes: Vec<(usize, u8, u8)>,
        offline: bool,
    }

    impl FakeSccb {
        fn with_id(pid: u8, ver: u8) -> Self {
            let mut banks = [[0u8; 256]; 2];
            banks[usize::from(BANK_SENSOR)][usize::from(PIDH)] = pid;
            banks[usize::from(BANK_SENSOR)][usize::from(PIDL)] = ver;
            Self {
                banks,
                bank: 0,
                pointer: 0,
                writes: Vec::new(),
                offline: false,
            }
        }

        fn dsp(&self, register: u8) -> u8 {
            self.banks[usize::from(BANK_DSP)][usize::from(register)]
        }

        fn sensor(&self, register: u8) -> u8 {
            self.banks[usize::from(BANK_SENSOR)][usize::from(register)]
        }
    }

    impl ErrorType for FakeSccb {
        type Error = ErrorKind;
    }

    impl I2c for FakeSccb {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.offline || address != OV2640_ADDRESS {
                return Err(ErrorKind::Other);
            }
            for operation in operations {
                match operation {
                    Operation::Write([register]) => self.pointer = *register,
                    Operation::Write([BANK_SEL, bank]) => self.bank = usize::from(*bank & 0x01),
                    Operation::Write([register, value]) => {
                        self.banks[self.bank][usize::from(*register)] = *value;
                        self.writes.push((self.bank, *register, *value));
                    }
                    Operation::Write(_) => return Err(ErrorKind::Other),
                    Operation::Read(buffer) => {
                        for byte in buffer.iter_mut() {
                            *byte = self.banks[self.bank][usize::from(self.pointer)];
                            self.pointer = self.pointer.wrapping_add(1);
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn config(pixel_format: PixelFormat, frame_size: FrameSize) -> CameraConfig {
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
            pixel_format,
            frame_size,
            jpeg_quality: 12,
            fb_count: 2,
            fb_location: FrameBufferLocation::Psram,
            grab_mode: GrabMode::WhenEmpty,
            sccb_i2c_port: 1,
        }
    }

    #[test]
    fn probe_accepts_ov2640() {
        let mut sensor = Ov2640::new(FakeSccb::with_id(0x26, 0x42), NoDelay);

        assert_eq!(sensor.probe().unwrap(), SensorId { pid: 0x26, ver: 0x42 });
    }

    #[test]
    fn probe_rejects_other_sensors() {
        let mut sensor = Ov2640::new(FakeSccb::with_id(0x36, 0x40), NoDelay);

        let err = sensor.probe().unwrap_err();
        assert!(matches!(
            err,
            SensorError::NotDetected(SensorId { pid: 0x36, ver: 0x40 })
        ));
        assert_eq!(
            CameraError::from(err),
            CameraError::SensorNotDetected { pid: 0x36, ver: 0x40 }
        );
    }

    #[test]
    fn bus_errors_map_to_sccb() {
        let mut bus = FakeSccb::with_id(0x26, 0x42);
        bus.offline = true;
        let mut sensor = Ov2640::new(bus, NoDelay);

        let err = sensor.reset().unwrap_err();
        assert_eq!(CameraError::from(err), CameraError::Sccb);
    }

    #[test]
    fn reset_writes_soft_reset_bit_in_sensor_bank() {
        let mut sensor = Ov2640::new(FakeSccb::with_id(0x26, 0x42), NoDelay);
        sensor.reset().unwrap();

        let bus = sensor.release();
        assert_eq!(bus.writes, vec![(usize::from(BANK_SENSOR), COM7, COM7_SRST)]);
    }

    #[test]
    fn configure_rgb565_qvga() {
        let mut sensor = Ov2640::new(FakeSccb::with_id(0x26, 0x42), NoDelay);
        sensor
            .configure(&config(PixelFormat::Rgb565, FrameSize::Qvga))
            .unwrap();

        let bus = sensor.release();
        assert_eq!(bus.sensor(COM7), COM7_RES_CIF);
        assert_eq!(bus.dsp(IMAGE_MODE), IMAGE_MODE_RGB565);
        assert_eq!(bus.dsp(ZMOW), 80);
        assert_eq!(bus.dsp(ZMOH), 60);
        assert_eq!(bus.dsp(ZMHH), 0);
        assert_eq!(bus.dsp(R_BYPASS), R_BYPASS_DSP_EN);
        assert_eq!(bus.dsp(RESET), 0x00);
        assert!(!bus.writes.iter().any(|&(_, register, _)| register == QS));
    }

    #[test]
    fn configure_jpeg_uxga_sets_quality_and_high_bits() {
        let mut sensor = Ov2640::new(FakeSccb::with_id(0x26, 0x42), NoDelay);
        sensor
            .configure(&config(PixelFormat::Jpeg, FrameSize::Uxga))
            .unwrap();

        let bus = sensor.release();
        assert_eq!(bus.sensor(COM7), COM7_RES_UXGA);
        assert_eq!(bus.dsp(IMAGE_MODE), IMAGE_MODE_JPEG_EN);
        assert_eq!(bus.dsp(QS), 12);
        // 1600 / 4 = 400 = 0x190, 1200 / 4 = 300 = 0x12C
        assert_eq!(bus.dsp(ZMOW), 0x90);
        assert_eq!(bus.dsp(ZMOH), 0x2C);
        assert_eq!(bus.dsp(ZMHH), 0x04 | 0x01);
    }

    #[test]
    fn grayscale_enables_y8_output() {
        assert_eq!(
            image_mode(PixelFormat::Grayscale),
            IMAGE_MODE_YUV422 | IMAGE_MODE_Y8_DVP_EN
        );
        assert_eq!(sensor_window(FrameSize::Svga), COM7_RES_SVGA);
    }
}
