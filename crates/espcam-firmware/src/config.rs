use core::time::Duration;

use espcam_core::camera::{FrameBufferLocation, GrabMode};
use espcam_core::{CameraConfig, CameraPins, FrameSize, PixelFormat, RetryPolicy};

pub(crate) struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
    pub hostname: &'static str,
    pub retry: RetryPolicy,
    /// How long startup waits for an address, `None` waits forever
    pub wait_timeout: Option<embassy_time::Duration>,
}

pub(crate) const WIFI: WifiConfig = WifiConfig {
    ssid: env!("WIFI_SSID"),
    password: env!("WIFI_PASSWORD"),
    hostname: match option_env!("WIFI_HOSTNAME") {
        Some(hostname) => hostname,
        None => "espcam",
    },
    retry: retry_policy(),
    wait_timeout: match env_u32(option_env!("WIFI_WAIT_TIMEOUT_SECS"), 0) {
        0 => None,
        secs => Some(embassy_time::Duration::from_secs(secs as u64)),
    },
};

/// Seeed XIAO ESP32S3 Sense with the OV2640 module
pub(crate) const CAMERA: CameraConfig = CameraConfig {
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
};

const fn retry_policy() -> RetryPolicy {
    match env_u32(option_env!("WIFI_MAX_ATTEMPTS"), 0) {
        0 => RetryPolicy::Unbounded,
        attempts => RetryPolicy::bounded(
            attempts,
            Duration::from_millis(env_u32(option_env!("WIFI_BACKOFF_BASE_MS"), 500) as u64),
            Duration::from_millis(env_u32(option_env!("WIFI_BACKOFF_MAX_MS"), 30_000) as u64),
        ),
    }
}

/// Parse a decimal build-time setting. Garbage fails the build.
const fn env_u32(value: Option<&str>, default: u32) -> u32 {
    let Some(value) = value else {
        return default;
    };
    let bytes = value.as_bytes();
    assert!(!bytes.is_empty(), "empty numeric setting");

    let mut result: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "numeric setting is not a decimal number");
        result = match result.checked_mul(10) {
            Some(shifted) => match shifted.checked_add((digit - b'0') as u32) {
                Some(next) => next,
                None => panic!("numeric setting overflows u32"),
            },
            None => panic!("numeric setting overflows u32"),
        };
        i += 1;
    }
    result
}
