//! Infrastructure layer - Port implementations
//!
//! Concrete implementations of the core ports ([`espcam_core::CameraDriver`],
//! [`espcam_core::StationControl`]) on top of the ESP32-S3 peripherals, plus
//! the background tasks that drive them.

pub(crate) mod drivers;
pub(crate) mod tasks;
