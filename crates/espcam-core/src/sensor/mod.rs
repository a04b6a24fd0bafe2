//! Image sensor control over SCCB

mod ov2640;

pub use ov2640::{OV2640_ADDRESS, OV2640_PID, Ov2640, SensorError, SensorId};
