#![cfg_attr(not(test), no_std)]

//! Hardware-independent core of the ESP32-S3 camera station
//!
//! Architecture layers:
//! - `camera` - Camera configuration record and its validation
//! - `bringup` - [`CameraDriver`] port and the fatal-on-failure bring-up call
//! - `sensor` - SCCB register programming for the OV2640 image sensor
//! - `association` - WiFi station association state machine
//! - `retry` - Reconnect policy (unbounded or bounded with backoff)
//! - `signal` - Single-use [`ConnectionSignal`]
//! - `station` - [`StationControl`] port, credentials and event channel
//! - `handler` - Async loop driving the state machine from the event channel
//! - `app` - Startup milestones and the idle heartbeat
//!
//! Nothing here touches ESP32 peripherals directly, so the crate builds and
//! tests on the host.

pub mod app;
pub mod association;
pub mod bringup;
pub mod camera;
pub mod handler;
pub mod retry;
pub mod sensor;
pub mod signal;
pub mod station;

pub use app::Heartbeat;
pub use association::{Action, AssociationMachine, AssociationState, StationEvent};
pub use bringup::{CameraDriver, CameraError, bring_up};
pub use camera::{CameraConfig, CameraConfigError, CameraPins, FrameSize, PixelFormat};
pub use handler::AssociationHandler;
pub use retry::RetryPolicy;
pub use sensor::Ov2640;
pub use signal::{AssociationOutcome, ConnectionSignal};
pub use station::{StationControl, StationCredentials, StationError};
