mod camera;
mod network;
mod random;

pub(crate) use camera::{CameraPeripherals, EspCameraDriver};
pub(crate) use network::init_network_stack;
pub(crate) use random::HardwareRng;
