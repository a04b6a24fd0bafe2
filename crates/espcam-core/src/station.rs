use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::String;

use crate::association::StationEvent;

/// Maximum SSID length in bytes
pub const MAX_SSID_LEN: usize = 32;
/// Maximum WPA passphrase length in bytes
pub const MAX_PASSWORD_LEN: usize = 64;
/// Minimum WPA passphrase length in bytes
pub const MIN_PASSWORD_LEN: usize = 8;

/// Station event channel capacity
pub const STATION_EVENT_QUEUE_SIZE: usize = 8;

/// Type alias for the station event channel
pub type StationEventChannel =
    Channel<CriticalSectionRawMutex, StationEvent, STATION_EVENT_QUEUE_SIZE>;

/// Type alias for the station event sender
pub type StationEventSender<'a> =
    Sender<'a, CriticalSectionRawMutex, StationEvent, STATION_EVENT_QUEUE_SIZE>;

/// Type alias for the station event receiver
pub type StationEventReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, StationEvent, STATION_EVENT_QUEUE_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationError {
    /// Radio driver refused the request
    Radio,
    /// Command queue to the radio is gone
    Closed,
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationError::Radio => write!(f, "radio refused the request"),
            StationError::Closed => write!(f, "radio command queue closed"),
        }
    }
}

/// Port for the WiFi station driver
#[allow(async_fn_in_trait)]
pub trait StationControl {
    /// Ask the radio to (re)connect to the configured access point.
    ///
    /// The outcome arrives later as a [`StationEvent`].
    async fn connect(&mut self) -> Result<(), StationError>;
}

impl<T: StationControl + ?Sized> StationControl for &mut T {
    async fn connect(&mut self) -> Result<(), StationError> {
        (**self).connect().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsError {
    EmptySsid,
    SsidTooLong,
    PasswordTooShort,
    PasswordTooLong,
}

impl fmt::Display for CredentialsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsError::EmptySsid => write!(f, "SSID is empty"),
            CredentialsError::SsidTooLong => {
                write!(f, "SSID is longer than {MAX_SSID_LEN} bytes")
            }
            CredentialsError::PasswordTooShort => {
                write!(f, "password is shorter than {MIN_PASSWORD_LEN} bytes")
            }
            CredentialsError::PasswordTooLong => {
                write!(f, "password is longer than {MAX_PASSWORD_LEN} bytes")
            }
        }
    }
}

/// Access point name and shared secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationCredentials {
    ssid: String<MAX_SSID_LEN>,
    password: String<MAX_PASSWORD_LEN>,
}

impl StationCredentials {
    /// An empty password selects an open network
    pub fn new(ssid: &str, password: &str) -> Result<Self, CredentialsError> {
        if ssid.is_empty() {
            return Err(CredentialsError::EmptySsid);
        }
        if !password.is_empty() && password.len() < MIN_PASSWORD_LEN {
            return Err(CredentialsError::PasswordTooShort);
        }

        let mut credentials = Self {
            ssid: String::new(),
            password: String::new(),
        };
        credentials
            .ssid
            .push_str(ssid)
            .map_err(|()| CredentialsError::SsidTooLong)?;
        credentials
            .password
            .push_str(password)
            .map_err(|()| CredentialsError::PasswordTooLong)?;

        Ok(credentials)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}
