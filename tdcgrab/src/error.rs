//! Error types for device access and session startup

use tdctools::cfg::ConfigError;
use thiserror::Error;

/// Faults at the device adapter boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// No connection could be established or the device refused to arm
    #[error("no connection to the tagger: {0}")]
    Connect(String),
    /// A channel outside what the device exposes
    #[error("channel {0} is not an input of this device")]
    BadChannel(u8),
    /// Operation on a device that is not open
    #[error("device is closed")]
    Closed,
    /// The device faulted during readout
    #[error("readout failed: {0}")]
    Read(String),
}

/// Why an acquisition session could not start
#[derive(Error, Debug)]
pub enum GrabError {
    /// The requested setup is inconsistent
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The device could not be opened and conditioned
    #[error("device setup failed: {0}")]
    Device(#[from] DeviceError),
}
