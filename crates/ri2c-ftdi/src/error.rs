//! Error types for the FTDI backend

use thiserror::Error;

/// Result type for FTDI operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur opening or configuring an FTDI adapter
#[derive(Debug, Error)]
pub enum FtdiError {
    /// No supported FTDI device found
    #[error("no supported FTDI device found")]
    DeviceNotFound,

    /// Failed to open the device
    #[error("failed to open device: {0}")]
    OpenFailed(String),

    /// Failed to configure the device
    #[error("failed to configure device: {0}")]
    ConfigFailed(String),

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Invalid channel/port specification
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// USB enumeration error
    #[error("USB error: {0}")]
    UsbError(String),
}

impl From<FtdiError> for ri2c_core::Error {
    fn from(e: FtdiError) -> Self {
        match e {
            FtdiError::TransferFailed(s) => ri2c_core::Error::Transport(s),
            other => ri2c_core::Error::Config(other.to_string()),
        }
    }
}
