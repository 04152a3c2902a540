//! Error types for the FT4222H bridge

use thiserror::Error;

use crate::device::InterfaceKind;

/// Result type for FT4222 operations
pub type Result<T> = std::result::Result<T, Ft4222Error>;

/// Errors that can occur when using the FT4222H bridge
#[derive(Debug, Error)]
pub enum Ft4222Error {
    /// No FT4222H on the bus
    #[error("FT4222H device not found (VID:0403 PID:601c)")]
    DeviceNotFound,

    /// The requested interface index does not exist
    #[error("{kind} interface index {index} out of range ({available} available) -- board not connected?")]
    InterfaceNotFound {
        /// Interface kind that was requested
        kind: InterfaceKind,
        /// Requested index
        index: usize,
        /// Number of interfaces of that kind
        available: usize,
    },

    /// Failed to open device
    #[error("Failed to open FT4222H: {0}")]
    OpenFailed(String),

    /// Failed to claim interface
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Invalid response from device
    #[error("Invalid response from FT4222H: {0}")]
    InvalidResponse(String),

    /// Timeout during operation
    #[error("Timeout during USB transfer")]
    Timeout,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<nusb::Error> for Ft4222Error {
    fn from(e: nusb::Error) -> Self {
        Ft4222Error::TransferFailed(e.to_string())
    }
}

impl From<Ft4222Error> for gbcom_core::Error {
    fn from(e: Ft4222Error) -> Self {
        match e {
            Ft4222Error::Timeout => gbcom_core::Error::Timeout,
            other => gbcom_core::Error::Transport(other.to_string()),
        }
    }
}
