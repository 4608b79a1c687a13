//! Error types and handling.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum RkError {
    /// USB environment (libusb context) could not be initialized
    #[error("USB environment initialization failed: {0}")]
    UsbInit(#[source] rusb::Error),

    /// No device in the catalog answered on the Rockchip vendor id
    #[error("no bootloader device found for vendor {vendor_id:04x}")]
    DeviceNotFound { vendor_id: u16 },

    /// Transfer-level USB error
    #[error("USB transfer error: {0}")]
    Usb(#[from] rusb::Error),

    /// A transfer moved fewer bytes than the protocol requires
    #[error("short {phase} transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer {
        phase: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A command was issued before the previous response was drained
    #[error("command issued while a response is still pending")]
    ResponsePending,

    /// Protocol sequencing or sizing violation
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Vendor code source file could not be read
    #[error("cannot read vendor code from {path}: {source}")]
    VendorCodeUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for RkError
pub type Result<T> = std::result::Result<T, RkError>;

impl RkError {
    /// Setup failures end the session; everything else is recoverable at
    /// the caller's discretion.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::UsbInit(_) | Self::DeviceNotFound { .. })
    }

    /// Create a protocol error with message
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
