//! Rockchip USB bootloader protocol client.
//!
//! Implements the vendor command protocol spoken by the mask ROM and
//! loader of Rockchip SoCs over USB bulk transfers, plus the RC4-ciphered
//! vendor-code delivery path over control transfers.

mod codec;
mod crc;
mod driver;
mod rc4;
mod session;
mod transport;
mod types;
mod vendor;

#[cfg(test)]
mod tests;

// Re-export public API
pub use codec::ResponseBlock;
pub use driver::ProtocolDriver;
pub use session::{DEFAULT_TIMEOUT, DeviceSession};
pub use transport::{Transport, UsbTransport};
pub use types::{CHIP_CATALOG, DeviceDescriptor, VENDOR_ID};
pub use vendor::VendorCode;
