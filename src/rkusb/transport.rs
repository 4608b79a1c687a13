//! USB transport abstraction over bulk and control endpoints.

use std::time::Duration;

use rusb::{Context, DeviceHandle};

use super::types::{EP_BULK_IN, EP_BULK_OUT, VENDOR_REQUEST};
use crate::error::Result;

/// Abstraction of the transfer primitives the session needs.
///
/// The real implementation is libusb-backed; tests substitute a scripted
/// mock to exercise sequencing without hardware.
pub trait Transport {
    /// Write to the bulk-out endpoint; returns bytes transferred.
    fn bulk_write(&mut self, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Read from the bulk-in endpoint; returns bytes transferred.
    fn bulk_read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Vendor-class control write with the given index; returns bytes transferred.
    fn control_write(&mut self, index: u16, data: &[u8], timeout: Duration) -> Result<usize>;
}

/// Bulk/control transport over an open libusb device handle.
pub struct UsbTransport {
    handle: DeviceHandle<Context>,
}

impl UsbTransport {
    pub(crate) fn new(handle: DeviceHandle<Context>) -> Self {
        Self { handle }
    }
}

impl Transport for UsbTransport {
    fn bulk_write(&mut self, data: &[u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.write_bulk(EP_BULK_OUT, data, timeout)?)
    }

    fn bulk_read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        Ok(self.handle.read_bulk(EP_BULK_IN, buf, timeout)?)
    }

    fn control_write(&mut self, index: u16, data: &[u8], timeout: Duration) -> Result<usize> {
        let request_type = rusb::request_type(
            rusb::Direction::Out,
            rusb::RequestType::Vendor,
            rusb::Recipient::Device,
        );
        Ok(self
            .handle
            .write_control(request_type, VENDOR_REQUEST, 0, index, data, timeout)?)
    }
}
