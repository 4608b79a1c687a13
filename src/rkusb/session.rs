//! Device discovery and single-session transfer primitives.

use std::time::Duration;

use rusb::{Context, UsbContext};
use tracing::{info, warn};

use super::codec::{self, CommandBlock, ResponseBlock};
use super::transport::{Transport, UsbTransport};
use super::types::{
    BLOCK_SIZE, CHIP_CATALOG, COMMAND_SIZE, DeviceDescriptor, RESPONSE_SIZE, VENDOR_CHUNK,
    VENDOR_ID,
};
use crate::error::{Result, RkError};

/// Default per-transfer timeout. Never pass an unbounded wait to the
/// transport; a disconnected device must fail, not hang.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One open bootloader conversation: the device handle, the matched
/// catalog entry, and the strict ping-pong state of the exchange.
///
/// At most one command/response cycle may be outstanding at a time.
/// `transmit_command` refuses to start a new cycle while the previous
/// response is undrained, because the device would read leftover response
/// bytes as the start of the next command.
pub struct DeviceSession<T: Transport> {
    transport: T,
    descriptor: &'static DeviceDescriptor,
    timeout: Duration,
    response_pending: bool,
}

/// Probe `catalog` entries in declared order; stop at the first success.
pub(crate) fn scan<'c, T>(
    catalog: &'c [DeviceDescriptor],
    mut probe: impl FnMut(&DeviceDescriptor) -> Option<T>,
) -> Option<(&'c DeviceDescriptor, T)> {
    for descriptor in catalog {
        if let Some(opened) = probe(descriptor) {
            return Some((descriptor, opened));
        }
    }
    None
}

impl DeviceSession<UsbTransport> {
    /// Scan the catalog and open the first matching bootloader device.
    pub fn open(timeout: Duration) -> Result<Self> {
        let context = Context::new().map_err(RkError::UsbInit)?;

        let (descriptor, mut handle) = scan(CHIP_CATALOG, |d| {
            context.open_device_with_vid_pid(VENDOR_ID, d.product_id)
        })
        .ok_or(RkError::DeviceNotFound {
            vendor_id: VENDOR_ID,
        })?;

        info!(
            "detected {} (pid {:04x})",
            descriptor.name, descriptor.product_id
        );

        // Detach failure is non-fatal; the claim below decides
        match handle.kernel_driver_active(0) {
            Ok(true) => {
                info!("kernel driver active on interface 0");
                match handle.detach_kernel_driver(0) {
                    Ok(()) => info!("kernel driver detached"),
                    Err(e) => warn!("failed to detach kernel driver: {e}"),
                }
            }
            Ok(false) => {}
            Err(e) => warn!("cannot query kernel driver state: {e}"),
        }

        handle.claim_interface(0)?;

        Ok(Self::new(UsbTransport::new(handle), descriptor, timeout))
    }
}

impl<T: Transport> DeviceSession<T> {
    pub(crate) fn new(transport: T, descriptor: &'static DeviceDescriptor, timeout: Duration) -> Self {
        Self {
            transport,
            descriptor,
            timeout,
            response_pending: false,
        }
    }

    /// Catalog entry the scan matched.
    pub fn descriptor(&self) -> &DeviceDescriptor {
        self.descriptor
    }

    /// Send one 31-byte command block, opening a new exchange.
    pub fn transmit_command(&mut self, block: &CommandBlock) -> Result<()> {
        if self.response_pending {
            return Err(RkError::ResponsePending);
        }
        let sent = self.transport.bulk_write(block, self.timeout)?;
        if sent != COMMAND_SIZE {
            return Err(RkError::ShortTransfer {
                phase: "command",
                expected: COMMAND_SIZE,
                actual: sent,
            });
        }
        self.response_pending = true;
        Ok(())
    }

    /// Drain the 13-byte status reply, closing the current exchange.
    pub fn receive_response(&mut self) -> Result<ResponseBlock> {
        let mut raw = [0u8; RESPONSE_SIZE];
        let got = self.transport.bulk_read(&mut raw, self.timeout)?;
        if got != RESPONSE_SIZE {
            // Exchange stays open: the device still owes response bytes
            return Err(RkError::ShortTransfer {
                phase: "status",
                expected: RESPONSE_SIZE,
                actual: got,
            });
        }
        self.response_pending = false;
        Ok(codec::decode_response(&raw))
    }

    /// Send one payload block of at most `BLOCK_SIZE` bytes.
    pub fn send_payload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > BLOCK_SIZE {
            return Err(RkError::protocol(format!(
                "payload of {} bytes exceeds the {BLOCK_SIZE}-byte block ceiling",
                data.len()
            )));
        }
        let sent = self.transport.bulk_write(data, self.timeout)?;
        if sent != data.len() {
            return Err(RkError::ShortTransfer {
                phase: "payload out",
                expected: data.len(),
                actual: sent,
            });
        }
        Ok(())
    }

    /// Receive one payload block of at most `BLOCK_SIZE` bytes.
    pub fn receive_payload(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > BLOCK_SIZE {
            return Err(RkError::protocol(format!(
                "payload of {} bytes exceeds the {BLOCK_SIZE}-byte block ceiling",
                buf.len()
            )));
        }
        let got = self.transport.bulk_read(buf, self.timeout)?;
        if got != buf.len() {
            return Err(RkError::ShortTransfer {
                phase: "payload in",
                expected: buf.len(),
                actual: got,
            });
        }
        Ok(())
    }

    /// Recover the transport for inspection in tests.
    #[cfg(test)]
    pub(crate) fn into_transport(self) -> T {
        self.transport
    }

    /// Vendor-code control transfer of one chunk to the given RAM slot.
    /// Bypasses the bulk command/response cycle entirely.
    pub fn control_transfer(&mut self, slot: u16, chunk: &[u8]) -> Result<()> {
        if chunk.len() > VENDOR_CHUNK {
            return Err(RkError::protocol(format!(
                "control chunk of {} bytes exceeds the {VENDOR_CHUNK}-byte limit",
                chunk.len()
            )));
        }
        let sent = self.transport.control_write(slot, chunk, self.timeout)?;
        if sent != chunk.len() {
            return Err(RkError::ShortTransfer {
                phase: "control",
                expected: chunk.len(),
                actual: sent,
            });
        }
        Ok(())
    }
}
