//! Logical protocol operations over one device session.
//!
//! Every bulk operation runs three strictly ordered phases: command, then
//! payload (only when data moves), then status. The status reply is drained
//! even for no-payload operations; the device advances its state machine
//! only after the reply leaves, and skipping it desynchronizes the next
//! command.

use tracing::{debug, info};

use super::codec::{self, CommandBlock, ResponseBlock};
use super::session::DeviceSession;
use super::transport::Transport;
use super::types::{
    BLOCK_SIZE, CMD_ERASE_SECTORS, CMD_EXECUTE_SDRAM, CMD_READ_CHIP_INFO, CMD_READ_FLASH_ID,
    CMD_READ_FLASH_INFO, CMD_READ_LBA, CMD_RESET_DEVICE, CMD_TEST_UNIT_READY, CMD_WRITE_LBA,
    SECTOR_SIZE, SECTORS_PER_BLOCK, VENDOR_CHUNK,
};
use super::vendor::VendorCode;
use crate::error::{Result, RkError};

/// Payload phase of one exchange.
enum Payload<'a> {
    None,
    Send(&'a [u8]),
    Receive(&'a mut [u8]),
}

/// Sequences command/payload/status exchanges for each logical operation.
pub struct ProtocolDriver<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> ProtocolDriver<T> {
    pub fn new(session: DeviceSession<T>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    /// Recover the transport for inspection in tests.
    #[cfg(test)]
    pub(crate) fn into_transport(self) -> T {
        self.session.into_transport()
    }

    /// Run one complete exchange. No phase is skipped or reordered.
    fn exchange(&mut self, block: CommandBlock, payload: Payload<'_>) -> Result<ResponseBlock> {
        self.session.transmit_command(&block)?;
        match payload {
            Payload::None => {}
            Payload::Send(data) => self.session.send_payload(data)?,
            Payload::Receive(buf) => self.session.receive_payload(buf)?,
        }
        self.session.receive_response()
    }

    /// Probe that the bootloader answers at all.
    pub fn test_unit_ready(&mut self) -> Result<()> {
        self.exchange(codec::encode_command(CMD_TEST_UNIT_READY, 0, 0), Payload::None)?;
        Ok(())
    }

    /// Raw flash id, 5 bytes.
    pub fn read_flash_id(&mut self) -> Result<[u8; 5]> {
        let mut id = [0u8; 5];
        self.exchange(
            codec::encode_command(CMD_READ_FLASH_ID, 0, 0),
            Payload::Receive(&mut id),
        )?;
        Ok(id)
    }

    /// Raw flash geometry info, 11 bytes.
    pub fn read_flash_info(&mut self) -> Result<[u8; 11]> {
        let mut raw = [0u8; 11];
        self.exchange(
            codec::encode_command(CMD_READ_FLASH_INFO, 0, 0),
            Payload::Receive(&mut raw),
        )?;
        Ok(raw)
    }

    /// Raw chip identification, 16 bytes.
    pub fn read_chip_info(&mut self) -> Result<[u8; 16]> {
        let mut raw = [0u8; 16];
        self.exchange(
            codec::encode_command(CMD_READ_CHIP_INFO, 0, 0),
            Payload::Receive(&mut raw),
        )?;
        Ok(raw)
    }

    /// Read `count` 512-byte sectors starting at sector `offset`, in
    /// whole-block exchanges of at most 32 sectors each.
    pub fn read_sectors(&mut self, mut offset: u32, count: u16) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(count as usize * SECTOR_SIZE);
        let mut remaining = count;
        while remaining > 0 {
            let nsectors = remaining.min(SECTORS_PER_BLOCK);
            let mut block = vec![0u8; nsectors as usize * SECTOR_SIZE];
            self.exchange(
                codec::encode_command(CMD_READ_LBA, offset, nsectors),
                Payload::Receive(&mut block),
            )?;
            debug!("read {nsectors} sectors at offset {offset}");
            out.extend_from_slice(&block);
            offset += u32::from(nsectors);
            remaining -= nsectors;
        }
        Ok(out)
    }

    /// Write whole sectors starting at sector `offset`, in whole-block
    /// exchanges of at most 32 sectors each.
    pub fn write_sectors(&mut self, mut offset: u32, data: &[u8]) -> Result<()> {
        if data.len() % SECTOR_SIZE != 0 {
            return Err(RkError::protocol(format!(
                "write payload of {} bytes is not a whole number of {SECTOR_SIZE}-byte sectors",
                data.len()
            )));
        }
        for chunk in data.chunks(BLOCK_SIZE) {
            let nsectors = (chunk.len() / SECTOR_SIZE) as u16;
            self.exchange(
                codec::encode_command(CMD_WRITE_LBA, offset, nsectors),
                Payload::Send(chunk),
            )?;
            debug!("wrote {nsectors} sectors at offset {offset}");
            offset += u32::from(nsectors);
        }
        Ok(())
    }

    /// Erase `count` sectors starting at sector `offset`.
    pub fn erase_sectors(&mut self, offset: u32, count: u16) -> Result<()> {
        self.exchange(
            codec::encode_command(CMD_ERASE_SECTORS, offset, count),
            Payload::None,
        )?;
        Ok(())
    }

    /// Execute code already placed in SDRAM.
    pub fn execute(&mut self, krnl_addr: u32, parm_addr: u32) -> Result<()> {
        info!("executing at {krnl_addr:#010x} (parameters at {parm_addr:#010x})");
        self.exchange(
            codec::encode_execute(CMD_EXECUTE_SDRAM, krnl_addr, parm_addr),
            Payload::None,
        )?;
        Ok(())
    }

    /// Reset the device with the given flag byte.
    pub fn reset(&mut self, flag: u8) -> Result<()> {
        info!("resetting device (flag {flag})");
        self.exchange(codec::encode_reset(CMD_RESET_DEVICE, flag), Payload::None)?;
        Ok(())
    }

    /// Deliver a prepared vendor-code buffer to its RAM slot in control
    /// transfers of at most 4096 bytes. This path never touches the bulk
    /// command/response cycle.
    pub fn push_vendor_code(&mut self, code: &VendorCode) -> Result<()> {
        info!(
            "pushing {} bytes of vendor code to slot {}",
            code.len(),
            code.slot()
        );
        for chunk in code.as_bytes().chunks(VENDOR_CHUNK) {
            self.session.control_transfer(code.slot(), chunk)?;
        }
        Ok(())
    }
}
