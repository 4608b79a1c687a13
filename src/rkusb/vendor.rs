//! Vendor-code preparation: pad, cipher, checksum trailer.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::types::{CRC_SEED, VENDOR_PAGE};
use super::{crc, rc4};
use crate::error::{Result, RkError};

/// A vendor-code blob ready for control-transfer delivery.
///
/// Layout: content zero-padded to a multiple of 2048 bytes, ciphered in
/// place, followed by a 2-byte big-endian CRC over the ciphered region.
#[derive(Debug)]
pub struct VendorCode {
    data: Vec<u8>,
    slot: u16,
}

impl VendorCode {
    /// Build the transmission buffer from raw content.
    pub fn prepare(content: &[u8], slot: u16) -> Self {
        // Empty content pads to zero pages, not one
        let padded = content.len().div_ceil(VENDOR_PAGE) * VENDOR_PAGE;

        let mut data = vec![0u8; padded + 2];
        data[..content.len()].copy_from_slice(content);

        // Cipher first: the checksum covers ciphertext, padding included
        rc4::cipher(&mut data[..padded]);
        let checksum = crc::crc16(CRC_SEED, &data[..padded]);
        data[padded] = (checksum >> 8) as u8;
        data[padded + 1] = checksum as u8;

        debug!(
            "vendor code: {} content bytes padded to {padded}, crc {checksum:04x}",
            content.len()
        );

        Self { data, slot }
    }

    /// Read a source file and prepare it. An unreadable source surfaces as
    /// a typed error before any size is computed.
    pub fn load(path: &Path, slot: u16) -> Result<Self> {
        let content = fs::read(path).map_err(|source| RkError::VendorCodeUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::prepare(&content, slot))
    }

    /// Target RAM slot, carried unchanged into the control-transfer index.
    pub fn slot(&self) -> u16 {
        self.slot
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
