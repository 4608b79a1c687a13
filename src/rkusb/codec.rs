//! Command and response block encoding.
//!
//! Every command travels as one 31-byte block: "USBC" magic, a random
//! big-endian correlation tag, the command code, then variant-specific
//! fields. Blocks are always built into a freshly zeroed array, so a field
//! left unwritten is indistinguishable on the wire from an explicit zero.
//! That quirk is load-bearing: the device treats zero and absent the same,
//! and the encoders preserve it by skipping zero-valued fields.

use std::fmt;

use super::types::{COMMAND_MAGIC, COMMAND_SIZE, RESPONSE_SIZE};

/// A fully populated 31-byte host-to-device command.
pub(crate) type CommandBlock = [u8; COMMAND_SIZE];

/// Opaque 13-byte device-to-host status reply.
///
/// The internal field layout is not publicly documented; nothing in this
/// crate interprets it beyond requiring that all 13 bytes arrive. The tag
/// is never echo-checked against the command that triggered the reply.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ResponseBlock {
    raw: [u8; RESPONSE_SIZE],
}

impl ResponseBlock {
    pub fn as_bytes(&self) -> &[u8; RESPONSE_SIZE] {
        &self.raw
    }
}

impl fmt::Debug for ResponseBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseBlock({:02x?})", self.raw)
    }
}

/// Zeroed block with magic, tag, and command code filled in.
fn fresh_block(tag: u32, code: u32) -> CommandBlock {
    let mut block = [0u8; COMMAND_SIZE];
    block[0..4].copy_from_slice(&COMMAND_MAGIC);
    if tag != 0 {
        block[4..8].copy_from_slice(&tag.to_be_bytes());
    }
    block[12..16].copy_from_slice(&code.to_be_bytes());
    block
}

/// Generic command: 32-bit sector offset plus 16-bit sector count.
pub(crate) fn encode_command(code: u32, offset: u32, nsectors: u16) -> CommandBlock {
    encode_command_with_tag(rand::random(), code, offset, nsectors)
}

pub(crate) fn encode_command_with_tag(tag: u32, code: u32, offset: u32, nsectors: u16) -> CommandBlock {
    let mut block = fresh_block(tag, code);
    if offset != 0 {
        block[17..21].copy_from_slice(&offset.to_be_bytes());
    }
    if nsectors != 0 {
        block[22..24].copy_from_slice(&nsectors.to_be_bytes());
    }
    block
}

/// Reset command: a single flag byte in place of address and count.
pub(crate) fn encode_reset(code: u32, flag: u8) -> CommandBlock {
    encode_reset_with_tag(rand::random(), code, flag)
}

pub(crate) fn encode_reset_with_tag(tag: u32, code: u32, flag: u8) -> CommandBlock {
    let mut block = fresh_block(tag, code);
    block[16] = flag;
    block
}

/// Execute command: two optional 32-bit addresses, kernel then parameter.
pub(crate) fn encode_execute(code: u32, krnl_addr: u32, parm_addr: u32) -> CommandBlock {
    encode_execute_with_tag(rand::random(), code, krnl_addr, parm_addr)
}

pub(crate) fn encode_execute_with_tag(tag: u32, code: u32, krnl_addr: u32, parm_addr: u32) -> CommandBlock {
    let mut block = fresh_block(tag, code);
    if krnl_addr != 0 {
        block[17..21].copy_from_slice(&krnl_addr.to_be_bytes());
    }
    if parm_addr != 0 {
        block[22..26].copy_from_slice(&parm_addr.to_be_bytes());
    }
    block
}

/// Wrap a raw 13-byte reply; pass-through, no interpretation.
pub(crate) fn decode_response(raw: &[u8; RESPONSE_SIZE]) -> ResponseBlock {
    ResponseBlock { raw: *raw }
}
