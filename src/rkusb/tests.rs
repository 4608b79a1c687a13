//! Unit tests for the bootloader protocol client.

use std::collections::VecDeque;
use std::time::Duration;

use super::codec::{
    decode_response, encode_command_with_tag, encode_execute_with_tag, encode_reset_with_tag,
};
use super::driver::ProtocolDriver;
use super::session::{DeviceSession, scan};
use super::transport::Transport;
use super::types::{
    BLOCK_SIZE, CHIP_CATALOG, CMD_READ_LBA, CMD_RESET_DEVICE, CMD_TEST_UNIT_READY, CMD_WRITE_LBA,
    COMMAND_MAGIC, COMMAND_SIZE, CRC_SEED, DeviceDescriptor, RESPONSE_SIZE, VENDOR_CHUNK,
};
use super::vendor::VendorCode;
use super::{crc, rc4};
use crate::error::RkError;

/// Scripted transport: captures writes, replays queued reads.
#[derive(Default)]
struct MockTransport {
    bulk_out: Vec<Vec<u8>>,
    bulk_in: VecDeque<Vec<u8>>,
    control: Vec<(u16, Vec<u8>)>,
}

impl MockTransport {
    fn queue_response(&mut self) {
        self.bulk_in.push_back(vec![0u8; RESPONSE_SIZE]);
    }
}

impl Transport for MockTransport {
    fn bulk_write(&mut self, data: &[u8], _timeout: Duration) -> crate::error::Result<usize> {
        self.bulk_out.push(data.to_vec());
        Ok(data.len())
    }

    fn bulk_read(&mut self, buf: &mut [u8], _timeout: Duration) -> crate::error::Result<usize> {
        let next = self.bulk_in.pop_front().unwrap_or_default();
        let n = next.len().min(buf.len());
        buf[..n].copy_from_slice(&next[..n]);
        Ok(n)
    }

    fn control_write(&mut self, index: u16, data: &[u8], _timeout: Duration) -> crate::error::Result<usize> {
        self.control.push((index, data.to_vec()));
        Ok(data.len())
    }
}

fn mock_session(transport: MockTransport) -> DeviceSession<MockTransport> {
    DeviceSession::new(transport, &CHIP_CATALOG[0], Duration::from_secs(1))
}

// --- Binary codec ---

#[test]
fn test_encode_command_layout() {
    let block = encode_command_with_tag(0xDEAD_BEEF, CMD_TEST_UNIT_READY, 0, 0);

    assert_eq!(block.len(), COMMAND_SIZE);
    assert_eq!(&block[0..4], &COMMAND_MAGIC);
    assert_eq!(&block[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(&block[12..16], &[0x80, 0x00, 0x06, 0x00]);

    // Everything else stays zero
    assert!(block[8..12].iter().all(|&b| b == 0));
    assert!(block[16..].iter().all(|&b| b == 0));
}

#[test]
fn test_encode_command_offset_and_count_big_endian() {
    let block = encode_command_with_tag(1, CMD_READ_LBA, 0x0102_0304, 0x0A0B);

    assert_eq!(&block[17..21], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&block[22..24], &[0x0A, 0x0B]);
    assert_eq!(&block[24..], [0u8; 7]);
}

#[test]
fn test_encode_command_zero_fields_indistinguishable_from_unset() {
    // Zero offset and count are skipped by the encoder; the freshly
    // zeroed block makes that identical to writing them explicitly
    let block = encode_command_with_tag(7, CMD_READ_LBA, 0, 0);
    assert!(block[16..].iter().all(|&b| b == 0));
}

#[test]
fn test_encode_reset_flag_byte() {
    let block = encode_reset_with_tag(1, CMD_RESET_DEVICE, 3);

    assert_eq!(&block[12..16], &[0x00, 0x00, 0x06, 0xFF]);
    assert_eq!(block[16], 3);
    assert!(block[17..].iter().all(|&b| b == 0));
}

#[test]
fn test_encode_execute_two_addresses() {
    let block = encode_execute_with_tag(1, super::types::CMD_EXECUTE_SDRAM, 0x6000_0000, 0x6020_0000);

    assert_eq!(&block[17..21], &[0x60, 0x00, 0x00, 0x00]);
    assert_eq!(&block[22..26], &[0x60, 0x20, 0x00, 0x00]);
    assert_eq!(&block[26..], [0u8; 5]);
}

#[test]
fn test_encode_execute_zero_addresses_left_unwritten() {
    let block = encode_execute_with_tag(1, super::types::CMD_EXECUTE_SDRAM, 0, 0);
    assert!(block[16..].iter().all(|&b| b == 0));
}

#[test]
fn test_decode_response_is_opaque_passthrough() {
    let raw: [u8; RESPONSE_SIZE] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];
    let response = decode_response(&raw);
    assert_eq!(response.as_bytes(), &raw);
}

// --- Checksum and cipher collaborators ---

#[test]
fn test_checksum_reference_values() {
    assert_eq!(crc::crc16(CRC_SEED, &[0u8; 2048]), 0xC584);
    assert_eq!(crc::crc16(CRC_SEED, b"123456789"), 0x29B1);
    assert_eq!(crc::crc16(CRC_SEED, &[]), CRC_SEED);
}

#[test]
fn test_checksum_is_stable_across_runs() {
    let buf = [0x5Au8; 777];
    assert_eq!(crc::crc16(CRC_SEED, &buf), crc::crc16(CRC_SEED, &buf));
}

#[test]
fn test_cipher_known_keystream() {
    let mut buf = [0u8; 8];
    rc4::cipher(&mut buf);
    assert_eq!(buf, [0x6E, 0x26, 0x2C, 0xF3, 0xBE, 0x9F, 0x9D, 0x51]);
}

#[test]
fn test_cipher_is_self_inverse() {
    for len in [1usize, 16, 1000, 2048] {
        let original: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        let mut buf = original.clone();
        rc4::cipher(&mut buf);
        assert_ne!(buf, original, "cipher must change a {len}-byte buffer");
        rc4::cipher(&mut buf);
        assert_eq!(buf, original);
    }
}

// --- Vendor-code preparation ---

#[test]
fn test_padding_boundaries() {
    for (content_len, padded_len) in [(0, 0), (1, 2048), (2047, 2048), (2048, 2048), (2049, 4096), (4096, 4096)] {
        let code = VendorCode::prepare(&vec![0xAA; content_len], 0);
        assert_eq!(
            code.len(),
            padded_len + 2,
            "content of {content_len} bytes must pad to {padded_len} plus trailer"
        );
    }
}

#[test]
fn test_vendor_code_ciphers_before_checksumming() {
    let code = VendorCode::prepare(&[0xAA; 4], 1);
    let buf = code.as_bytes();

    assert_eq!(buf.len(), 2050);
    // Content region is ciphertext, not the original bytes
    assert_eq!(&buf[0..4], &[0xC4, 0x8C, 0x86, 0x59]);
    // Trailer is the CRC of the ciphered region, most significant byte first
    assert_eq!(&buf[2048..], &[0xF1, 0xF5]);
    assert_eq!(
        crc::crc16(CRC_SEED, &buf[..2048]),
        u16::from_be_bytes([buf[2048], buf[2049]])
    );
}

#[test]
fn test_vendor_code_unreadable_source_is_typed_error() {
    let err = VendorCode::load(std::path::Path::new("/nonexistent/loader.bin"), 0).unwrap_err();
    assert!(matches!(err, RkError::VendorCodeUnreadable { .. }));
    assert!(!err.is_setup_failure());
}

#[test]
fn test_vendor_code_chunking_reconstructs_buffer() {
    // Below, at, and above one chunk boundary
    for content_len in [100usize, 4094, 10000] {
        let content: Vec<u8> = (0..content_len).map(|i| (i % 256) as u8).collect();
        let code = VendorCode::prepare(&content, 7);

        let mut driver = ProtocolDriver::new(mock_session(MockTransport::default()));
        driver.push_vendor_code(&code).unwrap();

        let transport = driver.into_transport();
        let mut reassembled = Vec::new();
        for (slot, chunk) in &transport.control {
            assert_eq!(*slot, 7);
            assert!(chunk.len() <= VENDOR_CHUNK);
            reassembled.extend_from_slice(chunk);
        }
        assert_eq!(reassembled, code.as_bytes());
        // No bulk traffic on the control-transfer path
        assert!(transport.bulk_out.is_empty());
    }
}

// --- Device scan ---

#[test]
fn test_scan_stops_at_first_match() {
    let mut probed = Vec::new();
    let result = scan(CHIP_CATALOG, |d| {
        probed.push(d.product_id);
        (d.product_id == CHIP_CATALOG[2].product_id).then_some(())
    });

    let (descriptor, ()) = result.unwrap();
    assert_eq!(descriptor, &CHIP_CATALOG[2]);
    // Entries before the match are probed in order, nothing after it
    assert_eq!(
        probed,
        CHIP_CATALOG[..3].iter().map(|d| d.product_id).collect::<Vec<_>>()
    );
}

#[test]
fn test_scan_reports_no_match() {
    let catalog = [DeviceDescriptor { product_id: 0x1234, name: "NONE" }];
    assert!(scan(&catalog, |_| None::<()>).is_none());
}

// --- Session sequencing ---

#[test]
fn test_second_command_rejected_while_response_pending() {
    let mut transport = MockTransport::default();
    transport.queue_response();
    let mut session = mock_session(transport);

    let block = encode_command_with_tag(1, CMD_TEST_UNIT_READY, 0, 0);
    session.transmit_command(&block).unwrap();

    // Response not drained yet: the next command must be refused
    let err = session.transmit_command(&block).unwrap_err();
    assert!(matches!(err, RkError::ResponsePending));

    // Draining the status re-opens the session
    session.receive_response().unwrap();
    session.transmit_command(&block).unwrap();
}

#[test]
fn test_short_status_read_keeps_exchange_open() {
    // Empty read queue: the status phase comes back short
    let mut driver = ProtocolDriver::new(mock_session(MockTransport::default()));

    let err = driver.test_unit_ready().unwrap_err();
    assert!(matches!(
        err,
        RkError::ShortTransfer { phase: "status", expected: RESPONSE_SIZE, actual: 0 }
    ));

    // The undrained exchange blocks the next operation instead of
    // silently desynchronizing the device
    let err = driver.reset(0).unwrap_err();
    assert!(matches!(err, RkError::ResponsePending));
}

#[test]
fn test_oversized_payload_refused() {
    let mut transport = MockTransport::default();
    transport.queue_response();
    let mut session = mock_session(transport);

    session
        .transmit_command(&encode_command_with_tag(1, CMD_WRITE_LBA, 0, 33))
        .unwrap();
    let err = session.send_payload(&vec![0u8; BLOCK_SIZE + 1]).unwrap_err();
    assert!(matches!(err, RkError::Protocol(_)));
}

// --- Protocol driver ---

#[test]
fn test_read_sectors_splits_into_whole_blocks() {
    let mut transport = MockTransport::default();
    // 33 sectors: one full 32-sector block plus one single-sector block
    transport.bulk_in.push_back(vec![0xA1; BLOCK_SIZE]);
    transport.queue_response();
    transport.bulk_in.push_back(vec![0xB2; 512]);
    transport.queue_response();

    let mut driver = ProtocolDriver::new(mock_session(transport));
    let data = driver.read_sectors(100, 33).unwrap();

    assert_eq!(data.len(), 33 * 512);
    assert!(data[..BLOCK_SIZE].iter().all(|&b| b == 0xA1));
    assert!(data[BLOCK_SIZE..].iter().all(|&b| b == 0xB2));

    let transport = driver.into_transport();
    assert_eq!(transport.bulk_out.len(), 2);

    // First command: offset 100, 32 sectors
    let first = &transport.bulk_out[0];
    assert_eq!(&first[17..21], &100u32.to_be_bytes());
    assert_eq!(&first[22..24], &32u16.to_be_bytes());

    // Second command: offset advanced by one whole block
    let second = &transport.bulk_out[1];
    assert_eq!(&second[17..21], &132u32.to_be_bytes());
    assert_eq!(&second[22..24], &1u16.to_be_bytes());
}

#[test]
fn test_write_sectors_reconstructs_payload_across_blocks() {
    let data: Vec<u8> = (0..BLOCK_SIZE + 512).map(|i| (i % 256) as u8).collect();

    let mut transport = MockTransport::default();
    transport.queue_response();
    transport.queue_response();

    let mut driver = ProtocolDriver::new(mock_session(transport));
    driver.write_sectors(0, &data).unwrap();

    let transport = driver.into_transport();
    // command, payload, command, payload
    assert_eq!(transport.bulk_out.len(), 4);
    assert_eq!(transport.bulk_out[1].len(), BLOCK_SIZE);
    assert_eq!(transport.bulk_out[3].len(), 512);

    let mut reassembled = transport.bulk_out[1].clone();
    reassembled.extend_from_slice(&transport.bulk_out[3]);
    assert_eq!(reassembled, data);
}

#[test]
fn test_write_sectors_rejects_partial_sector() {
    let mut driver = ProtocolDriver::new(mock_session(MockTransport::default()));
    let err = driver.write_sectors(0, &[0u8; 100]).unwrap_err();
    assert!(matches!(err, RkError::Protocol(_)));
}

#[test]
fn test_no_payload_operation_still_drains_status() {
    let mut transport = MockTransport::default();
    transport.queue_response();

    let mut driver = ProtocolDriver::new(mock_session(transport));
    driver.reset(0).unwrap();

    let transport = driver.into_transport();
    assert_eq!(transport.bulk_out.len(), 1);
    // The queued status reply was consumed
    assert!(transport.bulk_in.is_empty());
}

// --- Error classes ---

#[test]
fn test_setup_failures_are_a_distinct_class() {
    assert!(RkError::DeviceNotFound { vendor_id: 0x2207 }.is_setup_failure());
    assert!(!RkError::ShortTransfer { phase: "command", expected: 31, actual: 0 }.is_setup_failure());
    assert!(!RkError::ResponsePending.is_setup_failure());
}
