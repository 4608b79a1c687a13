//! Rockchip bootloader protocol constants and the device catalog.

// Command codes (big-endian u32 at offset 12 of the command block)
pub(crate) const CMD_TEST_UNIT_READY: u32 = 0x8000_0600;
pub(crate) const CMD_READ_FLASH_ID: u32 = 0x8000_0601;
pub(crate) const CMD_READ_FLASH_INFO: u32 = 0x8000_061a;
pub(crate) const CMD_READ_CHIP_INFO: u32 = 0x8000_061b;
pub(crate) const CMD_RESET_DEVICE: u32 = 0x0000_06ff;
pub(crate) const CMD_READ_LBA: u32 = 0x8000_0a14;
pub(crate) const CMD_WRITE_LBA: u32 = 0x0000_0a15;
pub(crate) const CMD_ERASE_SECTORS: u32 = 0x0000_0a06;
pub(crate) const CMD_EXECUTE_SDRAM: u32 = 0x0000_0a19;

// Wire format
pub(crate) const COMMAND_MAGIC: [u8; 4] = *b"USBC";
pub(crate) const COMMAND_SIZE: usize = 31;
pub(crate) const RESPONSE_SIZE: usize = 13;

// Transport endpoints shared by all command/response/payload exchanges
pub(crate) const EP_BULK_OUT: u8 = 0x02;
pub(crate) const EP_BULK_IN: u8 = 0x81;

// Bulk payload ceiling per transfer; must be a multiple of the sector size
pub(crate) const BLOCK_SIZE: usize = 0x4000;
pub(crate) const SECTOR_SIZE: usize = 512;
pub(crate) const SECTORS_PER_BLOCK: u16 = (BLOCK_SIZE / SECTOR_SIZE) as u16;

// Vendor-code delivery
pub(crate) const VENDOR_PAGE: usize = 2048;
pub(crate) const VENDOR_CHUNK: usize = 4096;
pub(crate) const VENDOR_REQUEST: u8 = 12;
pub(crate) const CRC_SEED: u16 = 0xFFFF;

/// Rockchip USB vendor id shared by every bootloader generation.
pub const VENDOR_ID: u16 = 0x2207;

/// One entry of the device catalog: product id plus SoC family name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub product_id: u16,
    pub name: &'static str,
}

/// Known bootloader product ids, probed in this order; first match wins.
pub const CHIP_CATALOG: &[DeviceDescriptor] = &[
    DeviceDescriptor { product_id: 0x281a, name: "RK2818" },
    DeviceDescriptor { product_id: 0x290a, name: "RK2918" },
    DeviceDescriptor { product_id: 0x292a, name: "RK2928" },
    DeviceDescriptor { product_id: 0x292c, name: "RK3026" },
    DeviceDescriptor { product_id: 0x300a, name: "RK3066" },
    DeviceDescriptor { product_id: 0x300b, name: "RK3168" },
    DeviceDescriptor { product_id: 0x301a, name: "RK3036" },
    DeviceDescriptor { product_id: 0x310a, name: "RK3066B" },
    DeviceDescriptor { product_id: 0x310b, name: "RK3188" },
    // 0x310c answers for both RK3126 and RK3128
    DeviceDescriptor { product_id: 0x310c, name: "RK312X" },
    DeviceDescriptor { product_id: 0x310d, name: "RK3126" },
    DeviceDescriptor { product_id: 0x320a, name: "RK3288" },
    // 0x320b answers for both RK3228 and RK3229
    DeviceDescriptor { product_id: 0x320b, name: "RK322X" },
    DeviceDescriptor { product_id: 0x320c, name: "RK3328" },
    DeviceDescriptor { product_id: 0x330a, name: "RK3368" },
    DeviceDescriptor { product_id: 0x330c, name: "RK3399" },
];
