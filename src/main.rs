//! rkflashtool - command-line driver for the Rockchip USB bootloader.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rkflashtool as app;

use app::rkusb::{DEFAULT_TIMEOUT, DeviceSession, ProtocolDriver, UsbTransport, VendorCode};

/// Talk to the USB bootloader of a Rockchip SoC.
#[derive(Parser)]
#[command(name = "rkflashtool")]
struct Cli {
    /// Per-transfer USB timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the bootloader answers
    Ping,
    /// Print the raw flash id
    FlashId,
    /// Print raw flash geometry info
    FlashInfo,
    /// Print raw chip identification
    ChipInfo,
    /// Read sectors from flash into a file
    Read {
        /// First sector
        offset: u32,
        /// Number of 512-byte sectors
        count: u16,
        /// Output file
        out: PathBuf,
    },
    /// Write a file to flash sectors (zero-padded to a whole sector)
    Write {
        /// First sector
        offset: u32,
        /// Input file
        file: PathBuf,
    },
    /// Erase a range of sectors
    Erase {
        /// First sector
        offset: u32,
        /// Number of 512-byte sectors
        count: u16,
    },
    /// Execute code already placed in SDRAM
    Exec {
        /// Kernel entry address
        krnl_addr: u32,
        /// Parameter block address
        #[arg(default_value_t = 0)]
        parm_addr: u32,
    },
    /// Reset the device
    Reset {
        #[arg(default_value_t = 0)]
        flag: u8,
    },
    /// Push an RC4-ciphered vendor code blob to a device RAM slot
    VendorCode {
        /// Source file
        file: PathBuf,
        /// Target RAM slot
        slot: u16,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rkflashtool: error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(cli.timeout);

    // Load file inputs before touching the device, so a bad path fails fast
    let prepared = match &cli.command {
        Command::VendorCode { file, slot } => Some(Prepared::Vendor(VendorCode::load(file, *slot)?)),
        Command::Write { file, .. } => {
            let mut data = fs::read(file)?;
            let padded = data.len().div_ceil(512) * 512;
            data.resize(padded, 0);
            Some(Prepared::Flash(data))
        }
        _ => None,
    };

    let session = DeviceSession::open(timeout)?;
    let mut driver = ProtocolDriver::new(session);

    dispatch(&mut driver, cli.command, prepared)
}

/// File content loaded ahead of device discovery.
enum Prepared {
    Vendor(VendorCode),
    Flash(Vec<u8>),
}

fn dispatch(
    driver: &mut ProtocolDriver<UsbTransport>,
    command: Command,
    prepared: Option<Prepared>,
) -> anyhow::Result<()> {
    match command {
        Command::Ping => {
            driver.test_unit_ready()?;
            println!("{} is ready", driver.session().descriptor().name);
        }
        Command::FlashId => {
            let id = driver.read_flash_id()?;
            println!("flash id: {:02x?}", id);
        }
        Command::FlashInfo => {
            let raw = driver.read_flash_info()?;
            println!("flash info: {:02x?}", raw);
        }
        Command::ChipInfo => {
            let raw = driver.read_chip_info()?;
            println!("chip info: {:02x?}", raw);
        }
        Command::Read { offset, count, out } => {
            let data = driver.read_sectors(offset, count)?;
            fs::write(&out, &data)?;
            println!("read {count} sectors at {offset} into {}", out.display());
        }
        Command::Write { offset, .. } => {
            let Some(Prepared::Flash(data)) = prepared else {
                unreachable!("write payload prepared in run()");
            };
            driver.write_sectors(offset, &data)?;
            println!("wrote {} sectors at {offset}", data.len() / 512);
        }
        Command::Erase { offset, count } => {
            driver.erase_sectors(offset, count)?;
            println!("erased {count} sectors at {offset}");
        }
        Command::Exec { krnl_addr, parm_addr } => {
            driver.execute(krnl_addr, parm_addr)?;
        }
        Command::Reset { flag } => {
            driver.reset(flag)?;
        }
        Command::VendorCode { slot, .. } => {
            let Some(Prepared::Vendor(code)) = prepared else {
                unreachable!("vendor code prepared in run()");
            };
            let len = code.len();
            driver.push_vendor_code(&code)?;
            println!("pushed {len} bytes to slot {slot}");
        }
    }
    Ok(())
}
