//! M24Cxx image tool
//!
//! Runs the m24cxx driver against a simulated device whose memory array lives
//! in an image file, so EEPROM contents can be prepared and inspected on a
//! host.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use embedded_io::{Read, Seek, SeekFrom};
use log::info;
use m24cxx::{Config, DEFAULT_MAX_TRANSFER, M24, StdClock};

use crate::sim::SimulatedEeprom;

/// Driver session over a simulated device
type Session<const CAPACITY: usize, const PAGE_SIZE: usize> =
    M24<SimulatedEeprom<StdClock>, StdClock, CAPACITY, PAGE_SIZE>;

/// Supported parts
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Device {
    /// 4 KiB, 32 byte pages
    #[value(name = "m24c32")]
    M24C32,
    /// 8 KiB, 32 byte pages
    #[default]
    #[value(name = "m24c64")]
    M24C64,
    /// 16 KiB, 64 byte pages
    #[value(name = "m24c128")]
    M24C128,
    /// 32 KiB, 64 byte pages
    #[value(name = "m24c256")]
    M24C256,
    /// 64 KiB, 128 byte pages
    #[value(name = "m24c512")]
    M24C512,
}

impl Device {
    /// Size of the memory array in bytes
    pub fn capacity(self) -> usize {
        match self {
            Device::M24C32 => m24cxx::M24C32::<SimulatedEeprom, StdClock>::CAPACITY,
            Device::M24C64 => m24cxx::M24C64::<SimulatedEeprom, StdClock>::CAPACITY,
            Device::M24C128 => m24cxx::M24C128::<SimulatedEeprom, StdClock>::CAPACITY,
            Device::M24C256 => m24cxx::M24C256::<SimulatedEeprom, StdClock>::CAPACITY,
            Device::M24C512 => m24cxx::M24C512::<SimulatedEeprom, StdClock>::CAPACITY,
        }
    }

    /// Size of a write page in bytes
    pub fn page_size(self) -> usize {
        match self {
            Device::M24C32 => m24cxx::M24C32::<SimulatedEeprom, StdClock>::PAGE_SIZE,
            Device::M24C64 => m24cxx::M24C64::<SimulatedEeprom, StdClock>::PAGE_SIZE,
            Device::M24C128 => m24cxx::M24C128::<SimulatedEeprom, StdClock>::PAGE_SIZE,
            Device::M24C256 => m24cxx::M24C256::<SimulatedEeprom, StdClock>::PAGE_SIZE,
            Device::M24C512 => m24cxx::M24C512::<SimulatedEeprom, StdClock>::PAGE_SIZE,
        }
    }
}

/// M24Cxx EEPROM image tool
#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit M24Cxx EEPROM images through a simulated bus")]
pub struct Cli {
    /// Part to simulate
    #[arg(short, long, global = true, default_value = "m24c64")]
    pub device: Device,

    /// 7-bit bus address, set by the chip enable pins
    #[arg(short = 'a', long, global = true, default_value = "0x50", value_parser = parse_bus_address)]
    pub bus_address: u8,

    /// Largest transfer the bus can carry, including the two address bytes
    ///
    /// Below page size + 2 the driver falls back to byte writes.
    #[arg(short = 't', long, global = true, default_value_t = DEFAULT_MAX_TRANSFER)]
    pub max_transfer: usize,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show device and image information
    Info {
        /// Path to EEPROM image
        image: PathBuf,
    },

    /// Create an erased image
    Create {
        /// Path to EEPROM image
        image: PathBuf,

        /// Overwrite an existing image
        #[arg(short, long)]
        force: bool,
    },

    /// Hex dump a range of the image
    Dump {
        /// Path to EEPROM image
        image: PathBuf,

        /// Start address
        #[arg(short, long, default_value = "0", value_parser = parse_number)]
        offset: usize,

        /// Number of bytes (default: to the end)
        #[arg(short, long, value_parser = parse_number)]
        length: Option<usize>,
    },

    /// Read bytes to a file or stdout as hex
    Read {
        /// Path to EEPROM image
        image: PathBuf,

        /// Start address
        #[arg(value_parser = parse_number)]
        address: usize,

        /// Number of bytes
        #[arg(value_parser = parse_number)]
        length: usize,

        /// Write the raw bytes to this file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write bytes at an address
    Write {
        /// Path to EEPROM image
        image: PathBuf,

        /// Start address
        #[arg(value_parser = parse_number)]
        address: usize,

        /// Data as hex ("de ad be ef"), or text with --text
        data: Option<String>,

        /// Treat the data argument as UTF-8 text
        #[arg(long)]
        text: bool,

        /// Take the data from a file
        #[arg(short, long, conflicts_with = "data")]
        input: Option<PathBuf>,

        /// Send the data byte by byte through the page write buffer
        #[arg(short, long)]
        buffered: bool,
    },

    /// Fill a range with one value
    Fill {
        /// Path to EEPROM image
        image: PathBuf,

        /// Value to fill with
        #[arg(value_parser = parse_byte)]
        value: u8,

        /// Start address
        #[arg(short, long, default_value = "0", value_parser = parse_number)]
        offset: usize,

        /// Number of bytes (default: to the end)
        #[arg(short, long, value_parser = parse_number)]
        length: Option<usize>,
    },
}

impl Command {
    fn image(&self) -> &Path {
        match self {
            Command::Info { image }
            | Command::Create { image, .. }
            | Command::Dump { image, .. }
            | Command::Read { image, .. }
            | Command::Write { image, .. }
            | Command::Fill { image, .. } => image,
        }
    }
}

/// Parse a decimal or `0x` prefixed hexadecimal number
pub fn parse_number(s: &str) -> Result<usize> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    value.with_context(|| format!("Invalid number: {}", s))
}

fn parse_byte(s: &str) -> Result<u8> {
    let value = parse_number(s)?;
    u8::try_from(value).with_context(|| format!("Value out of byte range: {}", s))
}

fn parse_bus_address(s: &str) -> Result<u8> {
    let value = parse_number(s)?;
    u8::try_from(value).with_context(|| format!("Bus address out of range: {}", s))
}

/// Parse hex bytes, with or without separators ("deadbeef", "de ad be ef", "de:ad")
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .unwrap_or(&digits)
        .to_string();

    anyhow::ensure!(
        digits.chars().all(|c| c.is_ascii_hexdigit()),
        "Invalid hex data: {}",
        s
    );
    anyhow::ensure!(
        digits.len() % 2 == 0,
        "Hex data must have an even number of digits"
    );

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("Invalid hex byte: {}", &digits[i..i + 2]))
        })
        .collect()
}

/// Format bytes as a hex dump with an ASCII column, 16 bytes per line
pub fn hex_dump(base: usize, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:04x}: ", base + i * 16);
        for b in line {
            let _ = write!(out, "{:02x} ", b);
        }
        for _ in line.len()..16 {
            out.push_str("   ");
        }
        out.push('|');
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

/// Resolve `[offset, offset + length)` against the device, defaulting to the end
fn range(offset: usize, length: Option<usize>, capacity: usize) -> Result<(u16, usize)> {
    anyhow::ensure!(
        offset < capacity,
        "Offset {:#06x} is outside the {} byte device",
        offset,
        capacity
    );
    let length = length.unwrap_or(capacity - offset);
    // Offsets below a 64 KiB capacity always fit
    Ok((offset as u16, length))
}

pub fn run(cli: Cli) -> Result<()> {
    if let Command::Create { image, force } = &cli.command {
        return cmd_create(image, *force, cli.device);
    }

    match cli.device {
        Device::M24C32 => run_session::<4096, 32>(&cli),
        Device::M24C64 => run_session::<8192, 32>(&cli),
        Device::M24C128 => run_session::<16384, 64>(&cli),
        Device::M24C256 => run_session::<32768, 64>(&cli),
        Device::M24C512 => run_session::<65536, 128>(&cli),
    }
}

fn run_session<const CAPACITY: usize, const PAGE_SIZE: usize>(cli: &Cli) -> Result<()> {
    let image = cli.command.image();
    let clock = StdClock::new();

    let sim = SimulatedEeprom::open(image, PAGE_SIZE, clock)?.with_address(cli.bus_address);
    anyhow::ensure!(
        sim.memory().len() == CAPACITY,
        "Image {} holds {} bytes, {:?} needs {}",
        image.display(),
        sim.memory().len(),
        cli.device,
        CAPACITY
    );

    let config = Config::default().with_max_transfer(cli.max_transfer);
    let mut eeprom: Session<CAPACITY, PAGE_SIZE> =
        M24::new(sim, clock, cli.bus_address, config).context("Failed to set up device")?;

    let modified = match &cli.command {
        Command::Info { image } => cmd_info(&mut eeprom, image, cli.device).map(|_| false)?,
        Command::Create { .. } => false,
        Command::Dump {
            offset, length, ..
        } => cmd_dump(&mut eeprom, *offset, *length).map(|_| false)?,
        Command::Read {
            address,
            length,
            output,
            ..
        } => cmd_read(&mut eeprom, *address, *length, output.as_deref()).map(|_| false)?,
        Command::Write {
            address,
            data,
            text,
            input,
            buffered,
            ..
        } => {
            let bytes = match (data, input) {
                (_, Some(path)) => fs::read(path)
                    .with_context(|| format!("Failed to read input: {}", path.display()))?,
                (Some(data), None) if *text => data.as_bytes().to_vec(),
                (Some(data), None) => parse_hex_bytes(data)?,
                (None, None) => anyhow::bail!("Nothing to write: give DATA or --input"),
            };
            cmd_write(&mut eeprom, *address, &bytes, *buffered).map(|_| true)?
        }
        Command::Fill {
            value,
            offset,
            length,
            ..
        } => cmd_fill(&mut eeprom, *value, *offset, *length).map(|_| true)?,
    };

    if modified {
        let (sim, _) = eeprom.release();
        sim.save(image)?;
        info!("saved {}", image.display());
    }

    Ok(())
}

fn cmd_create(image: &Path, force: bool, device: Device) -> Result<()> {
    anyhow::ensure!(
        force || !image.exists(),
        "Image already exists: {} (use --force to overwrite)",
        image.display()
    );

    let sim = SimulatedEeprom::blank(device.capacity(), device.page_size(), StdClock::new())?;
    sim.save(image)?;

    println!(
        "Created {} byte {:?} image: {}",
        device.capacity(),
        device,
        image.display()
    );
    Ok(())
}

fn cmd_info<const CAPACITY: usize, const PAGE_SIZE: usize>(
    eeprom: &mut Session<CAPACITY, PAGE_SIZE>,
    image: &Path,
    device: Device,
) -> Result<()> {
    let detected = eeprom.detect();

    let mut contents = vec![0u8; CAPACITY];
    let n = eeprom.read(0, &mut contents)?;
    let erased = contents[..n].iter().filter(|&&b| b == 0xFF).count();

    println!("M24Cxx Image Information");
    println!("========================");
    println!("Image file:      {}", image.display());
    println!("Device:          {:?}", device);
    println!("Bus address:     {:#04x}", eeprom.address());
    println!("Detected:        {}", if detected { "yes" } else { "no" });
    println!("Capacity:        {} bytes", CAPACITY);
    println!("Page size:       {} bytes ({} pages)", PAGE_SIZE, CAPACITY / PAGE_SIZE);
    println!(
        "Page writes:     {}",
        if eeprom.supports_page_write() { "yes" } else { "no (byte writes)" }
    );
    println!(
        "Erased bytes:    {} ({:.1}%)",
        erased,
        erased as f64 * 100.0 / CAPACITY as f64
    );

    Ok(())
}

fn cmd_dump<const CAPACITY: usize, const PAGE_SIZE: usize>(
    eeprom: &mut Session<CAPACITY, PAGE_SIZE>,
    offset: usize,
    length: Option<usize>,
) -> Result<()> {
    let (start, length) = range(offset, length, CAPACITY)?;

    let mut cursor = eeprom.cursor();
    cursor.seek(SeekFrom::Start(u64::from(start)))?;

    let mut remaining = length;
    let mut buf = [0u8; 256];
    let mut address = usize::from(start);
    while remaining > 0 {
        let want = remaining.min(buf.len());
        let n = cursor.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        print!("{}", hex_dump(address, &buf[..n]));
        address += n;
        remaining -= n;
    }

    Ok(())
}

fn cmd_read<const CAPACITY: usize, const PAGE_SIZE: usize>(
    eeprom: &mut Session<CAPACITY, PAGE_SIZE>,
    address: usize,
    length: usize,
    output: Option<&Path>,
) -> Result<()> {
    let (start, length) = range(address, Some(length), CAPACITY)?;

    let mut buf = vec![0u8; length];
    let n = eeprom.read(start, &mut buf)?;
    buf.truncate(n);
    if n < length {
        log::warn!("read {} of {} bytes", n, length);
    }

    match output {
        Some(path) => {
            fs::write(path, &buf)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            println!("Read {} bytes to {}", n, path.display());
        }
        None => {
            let hex: Vec<String> = buf.iter().map(|b| format!("{:02x}", b)).collect();
            println!("{}", hex.join(" "));
        }
    }

    Ok(())
}

fn cmd_write<const CAPACITY: usize, const PAGE_SIZE: usize>(
    eeprom: &mut Session<CAPACITY, PAGE_SIZE>,
    address: usize,
    data: &[u8],
    buffered: bool,
) -> Result<()> {
    let (start, _) = range(address, None, CAPACITY)?;

    let written = if buffered {
        let mut written = 0;
        for (i, &byte) in data.iter().enumerate() {
            let at = usize::from(start) + i;
            if at >= CAPACITY {
                break;
            }
            written += eeprom.buffered_write(at as u16, &[byte])?;
        }
        eeprom.flush()?;
        written
    } else {
        eeprom.write(start, data)?
    };

    if written < data.len() {
        log::warn!(
            "only {} of {} bytes fit before the end of the device",
            written,
            data.len()
        );
    }
    println!("Wrote {} bytes at {:#06x}", written, start);

    Ok(())
}

fn cmd_fill<const CAPACITY: usize, const PAGE_SIZE: usize>(
    eeprom: &mut Session<CAPACITY, PAGE_SIZE>,
    value: u8,
    offset: usize,
    length: Option<usize>,
) -> Result<()> {
    let (start, length) = range(offset, length, CAPACITY)?;

    let data = vec![value; length];
    let written = eeprom.write(start, &data)?;

    println!(
        "Filled {} bytes at {:#06x} with {:#04x}",
        written, start, value
    );
    Ok(())
}
