//! Driver integration tests against the simulated device
//!
//! These go through the public API only: the driver talks to
//! `SimulatedEeprom` the same way it would talk to a real bus.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_io::{Read, Seek, SeekFrom, Write};
use embedded_storage::{ReadStorage, Storage};
use m24cxx::{Config, Error, M24C64};
use m24cxx_cli::SimulatedEeprom;
use m24cxx_cli::cli::{self, Cli};

/// Clock over shared time, advancing 100us on every reading
fn ticking(time: &Rc<Cell<Duration>>) -> impl Fn() -> Duration + use<> {
    let time = time.clone();
    move || {
        let now = time.get();
        time.set(now + Duration::from_micros(100));
        now
    }
}

type Clk = Box<dyn Fn() -> Duration>;

fn setup_with(config: Config, write_time: Duration) -> M24C64<SimulatedEeprom<Clk>, Clk> {
    let _ = env_logger::builder().is_test(true).try_init();
    let time = Rc::new(Cell::new(Duration::ZERO));

    let sim_clock: Clk = Box::new(ticking(&time));
    let sim = SimulatedEeprom::blank(8192, 32, sim_clock)
        .unwrap()
        .with_write_time(write_time);

    let driver_clock: Clk = Box::new(ticking(&time));
    M24C64::new(sim, driver_clock, 0x50, config).unwrap()
}

fn setup() -> M24C64<SimulatedEeprom<Clk>, Clk> {
    setup_with(Config::default(), Duration::from_millis(2))
}

#[test]
fn test_round_trip_across_pages() {
    let mut eeprom = setup();
    let data: Vec<u8> = (0..=255).collect();

    assert_eq!(eeprom.write(0x0F10, &data).unwrap(), 256);

    let mut back = vec![0u8; 256];
    assert_eq!(eeprom.read(0x0F10, &mut back).unwrap(), 256);
    assert_eq!(back, data);

    let (sim, _) = eeprom.release();
    assert_eq!(&sim.memory()[0x0F10..0x1010], &data[..]);
    assert_eq!(sim.memory()[0x0F0F], 0xFF);
    assert_eq!(sim.memory()[0x1010], 0xFF);
}

#[test]
fn test_aligned_data_is_written_in_pages() {
    let mut eeprom = setup();

    eeprom.write(0x0100, &[0xAB; 128]).unwrap();

    let (sim, _) = eeprom.release();
    assert_eq!(sim.write_cycles(), 4);
}

#[test]
fn test_buffered_bytes_take_one_write_cycle() {
    let mut eeprom = setup();

    for i in 0..32u16 {
        eeprom.buffered_write(0x0400 + i, &[i as u8]).unwrap();
    }

    let (sim, _) = eeprom.release();
    assert_eq!(sim.write_cycles(), 1);
    let expected: Vec<u8> = (0..32).collect();
    assert_eq!(&sim.memory()[0x0400..0x0420], &expected[..]);
}

#[test]
fn test_small_transport_writes_bytes() {
    // An Arduino-style 32 byte bus buffer cannot carry page and address
    let mut eeprom = setup_with(Config::default().with_max_transfer(32), Duration::from_millis(2));
    assert!(!eeprom.supports_page_write());

    assert_eq!(eeprom.buffered_write(0, &[0x11; 32]).unwrap(), 32);
    assert_eq!(eeprom.pending(), 0);

    let (sim, _) = eeprom.release();
    assert_eq!(sim.write_cycles(), 32);
    assert!(sim.memory()[..32].iter().all(|&b| b == 0x11));
}

#[test]
fn test_access_stops_at_end_of_array() {
    let mut eeprom = setup();

    assert_eq!(eeprom.write(8191, &[0x5A; 10]).unwrap(), 1);
    let mut buf = [0u8; 10];
    assert_eq!(eeprom.read(8191, &mut buf).unwrap(), 1);
    assert_eq!(buf[0], 0x5A);

    assert_eq!(
        eeprom.read(8192, &mut buf),
        Err(Error::AddressOutOfRange { address: 8192 })
    );
}

#[test]
fn test_device_busy_during_write_cycle() {
    let mut eeprom = setup();

    eeprom.write(0, &[1]).unwrap();
    assert!(eeprom.is_write_pending());
    assert!(!eeprom.detect());

    // The next access waits for the device instead of failing
    eeprom.write(1, &[2]).unwrap();
    let mut buf = [0u8; 2];
    eeprom.read(0, &mut buf).unwrap();
    assert_eq!(buf, [1, 2]);
}

#[test]
fn test_wait_is_bounded_by_write_cycle() {
    // A part slower than the configured write cycle is still busy when the
    // wait runs out
    let mut eeprom = setup_with(Config::default(), Duration::from_millis(10));

    eeprom.write(0, &[1]).unwrap();

    assert_eq!(
        eeprom.write(1, &[2]),
        Err(Error::I2c(ErrorKind::NoAcknowledge(
            NoAcknowledgeSource::Address
        )))
    );
}

#[test]
fn test_wrong_chip_enable_address() {
    let time = Rc::new(Cell::new(Duration::ZERO));
    let sim = SimulatedEeprom::blank(8192, 32, ticking(&time)).unwrap();
    let mut eeprom = M24C64::new(sim, ticking(&time), 0x51, Config::default()).unwrap();

    assert!(!eeprom.detect());
    assert!(matches!(
        eeprom.read(0, &mut [0u8; 4]),
        Err(Error::I2c(ErrorKind::NoAcknowledge(_)))
    ));
}

#[test]
fn test_cursor_log() {
    let mut eeprom = setup();
    let mut cursor = eeprom.cursor();

    cursor.seek_write(0x0200).unwrap();
    cursor.seek_read(0x0200).unwrap();
    cursor.write_all(b"boot\n").unwrap();
    cursor.write_all(b"ready\n").unwrap();
    assert_eq!(cursor.write_position(), 0x0200 + 11);

    let mut line = [0u8; 11];
    cursor.read_exact(&mut line).unwrap();
    assert_eq!(&line, b"boot\nready\n");
    assert_eq!(cursor.available(), 8192 - 0x0200 - 11);

    assert_eq!(cursor.seek(SeekFrom::End(-1)).unwrap(), 8191);
    assert_eq!(cursor.read_byte().unwrap(), Some(0xFF));
    assert_eq!(cursor.read_byte().unwrap(), None);
}

#[test]
fn test_storage_traits() {
    let mut eeprom = setup();
    assert_eq!(eeprom.capacity(), 8192);

    Storage::write(&mut eeprom, 4096, &[0x3C; 100]).unwrap();
    let mut buf = [0u8; 100];
    ReadStorage::read(&mut eeprom, 4096, &mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0x3C));

    assert!(Storage::write(&mut eeprom, 8100, &[0; 100]).is_err());
}

fn temp_image(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("m24cxx-{}-{}.bin", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    let argv = std::iter::once("m24cxx").chain(args.iter().copied());
    cli::run(Cli::parse_from(argv))
}

#[test]
fn test_cli_image_workflow() {
    let image = temp_image("workflow");
    let path = image.to_str().unwrap();

    run(&["-d", "m24c32", "create", path]).unwrap();
    let bytes = std::fs::read(&image).unwrap();
    assert_eq!(bytes.len(), 4096);
    assert!(bytes.iter().all(|&b| b == 0xFF));

    // Creating over an existing image needs --force
    assert!(run(&["-d", "m24c32", "create", path]).is_err());

    run(&["-d", "m24c32", "write", path, "0x10", "de ad be ef"]).unwrap();
    run(&["-d", "m24c32", "write", path, "0x40", "--text", "--buffered", "hello"]).unwrap();
    run(&["-d", "m24c32", "fill", path, "0x00", "--offset", "0x100", "--length", "64"]).unwrap();

    let bytes = std::fs::read(&image).unwrap();
    assert_eq!(&bytes[0x10..0x14], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(&bytes[0x40..0x45], b"hello");
    assert!(bytes[0x100..0x140].iter().all(|&b| b == 0));
    assert_eq!(bytes[0x140], 0xFF);

    let out = temp_image("workflow-out");
    run(&["-d", "m24c32", "read", path, "0x40", "5", "-o", out.to_str().unwrap()]).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"hello");

    run(&["-d", "m24c32", "info", path]).unwrap();
    run(&["-d", "m24c32", "dump", path, "--length", "32"]).unwrap();

    let _ = std::fs::remove_file(&image);
    let _ = std::fs::remove_file(&out);
}

#[test]
fn test_cli_rejects_mismatched_image() {
    let image = temp_image("mismatch");
    let path = image.to_str().unwrap();

    run(&["-d", "m24c32", "create", path]).unwrap();
    assert!(run(&["-d", "m24c64", "info", path]).is_err());
    assert!(run(&["-d", "m24c32", "-a", "0x60", "info", path]).is_err());

    let _ = std::fs::remove_file(&image);
}
