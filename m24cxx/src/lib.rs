//! Driver for ST M24Cxx I2C EEPROMs
//!
//! Works on top of any [`embedded_hal::i2c::I2c`] bus and provides:
//!
//! - [`M24`]: random access reads and writes, with full aligned pages sent as
//!   page writes and everything else byte by byte
//! - Write cycle polling: after each write the device is probed until it
//!   acknowledges again, bounded by the configured write cycle time
//! - [`M24::buffered_write`]: coalesces consecutive single byte writes into
//!   page writes
//! - [`Cursor`]: `embedded_io` `Read`/`Write`/`Seek` with separate read and
//!   write positions
//! - `embedded_storage` `ReadStorage`/`Storage` for use with storage crates
//!
//! Geometry is fixed at compile time, see the [`M24C32`] to [`M24C512`]
//! aliases.
//!
//! ## Feature Flags
//!
//! - `std` - [`StdClock`] and `std` interop for `embedded-io`
//! - `log` - Enable `log` crate integration (default)
//! - `defmt` - Enable `defmt` logging for embedded
//!
//! ## Example
//!
//! ```ignore
//! use m24cxx::{Config, M24C64, StdClock};
//!
//! let mut eeprom = M24C64::new(i2c, StdClock::new(), 0x50, Config::default())?;
//!
//! // Byte-at-a-time producers still get page writes
//! for (i, byte) in record.iter().enumerate() {
//!     eeprom.buffered_write(0x0200 + i as u16, &[*byte])?;
//! }
//! eeprom.flush()?;
//!
//! let mut buf = [0u8; 64];
//! let n = eeprom.read(0x0200, &mut buf)?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

// MUST be the first module listed
mod fmt;

mod bounds;
mod buffer;
mod clock;
mod config;
mod cursor;
mod device;
mod engine;
mod error;
mod gate;
mod storage;

#[cfg(test)]
mod testing;

#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Clock;
pub use config::{Config, DEFAULT_MAX_TRANSFER, DEFAULT_WRITE_CYCLE};
pub use cursor::Cursor;
pub use device::{M24, M24C32, M24C64, M24C128, M24C256, M24C512};
pub use error::Error;
