//! m24cxx-cli library
//!
//! Host side tooling for the m24cxx driver: a simulated device and the
//! `m24cxx` image tool built on it.

pub mod cli;
pub mod sim;

pub use sim::SimulatedEeprom;
