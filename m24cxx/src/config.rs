use core::time::Duration;

/// Maximum write cycle time (tW) of the M24Cxx family.
pub const DEFAULT_WRITE_CYCLE: Duration = Duration::from_millis(5);

/// Transfer limit assumed when none is configured.
///
/// Most DMA-driven I2C peripherals cap a single transfer at 255 bytes.
pub const DEFAULT_MAX_TRANSFER: usize = 255;

/// Driver configuration, fixed for the lifetime of a session.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use m24cxx::Config;
///
/// // An Arduino-style bus with a 32 byte buffer cannot carry a 32 byte page
/// // plus the two address bytes, so writes fall back to single bytes.
/// let config = Config::new()
///     .with_max_transfer(32)
///     .with_write_cycle(Duration::from_millis(10));
/// assert_eq!(config.max_transfer, 32);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Settling time after a write burst before the device is expected to
    /// acknowledge again
    pub write_cycle: Duration,

    /// Largest number of bytes the bus moves in one transaction, including
    /// the two address bytes
    pub max_transfer: usize,
}

impl Config {
    /// Create a configuration with the datasheet defaults
    pub const fn new() -> Self {
        Self {
            write_cycle: DEFAULT_WRITE_CYCLE,
            max_transfer: DEFAULT_MAX_TRANSFER,
        }
    }

    /// Set the write cycle time
    pub const fn with_write_cycle(mut self, write_cycle: Duration) -> Self {
        self.write_cycle = write_cycle;
        self
    }

    /// Set the transport's transfer limit
    pub const fn with_max_transfer(mut self, max_transfer: usize) -> Self {
        self.max_transfer = max_transfer;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
