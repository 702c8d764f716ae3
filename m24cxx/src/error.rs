use core::fmt;

/// Error type for EEPROM operations.
///
/// `E` is the error type of the underlying I2C bus.
///
/// Partial transfers are not errors: operations report the number of bytes
/// actually moved, which may be smaller than requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error<E> {
    /// The bus transaction failed (no acknowledge, arbitration loss, ...)
    I2c(E),
    /// The address lies at or beyond the end of the memory array
    AddressOutOfRange {
        /// The rejected address
        address: u32,
    },
    /// The bus address does not select an M24Cxx device (`0x50..=0x57`)
    InvalidBusAddress(u8),
    /// Seek target outside the memory array
    InvalidSeek,
    /// A transfer that must complete in full stopped early
    Truncated {
        /// Bytes requested
        requested: usize,
        /// Bytes moved before the transfer stopped
        transferred: usize,
    },
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {:?}", e),
            Self::AddressOutOfRange { address } => {
                write!(f, "address {:#06x} is outside the memory array", address)
            }
            Self::InvalidBusAddress(address) => {
                write!(f, "bus address {:#04x} is not in 0x50..=0x57", address)
            }
            Self::InvalidSeek => write!(f, "invalid seek operation"),
            Self::Truncated {
                requested,
                transferred,
            } => write!(
                f,
                "transfer stopped after {} of {} bytes",
                transferred, requested
            ),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}

impl<E: fmt::Debug> embedded_io::Error for Error<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::I2c(_) | Self::Truncated { .. } => embedded_io::ErrorKind::Other,
            Self::AddressOutOfRange { .. } | Self::InvalidBusAddress(_) | Self::InvalidSeek => {
                embedded_io::ErrorKind::InvalidInput
            }
        }
    }
}
