//! Address validation.

use crate::Error;

/// Validate `address` and cap `len` so the access ends at `capacity` at the latest.
///
/// The memory array never wraps: a request running past the end is shortened,
/// never continued from address zero.
pub(crate) fn capped_len<E>(address: u16, len: usize, capacity: usize) -> Result<usize, Error<E>> {
    let address = usize::from(address);
    if address >= capacity {
        return Err(Error::AddressOutOfRange {
            address: address as u32,
        });
    }
    Ok(len.min(capacity - address))
}

/// Device address of the byte `offset` bytes past `address`.
///
/// Callers only pass offsets inside a capped range, which keeps the result
/// below the capacity and so within 16 bits.
#[inline]
pub(crate) fn offset(address: u16, offset: usize) -> u16 {
    (usize::from(address) + offset) as u16
}
