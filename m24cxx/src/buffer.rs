//! Page-sized write coalescing buffer
//!
//! Holds bytes destined for one page until they can be committed with a
//! single page write. Accumulation only ever starts at a page boundary, so a
//! full buffer always maps onto exactly one page of the device.

/// Pending bytes for `[start, start + len)`, not yet written to the device
#[derive(Debug)]
pub(crate) struct PageCache<const PAGE_SIZE: usize> {
    data: [u8; PAGE_SIZE],
    start: u16,
    len: usize,
}

impl<const PAGE_SIZE: usize> PageCache<PAGE_SIZE> {
    pub(crate) const fn new() -> Self {
        Self {
            data: [0; PAGE_SIZE],
            start: 0,
            len: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Device address directly after the buffered bytes
    pub(crate) fn end(&self) -> usize {
        usize::from(self.start) + self.len
    }

    /// Start accumulating at `address`, which must be page aligned
    pub(crate) fn begin(&mut self, address: u16, byte: u8) {
        debug_assert!(self.is_empty());
        debug_assert_eq!(usize::from(address) % PAGE_SIZE, 0);
        self.start = address;
        self.data[0] = byte;
        self.len = 1;
    }

    /// Append a byte, returning true once the page is full
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        debug_assert!(!self.is_empty() && self.len < PAGE_SIZE);
        self.data[self.len] = byte;
        self.len += 1;
        self.len == PAGE_SIZE
    }

    /// Empty the buffer, returning the start address and the bytes it held.
    ///
    /// The returned slice stays valid until the next `begin`.
    pub(crate) fn take(&mut self) -> Option<(u16, &[u8])> {
        if self.is_empty() {
            return None;
        }
        let len = core::mem::take(&mut self.len);
        Some((self.start, &self.data[..len]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let mut cache = PageCache::<32>::new();
        assert!(cache.is_empty());
        assert_eq!(cache.end(), 0);
        assert!(cache.take().is_none());
    }

    #[test]
    fn test_fills_to_one_page() {
        let mut cache = PageCache::<4>::new();
        cache.begin(8, 1);
        assert!(!cache.push(2));
        assert!(!cache.push(3));
        assert!(cache.push(4));
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.end(), 12);
    }

    #[test]
    fn test_take_empties() {
        let mut cache = PageCache::<4>::new();
        cache.begin(4, 0xAA);
        cache.push(0xBB);

        assert_eq!(cache.take(), Some((4, &[0xAA, 0xBB][..])));
        assert!(cache.is_empty());
        assert!(cache.take().is_none());
    }
}
