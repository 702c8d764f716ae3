//! Test doubles: a manually driven clock and a recording M24Cxx bus model.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::Clock;

/// Clock that only moves when told to.
///
/// Every `now()` reading advances the clock by `tick`, so busy loops make
/// progress without real time passing. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub(crate) struct ManualClock {
    now: Rc<Cell<Duration>>,
    tick: Duration,
}

impl ManualClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_tick(tick: Duration) -> Self {
        Self {
            now: Rc::default(),
            tick,
        }
    }

    /// Current time without advancing
    pub(crate) fn peek(&self) -> Duration {
        self.now.get()
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.tick);
        now
    }
}

/// A bus transfer that reached the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// Empty write used to poll for the end of a write cycle
    Probe { acked: bool },
    /// Data written: start address and payload length
    Write { address: u16, len: usize, at: Duration },
    /// Random or sequential read: start address and length
    Read { address: u16, len: usize },
}

/// Model of an M24Cxx on the bus, recording every transfer.
///
/// Mirrors the datasheet behaviour the driver depends on: the address pointer
/// is set by the first two bytes of a write, writes wrap inside the addressed
/// page, reads roll over at the end of the array and the device does not
/// acknowledge while a write cycle is running.
pub(crate) struct MockBus {
    pub(crate) memory: Vec<u8>,
    pub(crate) transfers: Vec<Transfer>,
    address: u8,
    page_size: usize,
    clock: ManualClock,
    busy_for: Duration,
    busy_until: Option<Duration>,
    fail_from: Option<usize>,
    data_transfers: usize,
}

impl MockBus {
    pub(crate) fn new(capacity: usize, page_size: usize, clock: ManualClock) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            memory: vec![0xFF; capacity],
            transfers: Vec::new(),
            address: 0x50,
            page_size,
            clock,
            busy_for: Duration::ZERO,
            busy_until: None,
            fail_from: None,
            data_transfers: 0,
        }
    }

    /// Ignore the bus for `busy_for` after every write
    pub(crate) fn with_write_cycle(mut self, busy_for: Duration) -> Self {
        self.busy_for = busy_for;
        self
    }

    /// Fail every data transfer from the `n`th one on (zero based)
    pub(crate) fn fail_from(&mut self, n: usize) {
        self.fail_from = Some(self.data_transfers + n);
    }

    pub(crate) fn writes(&self) -> impl Iterator<Item = (u16, usize)> + '_ {
        self.transfers.iter().filter_map(|t| match t {
            Transfer::Write { address, len, .. } => Some((*address, *len)),
            _ => None,
        })
    }

    pub(crate) fn reads(&self) -> impl Iterator<Item = (u16, usize)> + '_ {
        self.transfers.iter().filter_map(|t| match t {
            Transfer::Read { address, len } => Some((*address, *len)),
            _ => None,
        })
    }

    pub(crate) fn probes(&self) -> usize {
        self.transfers
            .iter()
            .filter(|t| matches!(t, Transfer::Probe { .. }))
            .count()
    }

    fn is_busy(&self) -> bool {
        self.busy_until.is_some_and(|until| self.clock.peek() < until)
    }

    fn store(&mut self, address: usize, data: &[u8]) {
        let page = address - address % self.page_size;
        for (i, &byte) in data.iter().enumerate() {
            let column = (address - page + i) % self.page_size;
            self.memory[page + column] = byte;
        }
    }

    fn load(&self, address: usize, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.memory[(address + i) % self.memory.len()];
        }
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);

        let mut outgoing = Vec::new();
        let mut incoming = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => outgoing.extend_from_slice(bytes),
                Operation::Read(buf) => incoming = Some(buf),
            }
        }

        if outgoing.is_empty() && incoming.is_none() {
            let acked = address == self.address && !self.is_busy();
            self.transfers.push(Transfer::Probe { acked });
            return if acked { Ok(()) } else { Err(nack) };
        }

        if address != self.address || self.is_busy() {
            return Err(nack);
        }

        let index = self.data_transfers;
        self.data_transfers += 1;
        if self.fail_from.is_some_and(|n| index >= n) {
            return Err(ErrorKind::Bus);
        }

        let pointer = match outgoing.as_slice() {
            [hi, lo, ..] => usize::from(u16::from_be_bytes([*hi, *lo])) % self.memory.len(),
            _ => return Err(ErrorKind::Other),
        };

        match incoming {
            Some(buf) => {
                self.load(pointer, buf);
                self.transfers.push(Transfer::Read {
                    address: pointer as u16,
                    len: buf.len(),
                });
            }
            None => {
                let payload = &outgoing[2..];
                self.store(pointer, payload);
                self.transfers.push(Transfer::Write {
                    address: pointer as u16,
                    len: payload.len(),
                    at: self.clock.peek(),
                });
                if !payload.is_empty() {
                    self.busy_until = Some(self.clock.peek() + self.busy_for);
                }
            }
        }

        Ok(())
    }
}
