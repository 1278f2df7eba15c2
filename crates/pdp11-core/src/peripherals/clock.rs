//! KW11-L line clock: a 60 Hz tick reduced to a fixed number of device steps.

use crate::api::{Device, DeviceContext, DEFAULT_CLOCK_INTERVAL};
use crate::{MachineError, TrapCause};

/// Line clock interrupt vector.
pub const CLOCK_VECTOR: u8 = 0o100;
/// Line clock bus request level.
pub const CLOCK_PRIORITY: u8 = 6;

const CSR_MONITOR: u16 = 0o200;
const CSR_INTERRUPT_ENABLE: u16 = 0o100;

/// KW11-L line clock. Ticks once every `interval` device steps, which stands
/// in for the 50/60 Hz mains line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClock {
    csr: u16,
    interval: u32,
    counter: u32,
}

impl Default for LineClock {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_INTERVAL)
    }
}

impl LineClock {
    /// Clock ticking every `interval` steps (at least one).
    #[must_use]
    pub fn new(interval: u32) -> Self {
        Self {
            csr: CSR_MONITOR,
            interval: interval.max(1),
            counter: 0,
        }
    }

    /// Status register.
    #[must_use]
    pub const fn csr(&self) -> u16 {
        self.csr
    }
}

impl Device for LineClock {
    fn name(&self) -> &'static str {
        "kw11"
    }

    fn read16(&mut self, _addr: u32) -> Result<u16, TrapCause> {
        Ok(self.csr)
    }

    fn write16(&mut self, _addr: u32, value: u16) -> Result<(), TrapCause> {
        log::debug!("kw11: csr write {value:06o}");
        self.csr = value & (CSR_MONITOR | CSR_INTERRUPT_ENABLE);
        Ok(())
    }

    fn reset(&mut self) {
        self.csr = CSR_MONITOR;
        self.counter = 0;
    }

    fn step(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        self.counter += 1;
        if self.counter < self.interval {
            return Ok(());
        }
        self.counter = 0;
        self.csr |= CSR_MONITOR;
        if self.csr & CSR_INTERRUPT_ENABLE != 0 {
            ctx.interrupt(CLOCK_VECTOR, CLOCK_PRIORITY)?;
        }
        Ok(())
    }
}
