//! Physical access dispatch: memory, processor-owned registers, devices.

use core::ops::RangeInclusive;

use super::map::{
    decode_physical, PhysicalRegion, CORE_REGISTER_RANGES, IO_PAGE_BASE, PHYSICAL_ADDRESS_LIMIT,
};
use super::MemoryImage;
use crate::api::{Device, DeviceContext};
use crate::interrupt::InterruptController;
use crate::state::Psw;
use crate::{Cpu, MachineError, TrapCause};

struct DeviceSlot {
    range: RangeInclusive<u32>,
    device: Box<dyn Device>,
}

const fn ranges_overlap(a: &RangeInclusive<u32>, b: &RangeInclusive<u32>) -> bool {
    *a.start() <= *b.end() && *b.start() <= *a.end()
}

/// Main memory plus the table of attached devices.
#[derive(Default)]
pub struct Unibus {
    memory: MemoryImage,
    devices: Vec<DeviceSlot>,
}

impl core::fmt::Debug for Unibus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.devices.iter().map(|slot| slot.device.name()).collect();
        f.debug_struct("Unibus")
            .field("memory", &self.memory)
            .field("devices", &names)
            .finish()
    }
}

impl Unibus {
    /// Bus with zeroed memory and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Main memory.
    #[must_use]
    pub const fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Main memory, mutably.
    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        &mut self.memory
    }

    /// Assigns `range` of the I/O page to `device`.
    ///
    /// # Errors
    ///
    /// [`MachineError::AddressRangeConflict`] when the range is empty, lies
    /// outside the I/O page, or overlaps a processor register window or an
    /// already attached device.
    pub fn attach(
        &mut self,
        range: RangeInclusive<u32>,
        device: Box<dyn Device>,
    ) -> Result<(), MachineError> {
        let (start, end) = (*range.start(), *range.end());
        let conflict = start > end
            || start < IO_PAGE_BASE
            || end >= PHYSICAL_ADDRESS_LIMIT
            || CORE_REGISTER_RANGES.iter().any(|core| ranges_overlap(core, &range))
            || self.devices.iter().any(|slot| ranges_overlap(&slot.range, &range));
        if conflict {
            return Err(MachineError::AddressRangeConflict { start, end });
        }
        log::debug!("attached {} at {start:06o}..={end:06o}", device.name());
        self.devices.push(DeviceSlot { range, device });
        Ok(())
    }

    /// Number of attached devices.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    fn slot(&mut self, pa: u32) -> Option<&mut DeviceSlot> {
        self.devices.iter_mut().find(|slot| slot.range.contains(&pa))
    }

    /// Reads a device register.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] when nothing answers at `pa`.
    pub fn device_read16(&mut self, pa: u32) -> Result<u16, TrapCause> {
        match self.slot(pa) {
            Some(slot) => slot.device.read16(pa),
            None => {
                log::warn!("bus error: no device answers read at {pa:06o}");
                Err(TrapCause::BusError)
            }
        }
    }

    /// Writes a device register.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] when nothing answers at `pa`.
    pub fn device_write16(&mut self, pa: u32, value: u16) -> Result<(), TrapCause> {
        match self.slot(pa) {
            Some(slot) => slot.device.write16(pa, value),
            None => {
                log::warn!("bus error: no device answers write of {value:06o} at {pa:06o}");
                Err(TrapCause::BusError)
            }
        }
    }

    /// Bus initialization of every device.
    pub fn reset_devices(&mut self) {
        for slot in &mut self.devices {
            slot.device.reset();
        }
    }

    /// Advances every device by one step, in attach order.
    ///
    /// # Errors
    ///
    /// The first fatal error any device reports.
    pub fn step_devices(
        &mut self,
        interrupts: &mut InterruptController,
    ) -> Result<(), MachineError> {
        for slot in &mut self.devices {
            let mut ctx = DeviceContext {
                memory: &mut self.memory,
                interrupts: &mut *interrupts,
            };
            slot.device.step(&mut ctx)?;
        }
        Ok(())
    }
}

impl Cpu {
    /// Reads the word at physical address `pa`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for odd addresses and unanswered I/O addresses.
    pub fn read_physical16(&mut self, pa: u32) -> Result<u16, TrapCause> {
        if pa & 1 != 0 {
            log::warn!("bus error: odd word read at {pa:06o}");
            return Err(TrapCause::BusError);
        }
        match decode_physical(pa) {
            PhysicalRegion::Memory => self.bus.memory.read16(pa),
            PhysicalRegion::PageRegister(reg) => Ok(self.mmu.read_page_register(reg)),
            PhysicalRegion::MmuStatus(reg) => Ok(self.mmu.read_status(reg)),
            PhysicalRegion::ProcessorStatus => Ok(self.psw.raw()),
            PhysicalRegion::Io => self.bus.device_read16(pa),
        }
    }

    /// Writes the word at physical address `pa`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for odd addresses and unanswered I/O addresses.
    pub fn write_physical16(&mut self, pa: u32, value: u16) -> Result<(), TrapCause> {
        if pa & 1 != 0 {
            log::warn!("bus error: odd word write at {pa:06o}");
            return Err(TrapCause::BusError);
        }
        match decode_physical(pa) {
            PhysicalRegion::Memory => self.bus.memory.write16(pa, value),
            PhysicalRegion::PageRegister(reg) => {
                self.mmu.write_page_register(reg, value);
                Ok(())
            }
            PhysicalRegion::MmuStatus(reg) => {
                self.mmu.write_status(reg, value);
                Ok(())
            }
            PhysicalRegion::ProcessorStatus => {
                self.load_psw(Psw::from_raw(value));
                Ok(())
            }
            PhysicalRegion::Io => self.bus.device_write16(pa, value),
        }
    }

    /// Reads one byte at physical address `pa`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] when the containing word is unreadable.
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_physical8(&mut self, pa: u32) -> Result<u8, TrapCause> {
        if pa < IO_PAGE_BASE {
            return self.bus.memory.read8(pa);
        }
        let word = self.read_physical16(pa & !1)?;
        Ok(if pa & 1 == 0 {
            (word & 0xFF) as u8
        } else {
            (word >> 8) as u8
        })
    }

    /// Writes one byte at physical address `pa`. Outside memory this is a
    /// read-modify-write of the containing register.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] when the containing word is inaccessible.
    pub fn write_physical8(&mut self, pa: u32, value: u8) -> Result<(), TrapCause> {
        if pa < IO_PAGE_BASE {
            return self.bus.memory.write8(pa, value);
        }
        let even = pa & !1;
        let word = self.read_physical16(even)?;
        let merged = if pa & 1 == 0 {
            (word & 0xFF00) | u16::from(value)
        } else {
            (word & 0x00FF) | (u16::from(value) << 8)
        };
        self.write_physical16(even, merged)
    }
}
