//! Physical memory image and Unibus address routing.

/// Fixed physical address map and decoder.
pub mod map;
/// Device table and physical access dispatch.
pub mod router;

use core::fmt;

use crate::TrapCause;

pub use map::{
    decode_physical, untranslated, PageBank, PageRegister, PageRegisterKind, PhysicalRegion,
    StatusRegister, CLOCK_REGISTERS, CONSOLE_REGISTERS, CORE_REGISTER_RANGES, DISK_REGISTERS,
    IO_PAGE_BASE, IO_PAGE_RELOCATION, KERNEL_PAR_BASE, KERNEL_PDR_BASE, PHYSICAL_ADDRESS_LIMIT,
    PSW_ADDR, SR0_ADDR, SR1_ADDR, SR2_ADDR, USER_PAR_BASE, USER_PDR_BASE,
};
pub use router::Unibus;

/// Number of 16-bit words of main memory (everything below the I/O page).
pub const MEMORY_WORDS: usize = (IO_PAGE_BASE >> 1) as usize;

/// Word-organized main memory. Byte accesses are synthesized from words,
/// low byte at the even address.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryImage {
    words: Box<[u16]>,
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryImage")
            .field("words", &self.words.len())
            .finish()
    }
}

impl MemoryImage {
    /// Allocates zeroed memory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: vec![0; MEMORY_WORDS].into_boxed_slice(),
        }
    }

    /// True when `pa` falls inside main memory.
    #[must_use]
    pub const fn contains(&self, pa: u32) -> bool {
        pa < IO_PAGE_BASE
    }

    fn word_index(&self, pa: u32) -> Result<usize, TrapCause> {
        if pa & 1 != 0 || !self.contains(pa) {
            return Err(TrapCause::BusError);
        }
        Ok((pa >> 1) as usize)
    }

    /// Reads the word at even address `pa`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for odd or out-of-range addresses.
    pub fn read16(&self, pa: u32) -> Result<u16, TrapCause> {
        let index = self.word_index(pa)?;
        Ok(self.words[index])
    }

    /// Writes the word at even address `pa`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for odd or out-of-range addresses.
    pub fn write16(&mut self, pa: u32, value: u16) -> Result<(), TrapCause> {
        let index = self.word_index(pa)?;
        self.words[index] = value;
        Ok(())
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] outside main memory.
    pub fn read8(&self, pa: u32) -> Result<u8, TrapCause> {
        let word = self.read16(pa & !1)?;
        Ok(if pa & 1 == 0 {
            (word & 0xFF) as u8
        } else {
            (word >> 8) as u8
        })
    }

    /// Writes one byte, leaving the other half of the word intact.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] outside main memory.
    pub fn write8(&mut self, pa: u32, value: u8) -> Result<(), TrapCause> {
        let index = self.word_index(pa & !1)?;
        let word = self.words[index];
        self.words[index] = if pa & 1 == 0 {
            (word & 0xFF00) | u16::from(value)
        } else {
            (word & 0x00FF) | (u16::from(value) << 8)
        };
        Ok(())
    }

    /// Copies `words` into memory starting at even address `base`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] if any word would land outside main memory.
    pub fn load(&mut self, base: u32, words: &[u16]) -> Result<(), TrapCause> {
        let start = self.word_index(base)?;
        let end = start + words.len();
        let target = self.words.get_mut(start..end).ok_or(TrapCause::BusError)?;
        target.copy_from_slice(words);
        Ok(())
    }

    /// All of memory as words.
    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }
}
