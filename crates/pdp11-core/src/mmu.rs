//! Paged address translation with per-page access control.

use crate::memory::{untranslated, PageBank, PageRegister, PageRegisterKind, StatusRegister};
use crate::state::Mode;
use crate::TrapCause;

/// Pages per bank.
pub const PAGE_COUNT: usize = 8;

const SR0_ENABLE: u16 = 0o1;
const SR0_ABORT_NO_ACCESS: u16 = 0o100_000;
const SR0_ABORT_LENGTH: u16 = 0o040_000;
const SR0_ABORT_READ_ONLY: u16 = 0o020_000;

const PDR_ACCESS_MASK: u16 = 0o6;
const PDR_EXPAND_DOWN: u16 = 0o10;
const PDR_WRITTEN: u16 = 0o100;
const PDR_WRITABLE_BITS: u16 = 0o077_416;
const PAR_FRAME_MASK: u16 = 0o7777;

/// Direction of a translated access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Load or instruction fetch.
    Read,
    /// Store.
    Write,
}

/// Decoded two-bit access control field of a page descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessControl {
    /// Non-resident or reserved; every access aborts.
    NoAccess,
    /// Reads allowed, writes abort.
    ReadOnly,
    /// Reads and writes allowed.
    ReadWrite,
}

/// Reason a translation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// Page is marked non-resident.
    NoAccess,
    /// Block number falls outside the page's length.
    PageLength,
    /// Write to a read-only page.
    ReadOnly,
}

impl Violation {
    /// Abort flag recorded in SR0.
    #[must_use]
    pub const fn sr0_flag(self) -> u16 {
        match self {
            Self::NoAccess => SR0_ABORT_NO_ACCESS,
            Self::PageLength => SR0_ABORT_LENGTH,
            Self::ReadOnly => SR0_ABORT_READ_ONLY,
        }
    }
}

/// PAR/PDR pair describing one 8 KiB virtual page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PageDescriptor {
    /// Page address register: base in 64-byte blocks.
    pub par: u16,
    /// Page descriptor register: length, direction, access control.
    pub pdr: u16,
}

impl PageDescriptor {
    /// Physical base of the page.
    #[must_use]
    pub const fn base(self) -> u32 {
        ((self.par & PAR_FRAME_MASK) as u32) << 6
    }

    /// Page length field (`0..=127` blocks).
    #[must_use]
    pub const fn length(self) -> u16 {
        (self.pdr >> 8) & 0o177
    }

    /// Access control field.
    #[must_use]
    pub const fn access_control(self) -> AccessControl {
        match (self.pdr & PDR_ACCESS_MASK) >> 1 {
            1 => AccessControl::ReadOnly,
            3 => AccessControl::ReadWrite,
            _ => AccessControl::NoAccess,
        }
    }

    /// True when the page grows downward from the top of its window.
    #[must_use]
    pub const fn expands_down(self) -> bool {
        self.pdr & PDR_EXPAND_DOWN != 0
    }

    /// True once the page has been written through.
    #[must_use]
    pub const fn written(self) -> bool {
        self.pdr & PDR_WRITTEN != 0
    }

    /// Whether `block` (`0..=127`) lies outside the page.
    #[must_use]
    pub const fn block_out_of_range(self, block: u16) -> bool {
        if self.expands_down() {
            block < self.length()
        } else {
            block > self.length()
        }
    }
}

/// Memory management unit: kernel and user page banks plus status registers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mmu {
    kernel: [PageDescriptor; PAGE_COUNT],
    user: [PageDescriptor; PAGE_COUNT],
    sr0: u16,
    sr2: u16,
}

impl Mmu {
    /// Disabled MMU with zeroed page registers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every register to its power-up value.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when SR0 bit 0 enables translation.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.sr0 & SR0_ENABLE != 0
    }

    /// Bank consulted for accesses in `mode`.
    #[must_use]
    pub const fn bank_for(mode: Mode) -> PageBank {
        if mode.is_kernel() {
            PageBank::Kernel
        } else {
            PageBank::User
        }
    }

    /// Page descriptor `page` of `bank`.
    #[must_use]
    pub const fn descriptor(&self, bank: PageBank, page: usize) -> PageDescriptor {
        match bank {
            PageBank::Kernel => self.kernel[page % PAGE_COUNT],
            PageBank::User => self.user[page % PAGE_COUNT],
        }
    }

    fn descriptor_mut(&mut self, bank: PageBank, page: usize) -> &mut PageDescriptor {
        match bank {
            PageBank::Kernel => &mut self.kernel[page % PAGE_COUNT],
            PageBank::User => &mut self.user[page % PAGE_COUNT],
        }
    }

    /// Installs a descriptor verbatim.
    pub fn set_descriptor(&mut self, bank: PageBank, page: usize, descriptor: PageDescriptor) {
        *self.descriptor_mut(bank, page) = descriptor;
    }

    /// Translates a 16-bit virtual address into an 18-bit physical address.
    ///
    /// On refusal SR0 records the abort reason, page number and mode, and the
    /// caller must raise the memory management trap. Successful writes mark
    /// the page as written.
    ///
    /// # Errors
    ///
    /// [`TrapCause::MemoryManagement`] when access control or page length
    /// forbids the access.
    pub fn translate(&mut self, va: u16, mode: Mode, access: AccessKind) -> Result<u32, TrapCause> {
        if !self.enabled() {
            return Ok(untranslated(va));
        }
        let page = usize::from(va >> 13);
        let bank = Self::bank_for(mode);
        let descriptor = self.descriptor(bank, page);
        let block = (va >> 6) & 0o177;

        let violation = match (descriptor.access_control(), access) {
            (AccessControl::NoAccess, _) => Some(Violation::NoAccess),
            (AccessControl::ReadOnly, AccessKind::Write) => Some(Violation::ReadOnly),
            _ if descriptor.block_out_of_range(block) => Some(Violation::PageLength),
            _ => None,
        };
        if let Some(violation) = violation {
            self.record_abort(violation, page, mode);
            log::warn!(
                "mmu abort {violation:?}: va {va:06o} page {page} {mode:?} {access:?} pdr {:06o}",
                descriptor.pdr
            );
            return Err(TrapCause::MemoryManagement);
        }
        if access == AccessKind::Write {
            self.descriptor_mut(bank, page).pdr |= PDR_WRITTEN;
        }
        let displacement = u32::from(va & 0o17_777);
        Ok((descriptor.base() + displacement) & 0o777_777)
    }

    fn record_abort(&mut self, violation: Violation, page: usize, mode: Mode) {
        #[allow(clippy::cast_possible_truncation)]
        let page = page as u16;
        self.sr0 = SR0_ENABLE | violation.sr0_flag() | (page << 1) | (mode.bits() << 5);
    }

    /// Bus read of a page register.
    #[must_use]
    pub const fn read_page_register(&self, reg: PageRegister) -> u16 {
        let descriptor = self.descriptor(reg.bank, reg.page);
        match reg.kind {
            PageRegisterKind::Descriptor => descriptor.pdr,
            PageRegisterKind::Address => descriptor.par,
        }
    }

    /// Bus write of a page register. Either write clears the written bit.
    pub fn write_page_register(&mut self, reg: PageRegister, value: u16) {
        let descriptor = self.descriptor_mut(reg.bank, reg.page);
        match reg.kind {
            PageRegisterKind::Descriptor => descriptor.pdr = value & PDR_WRITABLE_BITS,
            PageRegisterKind::Address => {
                descriptor.par = value & PAR_FRAME_MASK;
                descriptor.pdr &= !PDR_WRITTEN;
            }
        }
    }

    /// Bus read of a status register.
    #[must_use]
    pub const fn read_status(&self, reg: StatusRegister) -> u16 {
        match reg {
            StatusRegister::Sr0 => self.sr0,
            StatusRegister::Sr1 => 0,
            StatusRegister::Sr2 => self.sr2,
        }
    }

    /// Bus write of a status register. SR1 and SR2 ignore writes.
    pub fn write_status(&mut self, reg: StatusRegister, value: u16) {
        if reg == StatusRegister::Sr0 {
            self.sr0 = value;
        }
    }

    /// SR0.
    #[must_use]
    pub const fn sr0(&self) -> u16 {
        self.sr0
    }

    /// SR2.
    #[must_use]
    pub const fn sr2(&self) -> u16 {
        self.sr2
    }

    /// Records the virtual address of an instruction fetch in SR2.
    pub fn note_fetch(&mut self, pc: u16) {
        self.sr2 = pc;
    }
}
