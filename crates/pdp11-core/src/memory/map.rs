//! Fixed physical address map of the 18-bit Unibus.

use core::ops::RangeInclusive;

/// First byte of the I/O page; everything below is memory.
pub const IO_PAGE_BASE: u32 = 0o760_000;
/// One past the highest 18-bit physical address.
pub const PHYSICAL_ADDRESS_LIMIT: u32 = 0o1_000_000;
/// Offset added to 16-bit addresses in the top 8 KiB when translation is off.
pub const IO_PAGE_RELOCATION: u32 = 0o600_000;

/// Kernel page descriptor registers (`PDR0..PDR7`).
pub const KERNEL_PDR_BASE: u32 = 0o772_300;
/// Kernel page address registers (`PAR0..PAR7`).
pub const KERNEL_PAR_BASE: u32 = 0o772_340;
/// User page descriptor registers.
pub const USER_PDR_BASE: u32 = 0o777_600;
/// User page address registers.
pub const USER_PAR_BASE: u32 = 0o777_640;
/// MMU status register 0.
pub const SR0_ADDR: u32 = 0o777_572;
/// MMU status register 1.
pub const SR1_ADDR: u32 = 0o777_574;
/// MMU status register 2.
pub const SR2_ADDR: u32 = 0o777_576;
/// Processor status word.
pub const PSW_ADDR: u32 = 0o777_776;

/// RK11 disk controller register block.
pub const DISK_REGISTERS: RangeInclusive<u32> = 0o777_400..=0o777_417;
/// KL11 console register block.
pub const CONSOLE_REGISTERS: RangeInclusive<u32> = 0o777_560..=0o777_567;
/// KW11-L line clock status register.
pub const CLOCK_REGISTERS: RangeInclusive<u32> = 0o777_546..=0o777_547;

/// I/O page windows claimed by the processor itself; devices may not overlap them.
pub const CORE_REGISTER_RANGES: [RangeInclusive<u32>; 4] = [
    KERNEL_PDR_BASE..=0o772_377,
    SR0_ADDR..=0o777_577,
    USER_PDR_BASE..=0o777_677,
    PSW_ADDR..=0o777_777,
];

/// Which page register bank an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageBank {
    /// Used while the current mode is kernel.
    Kernel,
    /// Used for every non-kernel mode.
    User,
}

/// Descriptor or address half of a page register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageRegisterKind {
    /// Page descriptor register.
    Descriptor,
    /// Page address register.
    Address,
}

/// A single MMU page register as addressed on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRegister {
    /// Owning bank.
    pub bank: PageBank,
    /// PDR or PAR.
    pub kind: PageRegisterKind,
    /// Page number (`0..=7`).
    pub page: usize,
}

/// MMU status register selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRegister {
    /// Fault status and enable.
    Sr0,
    /// Register change record; always reads zero.
    Sr1,
    /// Virtual address of the last fetch.
    Sr2,
}

/// Classification of an 18-bit physical address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalRegion {
    /// Main memory below the I/O page.
    Memory,
    /// MMU page register.
    PageRegister(PageRegister),
    /// MMU status register.
    MmuStatus(StatusRegister),
    /// Processor status word.
    ProcessorStatus,
    /// Anything else; resolved through the device table.
    Io,
}

const fn page_register(
    pa: u32,
    base: u32,
    bank: PageBank,
    kind: PageRegisterKind,
) -> Option<PhysicalRegion> {
    if pa >= base && pa < base + 0o20 {
        Some(PhysicalRegion::PageRegister(PageRegister {
            bank,
            kind,
            page: ((pa - base) >> 1) as usize,
        }))
    } else {
        None
    }
}

/// Classifies `pa`. The low bit is ignored for register windows.
#[must_use]
pub const fn decode_physical(pa: u32) -> PhysicalRegion {
    if pa < IO_PAGE_BASE {
        return PhysicalRegion::Memory;
    }
    let even = pa & !1;
    match even {
        SR0_ADDR => return PhysicalRegion::MmuStatus(StatusRegister::Sr0),
        SR1_ADDR => return PhysicalRegion::MmuStatus(StatusRegister::Sr1),
        SR2_ADDR => return PhysicalRegion::MmuStatus(StatusRegister::Sr2),
        PSW_ADDR => return PhysicalRegion::ProcessorStatus,
        _ => {}
    }
    let windows = [
        (KERNEL_PDR_BASE, PageBank::Kernel, PageRegisterKind::Descriptor),
        (KERNEL_PAR_BASE, PageBank::Kernel, PageRegisterKind::Address),
        (USER_PDR_BASE, PageBank::User, PageRegisterKind::Descriptor),
        (USER_PAR_BASE, PageBank::User, PageRegisterKind::Address),
    ];
    let mut i = 0;
    while i < windows.len() {
        let (base, bank, kind) = windows[i];
        if let Some(region) = page_register(even, base, bank, kind) {
            return region;
        }
        i += 1;
    }
    PhysicalRegion::Io
}

/// Maps a 16-bit address to physical when translation is disabled.
#[must_use]
pub const fn untranslated(va: u16) -> u32 {
    let va = va as u32;
    if va >= 0o170_000 {
        va + IO_PAGE_RELOCATION
    } else {
        va
    }
}
