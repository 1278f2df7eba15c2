//! Processor status word.

/// Carry flag.
pub const PSW_C: u16 = 0o1;
/// Overflow flag.
pub const PSW_V: u16 = 0o2;
/// Zero flag.
pub const PSW_Z: u16 = 0o4;
/// Negative flag.
pub const PSW_N: u16 = 0o10;
/// Trace bit.
pub const PSW_T: u16 = 0o20;
/// Processor priority field (bits 5..7).
pub const PSW_PRIORITY_MASK: u16 = 0o340;

const CONDITION_CODES: u16 = PSW_N | PSW_Z | PSW_V | PSW_C;
const PRIORITY_SHIFT: u16 = 5;
const PREVIOUS_MODE_SHIFT: u16 = 12;
const CURRENT_MODE_SHIFT: u16 = 14;
const MODE_BITS: u16 = 0o3;

/// Processor mode as encoded in the two-bit PSW mode fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Mode {
    /// Privileged mode; uses the kernel page bank.
    #[default]
    Kernel = 0,
    /// Supervisor encoding; translated through the user page bank.
    Supervisor = 1,
    /// Reserved encoding; treated as non-kernel.
    Illegal = 2,
    /// Unprivileged mode.
    User = 3,
}

impl Mode {
    /// Decodes the low two bits of `bits`.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & MODE_BITS {
            0 => Self::Kernel,
            1 => Self::Supervisor,
            2 => Self::Illegal,
            _ => Self::User,
        }
    }

    /// Two-bit field encoding.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self as u16
    }

    /// Stack bank index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// True only for kernel mode.
    #[must_use]
    pub const fn is_kernel(self) -> bool {
        matches!(self, Self::Kernel)
    }
}

/// 16-bit processor status word.
///
/// Layout: `15..14` current mode, `13..12` previous mode, `7..5` priority,
/// `4` trace, `3..0` N Z V C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Psw(u16);

impl Psw {
    /// Wraps a raw status word.
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw status word.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    const fn flag(self, mask: u16) -> bool {
        self.0 & mask != 0
    }

    fn set_flag(&mut self, mask: u16, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Negative flag.
    #[must_use]
    pub const fn n(self) -> bool {
        self.flag(PSW_N)
    }

    /// Zero flag.
    #[must_use]
    pub const fn z(self) -> bool {
        self.flag(PSW_Z)
    }

    /// Overflow flag.
    #[must_use]
    pub const fn v(self) -> bool {
        self.flag(PSW_V)
    }

    /// Carry flag.
    #[must_use]
    pub const fn c(self) -> bool {
        self.flag(PSW_C)
    }

    /// Sets or clears N.
    pub fn set_n(&mut self, on: bool) {
        self.set_flag(PSW_N, on);
    }

    /// Sets or clears Z.
    pub fn set_z(&mut self, on: bool) {
        self.set_flag(PSW_Z, on);
    }

    /// Sets or clears V.
    pub fn set_v(&mut self, on: bool) {
        self.set_flag(PSW_V, on);
    }

    /// Sets or clears C.
    pub fn set_c(&mut self, on: bool) {
        self.set_flag(PSW_C, on);
    }

    /// The four condition-code bits.
    #[must_use]
    pub const fn condition_codes(self) -> u16 {
        self.0 & CONDITION_CODES
    }

    /// Replaces the four condition-code bits.
    pub fn set_condition_codes(&mut self, codes: u16) {
        self.0 = (self.0 & !CONDITION_CODES) | (codes & CONDITION_CODES);
    }

    /// Processor priority (0..=7).
    #[must_use]
    pub const fn priority(self) -> u8 {
        ((self.0 & PSW_PRIORITY_MASK) >> PRIORITY_SHIFT) as u8
    }

    /// Replaces the priority field.
    pub fn set_priority(&mut self, priority: u8) {
        let bits = (u16::from(priority) << PRIORITY_SHIFT) & PSW_PRIORITY_MASK;
        self.0 = (self.0 & !PSW_PRIORITY_MASK) | bits;
    }

    /// Current mode field.
    #[must_use]
    pub const fn current_mode(self) -> Mode {
        Mode::from_bits(self.0 >> CURRENT_MODE_SHIFT)
    }

    /// Replaces the current mode field.
    pub fn set_current_mode(&mut self, mode: Mode) {
        self.0 =
            (self.0 & !(MODE_BITS << CURRENT_MODE_SHIFT)) | (mode.bits() << CURRENT_MODE_SHIFT);
    }

    /// Previous mode field.
    #[must_use]
    pub const fn previous_mode(self) -> Mode {
        Mode::from_bits(self.0 >> PREVIOUS_MODE_SHIFT)
    }

    /// Replaces the previous mode field.
    pub fn set_previous_mode(&mut self, mode: Mode) {
        self.0 =
            (self.0 & !(MODE_BITS << PREVIOUS_MODE_SHIFT)) | (mode.bits() << PREVIOUS_MODE_SHIFT);
    }

    /// Copy of `self` with the previous mode replaced.
    #[must_use]
    pub fn with_previous_mode(mut self, mode: Mode) -> Self {
        self.set_previous_mode(mode);
        self
    }
}
