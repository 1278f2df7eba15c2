//! General register file with the banked stack pointer.

use super::psw::Mode;

/// Number of architecturally visible general registers (`R0..R7`).
pub const GENERAL_REGISTER_COUNT: usize = 8;
/// Number of processor modes, and therefore of banked stack pointers.
pub const MODE_COUNT: usize = 4;

/// Architecturally visible general register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum GeneralRegister {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
}

impl GeneralRegister {
    /// Stack pointer alias.
    pub const SP: Self = Self::R6;
    /// Program counter alias.
    pub const PC: Self = Self::R7;

    /// Ordered list of all general registers.
    pub const ALL: [Self; GENERAL_REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
    ];

    /// Returns the array index for this register (`0..=7`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes the low three bits of an instruction field.
    #[must_use]
    pub const fn from_field(bits: u16) -> Self {
        match bits & 7 {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            3 => Self::R3,
            4 => Self::R4,
            5 => Self::R5,
            6 => Self::R6,
            _ => Self::R7,
        }
    }

    /// Returns the odd partner used by `MUL`, `DIV` and `ASHC` (`Rn | 1`).
    #[must_use]
    pub const fn pair(self) -> Self {
        Self::from_field(self as u16 | 1)
    }

    /// True for `SP` and `PC`, which always step by a full word.
    #[must_use]
    pub const fn is_word_stepped(self) -> bool {
        matches!(self, Self::R6 | Self::R7)
    }
}

/// `R0..R7` plus one saved stack pointer per processor mode.
///
/// The live `R6` belongs to the current mode; the bank slot of the current
/// mode is stale until the next mode switch saves into it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    gpr: [u16; GENERAL_REGISTER_COUNT],
    stack_bank: [u16; MODE_COUNT],
}

impl RegisterFile {
    /// Reads a general register.
    #[must_use]
    pub const fn get(&self, reg: GeneralRegister) -> u16 {
        self.gpr[reg.index()]
    }

    /// Writes a general register.
    pub fn set(&mut self, reg: GeneralRegister, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Reads `R7`.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.gpr[GeneralRegister::PC.index()]
    }

    /// Writes `R7`.
    pub fn set_pc(&mut self, value: u16) {
        self.set(GeneralRegister::PC, value);
    }

    /// Reads the live stack pointer `R6`.
    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.gpr[GeneralRegister::SP.index()]
    }

    /// Writes the live stack pointer `R6`.
    pub fn set_sp(&mut self, value: u16) {
        self.set(GeneralRegister::SP, value);
    }

    /// Reads the saved stack pointer slot for `mode`.
    #[must_use]
    pub const fn banked_sp(&self, mode: Mode) -> u16 {
        self.stack_bank[mode.index()]
    }

    /// Overwrites the saved stack pointer slot for `mode`.
    pub fn set_banked_sp(&mut self, mode: Mode, value: u16) {
        self.stack_bank[mode.index()] = value;
    }

    /// Stack pointer of `mode` as seen while `current` is active.
    #[must_use]
    pub const fn stack_pointer(&self, mode: Mode, current: Mode) -> u16 {
        if mode.index() == current.index() {
            self.sp()
        } else {
            self.banked_sp(mode)
        }
    }

    /// Sets the stack pointer of `mode` while `current` is active.
    pub fn set_stack_pointer(&mut self, mode: Mode, current: Mode, value: u16) {
        if mode == current {
            self.set_sp(value);
        } else {
            self.set_banked_sp(mode, value);
        }
    }

    /// Saves the live `R6` into `from`'s slot and loads `to`'s slot.
    pub fn switch_stack(&mut self, from: Mode, to: Mode) {
        self.stack_bank[from.index()] = self.sp();
        self.gpr[GeneralRegister::SP.index()] = self.stack_bank[to.index()];
    }

    /// Snapshot of `R0..R7`.
    #[must_use]
    pub const fn general(&self) -> [u16; GENERAL_REGISTER_COUNT] {
        self.gpr
    }
}
