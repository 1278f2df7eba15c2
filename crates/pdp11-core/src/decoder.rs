//! Instruction word decoding into opcode and operand fields.

use crate::encoding::{classify_opcode, Opcode, OperandSize};
use crate::state::GeneralRegister;

/// The eight general-register addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// `Rn`: the register itself.
    Register,
    /// `(Rn)`: the register holds the address.
    RegisterDeferred,
    /// `(Rn)+`: address in the register, then step it.
    AutoIncrement,
    /// `@(Rn)+`: pointer in the register, then step it by two.
    AutoIncrementDeferred,
    /// `-(Rn)`: step the register down, then use it.
    AutoDecrement,
    /// `@-(Rn)`: step down by two, then follow the pointer.
    AutoDecrementDeferred,
    /// `X(Rn)`: register plus the following word.
    Index,
    /// `@X(Rn)`: pointer at register plus the following word.
    IndexDeferred,
}

impl AddressingMode {
    /// Decodes a three-bit mode field.
    #[must_use]
    pub const fn from_u3(bits: u16) -> Self {
        match bits & 7 {
            0 => Self::Register,
            1 => Self::RegisterDeferred,
            2 => Self::AutoIncrement,
            3 => Self::AutoIncrementDeferred,
            4 => Self::AutoDecrement,
            5 => Self::AutoDecrementDeferred,
            6 => Self::Index,
            _ => Self::IndexDeferred,
        }
    }
}

/// A six-bit operand specifier: mode in bits 5..3, register in bits 2..0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandSpec {
    /// Addressing mode.
    pub mode: AddressingMode,
    /// Base register.
    pub register: GeneralRegister,
}

impl OperandSpec {
    /// Splits the low six bits of `field`.
    #[must_use]
    pub const fn from_field(field: u16) -> Self {
        Self {
            mode: AddressingMode::from_u3(field >> 3),
            register: GeneralRegister::from_field(field),
        }
    }
}

/// A recognized instruction word with accessors for its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedInstruction {
    /// Raw instruction word.
    pub word: u16,
    /// Operation.
    pub opcode: Opcode,
    /// Operand width.
    pub size: OperandSize,
}

impl DecodedInstruction {
    /// Source specifier (bits 11..6) of a double-operand instruction.
    #[must_use]
    pub const fn source(self) -> OperandSpec {
        OperandSpec::from_field(self.word >> 6)
    }

    /// Destination specifier (bits 5..0).
    #[must_use]
    pub const fn destination(self) -> OperandSpec {
        OperandSpec::from_field(self.word)
    }

    /// Register field in bits 8..6 (`JSR`, `MUL`, `DIV`, `ASH`, `ASHC`, `XOR`, `SOB`).
    #[must_use]
    pub const fn register(self) -> GeneralRegister {
        GeneralRegister::from_field(self.word >> 6)
    }

    /// Register field in bits 2..0 (`RTS`).
    #[must_use]
    pub const fn low_register(self) -> GeneralRegister {
        GeneralRegister::from_field(self.word)
    }

    /// Branch displacement in bytes, sign-extended from the low byte.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn branch_offset(self) -> u16 {
        ((self.word as u8 as i8 as i16) * 2) as u16
    }

    /// Low six bits (`SOB` count, `MARK` argument count).
    #[must_use]
    pub const fn low_six(self) -> u16 {
        self.word & 0o77
    }
}

/// Stateless decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes `word`, or `None` for a reserved instruction.
    #[must_use]
    pub fn decode(word: u16) -> Option<DecodedInstruction> {
        classify_opcode(word).map(|(opcode, size)| DecodedInstruction { word, opcode, size })
    }
}
