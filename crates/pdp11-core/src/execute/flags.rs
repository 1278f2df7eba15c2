//! Condition code update behaviors for the instruction classes.

use crate::encoding::OperandSize;
use crate::state::Psw;

/// How N, Z, V and C change after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagsUpdate {
    /// N, Z, V replaced; C preserved.
    Nzv {
        /// Negative flag.
        negative: bool,
        /// Zero flag.
        zero: bool,
        /// Overflow flag.
        overflow: bool,
    },
    /// All four replaced.
    Nzvc {
        /// Negative flag.
        negative: bool,
        /// Zero flag.
        zero: bool,
        /// Overflow flag.
        overflow: bool,
        /// Carry flag.
        carry: bool,
    },
}

impl FlagsUpdate {
    /// N and Z from `result`, V cleared, C preserved.
    #[must_use]
    pub const fn logical(result: u16, size: OperandSize) -> Self {
        Self::Nzv {
            negative: result & size.sign_bit() != 0,
            zero: result & size.mask() == 0,
            overflow: false,
        }
    }

    /// N and Z from `result` with explicit V; C preserved.
    #[must_use]
    pub const fn with_overflow(result: u16, size: OperandSize, overflow: bool) -> Self {
        Self::Nzv {
            negative: result & size.sign_bit() != 0,
            zero: result & size.mask() == 0,
            overflow,
        }
    }

    /// N and Z from `result` with explicit V and C.
    #[must_use]
    pub const fn arithmetic(result: u16, size: OperandSize, overflow: bool, carry: bool) -> Self {
        Self::Nzvc {
            negative: result & size.sign_bit() != 0,
            zero: result & size.mask() == 0,
            overflow,
            carry,
        }
    }

    /// N and Z from `result`, V = N xor C, explicit C (shifts and rotates).
    #[must_use]
    pub const fn shifted(result: u16, size: OperandSize, carry: bool) -> Self {
        let negative = result & size.sign_bit() != 0;
        Self::arithmetic(result, size, negative != carry, carry)
    }

    /// Writes the update into `psw`.
    pub fn apply(self, psw: &mut Psw) {
        match self {
            Self::Nzv {
                negative,
                zero,
                overflow,
            } => {
                psw.set_n(negative);
                psw.set_z(zero);
                psw.set_v(overflow);
            }
            Self::Nzvc {
                negative,
                zero,
                overflow,
                carry,
            } => {
                psw.set_n(negative);
                psw.set_z(zero);
                psw.set_v(overflow);
                psw.set_c(carry);
            }
        }
    }
}
