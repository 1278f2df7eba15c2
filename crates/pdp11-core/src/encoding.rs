//! Opcode encoding table and classification of raw instruction words.

/// Data width of an instruction's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSize {
    /// 8-bit operation (bit 15 set on byte-capable opcodes).
    Byte,
    /// 16-bit operation.
    Word,
}

impl OperandSize {
    /// Sign bit for this width.
    #[must_use]
    pub const fn sign_bit(self) -> u16 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
        }
    }

    /// All-ones mask for this width.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
        }
    }

    /// Largest positive value for this width.
    #[must_use]
    pub const fn max_positive(self) -> u16 {
        self.sign_bit() - 1
    }
}

/// Every implemented instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    Halt,
    Wait,
    Rti,
    Bpt,
    Iot,
    Reset,
    Rtt,
    Setd,
    Jmp,
    Rts,
    Spl,
    Ccc,
    Scc,
    Swab,
    Br,
    Bne,
    Beq,
    Bge,
    Blt,
    Bgt,
    Ble,
    Bpl,
    Bmi,
    Bhi,
    Blos,
    Bvc,
    Bvs,
    Bcc,
    Bcs,
    Jsr,
    Clr,
    Com,
    Inc,
    Dec,
    Neg,
    Adc,
    Sbc,
    Tst,
    Ror,
    Rol,
    Asr,
    Asl,
    Mark,
    Mfpi,
    Mtpi,
    Sxt,
    Mul,
    Div,
    Ash,
    Ashc,
    Xor,
    Sob,
    Emt,
    Trap,
    Mov,
    Cmp,
    Bit,
    Bic,
    Bis,
    Add,
    Sub,
}

impl Opcode {
    /// True when bit 15 selects the byte form of this opcode.
    #[must_use]
    pub const fn has_byte_form(self) -> bool {
        matches!(
            self,
            Self::Clr
                | Self::Com
                | Self::Inc
                | Self::Dec
                | Self::Neg
                | Self::Adc
                | Self::Sbc
                | Self::Tst
                | Self::Ror
                | Self::Rol
                | Self::Asr
                | Self::Asl
                | Self::Mov
                | Self::Cmp
                | Self::Bit
                | Self::Bic
                | Self::Bis
        )
    }

    /// True for the conditional and unconditional branches.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(
            self,
            Self::Br
                | Self::Bne
                | Self::Beq
                | Self::Bge
                | Self::Blt
                | Self::Bgt
                | Self::Ble
                | Self::Bpl
                | Self::Bmi
                | Self::Bhi
                | Self::Blos
                | Self::Bvc
                | Self::Bvs
                | Self::Bcc
                | Self::Bcs
        )
    }
}

/// Ordered `(mask, pattern, opcode)` table; the first entry with
/// `word & mask == pattern` wins. Byte-capable entries leave bit 15 out of
/// the mask. Anything unmatched is a reserved instruction.
pub const OPCODE_ENCODING_TABLE: &[(u16, u16, Opcode)] = &[
    (0o177_777, 0o000_000, Opcode::Halt),
    (0o177_777, 0o000_001, Opcode::Wait),
    (0o177_777, 0o000_002, Opcode::Rti),
    (0o177_777, 0o000_003, Opcode::Bpt),
    (0o177_777, 0o000_004, Opcode::Iot),
    (0o177_777, 0o000_005, Opcode::Reset),
    (0o177_777, 0o000_006, Opcode::Rtt),
    (0o177_777, 0o170_011, Opcode::Setd),
    (0o177_700, 0o000_100, Opcode::Jmp),
    (0o177_770, 0o000_200, Opcode::Rts),
    (0o177_770, 0o000_230, Opcode::Spl),
    (0o177_760, 0o000_240, Opcode::Ccc),
    (0o177_760, 0o000_260, Opcode::Scc),
    (0o177_700, 0o000_300, Opcode::Swab),
    (0o177_400, 0o000_400, Opcode::Br),
    (0o177_400, 0o001_000, Opcode::Bne),
    (0o177_400, 0o001_400, Opcode::Beq),
    (0o177_400, 0o002_000, Opcode::Bge),
    (0o177_400, 0o002_400, Opcode::Blt),
    (0o177_400, 0o003_000, Opcode::Bgt),
    (0o177_400, 0o003_400, Opcode::Ble),
    (0o177_000, 0o004_000, Opcode::Jsr),
    (0o077_700, 0o005_000, Opcode::Clr),
    (0o077_700, 0o005_100, Opcode::Com),
    (0o077_700, 0o005_200, Opcode::Inc),
    (0o077_700, 0o005_300, Opcode::Dec),
    (0o077_700, 0o005_400, Opcode::Neg),
    (0o077_700, 0o005_500, Opcode::Adc),
    (0o077_700, 0o005_600, Opcode::Sbc),
    (0o077_700, 0o005_700, Opcode::Tst),
    (0o077_700, 0o006_000, Opcode::Ror),
    (0o077_700, 0o006_100, Opcode::Rol),
    (0o077_700, 0o006_200, Opcode::Asr),
    (0o077_700, 0o006_300, Opcode::Asl),
    (0o177_700, 0o006_400, Opcode::Mark),
    (0o177_700, 0o006_500, Opcode::Mfpi),
    (0o177_700, 0o006_600, Opcode::Mtpi),
    (0o177_700, 0o006_700, Opcode::Sxt),
    (0o177_000, 0o070_000, Opcode::Mul),
    (0o177_000, 0o071_000, Opcode::Div),
    (0o177_000, 0o072_000, Opcode::Ash),
    (0o177_000, 0o073_000, Opcode::Ashc),
    (0o177_000, 0o074_000, Opcode::Xor),
    (0o177_000, 0o077_000, Opcode::Sob),
    (0o177_400, 0o100_000, Opcode::Bpl),
    (0o177_400, 0o100_400, Opcode::Bmi),
    (0o177_400, 0o101_000, Opcode::Bhi),
    (0o177_400, 0o101_400, Opcode::Blos),
    (0o177_400, 0o102_000, Opcode::Bvc),
    (0o177_400, 0o102_400, Opcode::Bvs),
    (0o177_400, 0o103_000, Opcode::Bcc),
    (0o177_400, 0o103_400, Opcode::Bcs),
    (0o177_400, 0o104_000, Opcode::Emt),
    (0o177_400, 0o104_400, Opcode::Trap),
    (0o070_000, 0o010_000, Opcode::Mov),
    (0o070_000, 0o020_000, Opcode::Cmp),
    (0o070_000, 0o030_000, Opcode::Bit),
    (0o070_000, 0o040_000, Opcode::Bic),
    (0o070_000, 0o050_000, Opcode::Bis),
    (0o170_000, 0o060_000, Opcode::Add),
    (0o170_000, 0o160_000, Opcode::Sub),
];

/// Looks up the opcode and operand width of an instruction word.
///
/// `None` means a reserved instruction.
#[must_use]
pub fn classify_opcode(word: u16) -> Option<(Opcode, OperandSize)> {
    OPCODE_ENCODING_TABLE
        .iter()
        .find(|(mask, pattern, _)| word & mask == *pattern)
        .map(|(_, _, opcode)| {
            let size = if opcode.has_byte_form() && word & 0o100_000 != 0 {
                OperandSize::Byte
            } else {
                OperandSize::Word
            };
            (*opcode, size)
        })
}
