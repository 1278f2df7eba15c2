use thiserror::Error;

/// Coarse grouping used by diagnostics and log routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapClass {
    /// Raised by the machine while executing an instruction.
    Fault,
    /// Requested explicitly by the program (`BPT`, `IOT`, `EMT`, `TRAP`).
    Programmed,
}

/// Guest-visible trap causes, each tied to a fixed low-memory vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum TrapCause {
    /// Odd word address or no responder on the bus.
    #[error("bus error")]
    BusError = 0o004,
    /// Reserved opcode, or a privileged instruction outside kernel mode.
    #[error("illegal instruction")]
    IllegalInstruction = 0o010,
    /// `BPT`.
    #[error("breakpoint trap")]
    Breakpoint = 0o014,
    /// `IOT`.
    #[error("i/o trap")]
    Iot = 0o020,
    /// `EMT`.
    #[error("emulator trap")]
    Emt = 0o030,
    /// `TRAP`.
    #[error("trap instruction")]
    Trap = 0o034,
    /// Address translation refused the access.
    #[error("memory management fault")]
    MemoryManagement = 0o250,
}

impl TrapCause {
    /// Vector address the cause dispatches through.
    #[must_use]
    pub const fn vector(self) -> u16 {
        self as u16
    }

    /// Inverse of [`TrapCause::vector`].
    #[must_use]
    pub const fn from_vector(vector: u16) -> Option<Self> {
        match vector {
            0o004 => Some(Self::BusError),
            0o010 => Some(Self::IllegalInstruction),
            0o014 => Some(Self::Breakpoint),
            0o020 => Some(Self::Iot),
            0o030 => Some(Self::Emt),
            0o034 => Some(Self::Trap),
            0o250 => Some(Self::MemoryManagement),
            _ => None,
        }
    }

    /// Diagnostics class for this cause.
    #[must_use]
    pub const fn class(self) -> TrapClass {
        match self {
            Self::BusError | Self::IllegalInstruction | Self::MemoryManagement => TrapClass::Fault,
            Self::Breakpoint | Self::Iot | Self::Emt | Self::Trap => TrapClass::Programmed,
        }
    }
}

/// Unrecoverable emulator conditions. These stop the machine instead of
/// vectoring through guest memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// A trap or interrupt named an odd vector address.
    #[error("odd vector {vector:06o}")]
    OddVector {
        /// Offending vector.
        vector: u16,
    },
    /// An interrupt was requested through vector 0.
    #[error("interrupt requested through reserved vector 0")]
    ZeroVector,
    /// All interrupt table slots were occupied.
    #[error("interrupt table full while queueing vector {vector:03o} at priority {priority}")]
    InterruptTableFull {
        /// Vector that could not be queued.
        vector: u8,
        /// Priority of the rejected request.
        priority: u8,
    },
    /// `JMP` or `JSR` addressed a register instead of memory.
    #[error("instruction {instruction:06o} at {pc:06o} jumps to a register")]
    RegisterOperand {
        /// Instruction word.
        instruction: u16,
        /// Address the instruction was fetched from.
        pc: u16,
    },
    /// A trap occurred while pushing the frame or reading the vector of another.
    #[error("{nested} while vectoring through {vector:06o}")]
    DoubleFault {
        /// Vector being dispatched when the nested trap hit.
        vector: u16,
        /// The nested cause.
        nested: TrapCause,
    },
    /// A device range overlapped memory, a core register or another device.
    #[error("device range {start:06o}..={end:06o} conflicts with an existing assignment")]
    AddressRangeConflict {
        /// Inclusive start of the rejected range.
        start: u32,
        /// Inclusive end of the rejected range.
        end: u32,
    },
}

/// Result of a failed operation inside the instruction engine: either a
/// guest-visible trap or a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Vector through the cause's trap vector and continue.
    Trap(TrapCause),
    /// Stop the machine.
    Fatal(MachineError),
}

impl From<TrapCause> for Fault {
    fn from(cause: TrapCause) -> Self {
        Self::Trap(cause)
    }
}

impl From<MachineError> for Fault {
    fn from(error: MachineError) -> Self {
        Self::Fatal(error)
    }
}
