//! Core of a PDP-11/40 emulator: instruction engine, memory management,
//! trap and interrupt dispatch, and the Unibus with its standard devices.

/// Host-facing configuration, device contract and step outcomes.
pub mod api;
pub use api::{
    CycleOutcome, Device, DeviceContext, MachineConfig, RunOutcome, StepOutcome,
    DEFAULT_CLOCK_INTERVAL, DEFAULT_CONSOLE_OUTPUT_DELAY,
};

/// Power-on reset and the disk bootstrap.
pub mod boot;
pub use boot::{BOOT_ENTRY, BOOT_ROM, BOOT_ROM_BASE};

/// Trap and interrupt counters and the register dump.
pub mod diag;
pub use diag::{Diagnostics, TrapCounters};

/// Opcode table and operand widths.
pub mod encoding;
pub use encoding::{classify_opcode, Opcode, OperandSize, OPCODE_ENCODING_TABLE};

/// Instruction field extraction.
pub mod decoder;
pub use decoder::{AddressingMode, DecodedInstruction, Decoder, OperandSpec};

/// Guest trap causes and fatal machine errors.
pub mod fault;
pub use fault::{Fault, MachineError, TrapCause, TrapClass};

/// Processor state and the instruction engine.
pub mod execute;
pub use execute::{Cpu, FlagsUpdate, Operand};

/// Pending interrupt table.
pub mod interrupt;
pub use interrupt::{InterruptController, InterruptRequest, INTERRUPT_TABLE_CAPACITY};

/// Processor plus devices, driven one cycle at a time.
pub mod machine;
pub use machine::Machine;

/// Physical memory, the I/O page map and the bus router.
pub mod memory;
pub use memory::{MemoryImage, Unibus};

/// Virtual-to-physical address translation.
pub mod mmu;
pub use mmu::{AccessControl, AccessKind, Mmu, PageDescriptor, Violation, PAGE_COUNT};

/// Line clock, console terminal and RK05 disk.
pub mod peripherals;

/// Register file, processor status word and run state.
pub mod state;
pub use state::{GeneralRegister, Mode, Psw, RegisterFile, RunState};

/// Trap vectoring and interrupt acceptance.
pub mod trap;

#[cfg(test)]
use proptest as _;
