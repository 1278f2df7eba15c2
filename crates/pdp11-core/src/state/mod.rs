//! Architectural CPU state: register file, processor status word, run state.

/// General register file and per-mode stack pointer bank.
pub mod registers;
/// Processor status word bitfield and processor modes.
pub mod psw;
/// Host-observable execution state machine.
pub mod run_state;

pub use psw::{Mode, Psw, PSW_C, PSW_N, PSW_PRIORITY_MASK, PSW_T, PSW_V, PSW_Z};
pub use registers::{GeneralRegister, RegisterFile, GENERAL_REGISTER_COUNT, MODE_COUNT};
pub use run_state::RunState;
