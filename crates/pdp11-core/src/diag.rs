//! Machine state snapshot and trap statistics for post-mortem dumps.

use core::fmt;

use crate::state::{GeneralRegister, Psw, RunState};
use crate::{Cpu, TrapCause, TrapClass};

/// Saturating event counters kept by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TrapCounters {
    /// Instructions fetched.
    pub instructions: u64,
    /// Machine-raised traps (bus error, illegal instruction, MMU abort).
    pub faults: u64,
    /// Program-requested traps.
    pub programmed: u64,
    /// Interrupts delivered.
    pub interrupts: u64,
}

impl TrapCounters {
    /// Counts a dispatched trap by class.
    pub fn record_trap(&mut self, cause: TrapCause) {
        match cause.class() {
            TrapClass::Fault => self.faults = self.faults.saturating_add(1),
            TrapClass::Programmed => self.programmed = self.programmed.saturating_add(1),
        }
    }
}

/// Point-in-time copy of the state worth printing after a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// `R0..R7`.
    pub registers: [u16; 8],
    /// Status word.
    pub psw: Psw,
    /// Address of the last fetched instruction.
    pub last_pc: u16,
    /// Last fetched instruction word.
    pub last_instruction: u16,
    /// MMU status register 0.
    pub sr0: u16,
    /// MMU status register 2.
    pub sr2: u16,
    /// Run state.
    pub run_state: RunState,
    /// Event counters.
    pub counters: TrapCounters,
}

impl Cpu {
    /// Captures a diagnostic snapshot.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            registers: self.regs.general(),
            psw: self.psw,
            last_pc: self.last_pc(),
            last_instruction: self.last_instruction(),
            sr0: self.mmu.sr0(),
            sr2: self.mmu.sr2(),
            run_state: self.run_state,
            counters: self.counters(),
        }
    }
}

fn flag(on: bool, letter: char) -> char {
    if on {
        letter
    } else {
        ' '
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reg in GeneralRegister::ALL {
            write!(f, "R{} {:06o} ", reg.index(), self.registers[reg.index()])?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "PS {:06o} [{}{}{}{}{}] mode {:?}/{:?} pri {}",
            self.psw.raw(),
            if self.psw.previous_mode().is_kernel() { 'k' } else { 'u' },
            flag(self.psw.n(), 'N'),
            flag(self.psw.z(), 'Z'),
            flag(self.psw.v(), 'V'),
            flag(self.psw.c(), 'C'),
            self.psw.current_mode(),
            self.psw.previous_mode(),
            self.psw.priority()
        )?;
        write!(
            f,
            "instr {:06o}: {:06o}  SR0 {:06o} SR2 {:06o}  {:?}  ",
            self.last_pc, self.last_instruction, self.sr0, self.sr2, self.run_state
        )?;
        write!(
            f,
            "{} instructions, {} faults, {} traps, {} interrupts",
            self.counters.instructions,
            self.counters.faults,
            self.counters.programmed,
            self.counters.interrupts
        )
    }
}
