//! Host-facing contracts for embedding the processor core: configuration,
//! the device interface and stepping outcomes.

use crate::interrupt::{InterruptController, InterruptRequest};
use crate::memory::MemoryImage;
use crate::{MachineError, TrapCause};

/// Instructions between line clock ticks.
pub const DEFAULT_CLOCK_INTERVAL: u32 = 40_000;

/// Device steps a console character takes to transmit.
pub const DEFAULT_CONSOLE_OUTPUT_DELAY: u8 = 32;

/// Machine-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Instructions between line clock interrupts.
    pub clock_interval: u32,
    /// Device steps before a written console character is marked done.
    pub console_output_delay: u8,
    /// Emit a `trace!` record for every instruction fetch.
    pub trace_instructions: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            clock_interval: DEFAULT_CLOCK_INTERVAL,
            console_output_delay: DEFAULT_CONSOLE_OUTPUT_DELAY,
            trace_instructions: false,
        }
    }
}

/// What a device may touch while it advances: main memory for DMA and the
/// interrupt controller for requests.
pub struct DeviceContext<'a> {
    /// Main memory.
    pub memory: &'a mut MemoryImage,
    /// Pending interrupt table.
    pub interrupts: &'a mut InterruptController,
}

impl DeviceContext<'_> {
    /// Raises an interrupt request.
    ///
    /// # Errors
    ///
    /// See [`InterruptController::interrupt`].
    pub fn interrupt(&mut self, vector: u8, priority: u8) -> Result<(), MachineError> {
        self.interrupts.interrupt(vector, priority)
    }
}

/// A Unibus peripheral occupying a window of the I/O page.
///
/// Addresses passed to `read16`/`write16` are full 18-bit physical word
/// addresses inside the window the device was attached at.
pub trait Device {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Reads a register.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for addresses with no register behind them.
    fn read16(&mut self, addr: u32) -> Result<u16, TrapCause>;

    /// Writes a register.
    ///
    /// # Errors
    ///
    /// [`TrapCause::BusError`] for addresses with no register behind them.
    fn write16(&mut self, addr: u32, value: u16) -> Result<(), TrapCause>;

    /// Bus initialization (`RESET` instruction or machine reset).
    fn reset(&mut self);

    /// Advances the device by one instruction time.
    ///
    /// # Errors
    ///
    /// Fatal errors raised while queueing an interrupt.
    fn step(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError>;
}

/// Result of one processor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// An instruction completed.
    Retired,
    /// The instruction trapped and the trap was dispatched.
    Trapped(TrapCause),
    /// The processor is idle in `WAIT`.
    Waiting,
    /// The processor is halted.
    Halted,
}

/// Result of one machine cycle: processor step, device steps, interrupt check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CycleOutcome {
    /// Processor step result.
    pub step: StepOutcome,
    /// Interrupt delivered at the end of the cycle, if any.
    pub interrupt: Option<InterruptRequest>,
}

/// Summary of a bounded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Cycles executed.
    pub cycles: u64,
    /// Last step status before returning.
    pub final_step: StepOutcome,
}

impl RunOutcome {
    /// True if the run stopped because the processor halted.
    #[must_use]
    pub const fn halted(&self) -> bool {
        matches!(self.final_step, StepOutcome::Halted)
    }
}

#[cfg(test)]
mod tests {
    use super::{MachineConfig, RunOutcome, StepOutcome, DEFAULT_CLOCK_INTERVAL};

    #[test]
    fn default_config_matches_documented_constants() {
        let config = MachineConfig::default();
        assert_eq!(config.clock_interval, DEFAULT_CLOCK_INTERVAL);
        assert_eq!(config.console_output_delay, 32);
        assert!(!config.trace_instructions);
    }

    #[test]
    fn run_outcome_reports_halt() {
        let halted = RunOutcome {
            cycles: 3,
            final_step: StepOutcome::Halted,
        };
        assert!(halted.halted());
        assert!(!RunOutcome {
            cycles: 3,
            final_step: StepOutcome::Retired
        }
        .halted());
    }
}
