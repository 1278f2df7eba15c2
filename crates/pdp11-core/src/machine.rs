//! The assembled machine and its driver loop.

use std::io::{Read, Seek, Write};
use std::ops::RangeInclusive;
use std::sync::mpsc::Receiver;

use crate::api::{CycleOutcome, Device, MachineConfig, RunOutcome, StepOutcome};
use crate::memory::{CLOCK_REGISTERS, CONSOLE_REGISTERS, DISK_REGISTERS};
use crate::peripherals::{Console, Disk, LineClock};
use crate::state::RunState;
use crate::{Cpu, MachineError};

/// Processor plus configuration. Each cycle executes one instruction,
/// steps every device once, then makes at most one interrupt decision.
#[derive(Debug)]
pub struct Machine {
    cpu: Cpu,
    config: MachineConfig,
}

impl Machine {
    /// Machine with no devices attached, reset and ready to boot.
    #[must_use]
    pub fn new(config: MachineConfig) -> Self {
        let mut cpu = Cpu::new();
        cpu.set_trace_instructions(config.trace_instructions);
        cpu.reset();
        Self { cpu, config }
    }

    /// Machine with the line clock, console and disk at their standard addresses.
    ///
    /// # Errors
    ///
    /// [`MachineError::AddressRangeConflict`] cannot occur for the standard
    /// layout but is propagated from [`Machine::attach`].
    pub fn with_standard_devices<S, W>(
        config: MachineConfig,
        disk: S,
        console_input: Receiver<u8>,
        console_output: W,
    ) -> Result<Self, MachineError>
    where
        S: Read + Write + Seek + 'static,
        W: Write + 'static,
    {
        let mut machine = Self::new(config);
        let clock = LineClock::new(machine.config.clock_interval);
        let delay = machine.config.console_output_delay;
        let console = Console::with_delay(console_input, console_output, delay);
        machine.attach(CLOCK_REGISTERS, Box::new(clock))?;
        machine.attach(CONSOLE_REGISTERS, Box::new(console))?;
        machine.attach(DISK_REGISTERS, Box::new(Disk::new(disk)))?;
        machine.reset();
        Ok(machine)
    }

    /// Attaches a device to a window of the I/O page.
    ///
    /// # Errors
    ///
    /// [`MachineError::AddressRangeConflict`] on overlap.
    pub fn attach(
        &mut self,
        range: RangeInclusive<u32>,
        device: Box<dyn Device>,
    ) -> Result<(), MachineError> {
        self.cpu.bus_mut().attach(range, device)
    }

    /// Configuration the machine was built with.
    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Processor.
    #[must_use]
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Processor, mutably.
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Power-on reset of processor and devices.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// One instruction, one device step, one interrupt decision.
    ///
    /// # Errors
    ///
    /// Any fatal [`MachineError`]; the processor state is left as it was
    /// when the error occurred.
    pub fn cycle(&mut self) -> Result<CycleOutcome, MachineError> {
        let step = self.cpu.step()?;
        self.cpu.step_devices()?;
        let interrupt = self.cpu.service_interrupt()?;
        Ok(CycleOutcome { step, interrupt })
    }

    /// Cycles until the processor halts or `limit` cycles have run.
    ///
    /// # Errors
    ///
    /// The first fatal [`MachineError`], after logging a diagnostic dump.
    pub fn run(&mut self, limit: Option<u64>) -> Result<RunOutcome, MachineError> {
        let mut cycles = 0_u64;
        let mut final_step = StepOutcome::Retired;
        loop {
            if limit.is_some_and(|limit| cycles >= limit) {
                break;
            }
            if self.cpu.run_state() == RunState::Halted {
                final_step = StepOutcome::Halted;
                break;
            }
            match self.cycle() {
                Ok(outcome) => final_step = outcome.step,
                Err(error) => {
                    log::error!("fatal: {error}\n{}", self.cpu.diagnostics());
                    return Err(error);
                }
            }
            cycles += 1;
        }
        log::info!("stopped after {cycles} cycles: {final_step:?}");
        Ok(RunOutcome { cycles, final_step })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::mpsc;

    use super::Machine;
    use crate::api::{MachineConfig, StepOutcome};
    use crate::state::{GeneralRegister, RunState};

    #[test]
    fn boots_block_zero_from_disk_and_runs_it() {
        // MOV #1234, R0 ; HALT
        let mut image = vec![0_u8; 512];
        for (i, word) in [0o012_700_u16, 0o1234, 0].iter().enumerate() {
            image[2 * i..2 * i + 2].copy_from_slice(&word.to_le_bytes());
        }
        let (_tx, rx) = mpsc::channel();
        let disk = Cursor::new(image);
        let mut machine =
            Machine::with_standard_devices(MachineConfig::default(), disk, rx, Vec::new()).unwrap();

        let outcome = machine.run(Some(10_000)).unwrap();

        assert_eq!(outcome.final_step, StepOutcome::Halted);
        assert_eq!(machine.cpu().registers().get(GeneralRegister::R0), 0o1234);
        assert_eq!(machine.cpu().registers().pc(), 0o6);
    }

    #[test]
    fn run_respects_cycle_limit() {
        let mut machine = Machine::new(MachineConfig::default());
        // BR .
        machine.cpu_mut().bus_mut().memory_mut().load(0o2002, &[0o000_777]).unwrap();
        let outcome = machine.run(Some(25)).unwrap();
        assert_eq!(outcome.cycles, 25);
        assert_eq!(outcome.final_step, StepOutcome::Retired);
    }

    #[test]
    fn halt_cycle_does_not_take_pending_interrupt() {
        let mut machine = Machine::new(MachineConfig::default());
        let cpu = machine.cpu_mut();
        cpu.bus_mut().memory_mut().load(0o2002, &[0o000_000]).unwrap();
        cpu.bus_mut().memory_mut().load(0o100, &[0o4000, 0o340]).unwrap();
        cpu.registers_mut().set_sp(0o1000);
        cpu.interrupt(0o100, 6).unwrap();

        let outcome = machine.cycle().unwrap();

        assert_eq!(outcome.step, StepOutcome::Halted);
        assert_eq!(outcome.interrupt, None);
        assert_eq!(machine.cpu().run_state(), RunState::Halted);
        assert_eq!(machine.cpu().registers().pc(), 0o2004);
        assert_eq!(machine.cpu().registers().sp(), 0o1000);
        assert_eq!(machine.cpu().interrupts().len(), 1);
    }
}
