//! Trap and interrupt dispatch through the low-memory vector table.

use crate::interrupt::InterruptRequest;
use crate::state::{Mode, Psw, RunState};
use crate::{Cpu, MachineError, TrapCause};

impl Cpu {
    /// Vectors through `vector`: enters kernel mode, pushes the old PSW and
    /// PC on the kernel stack, then loads PC and PSW from `vector` and
    /// `vector + 2`. The new PSW's previous-mode field records the mode the
    /// processor was in.
    ///
    /// # Errors
    ///
    /// - [`MachineError::OddVector`] for an odd vector.
    /// - [`MachineError::DoubleFault`] if any access during dispatch traps.
    pub fn trap_at(&mut self, vector: u16) -> Result<(), MachineError> {
        if vector & 1 != 0 {
            log::error!("odd vector {vector:06o}");
            return Err(MachineError::OddVector { vector });
        }
        let saved = self.psw;
        self.switch_mode(Mode::Kernel);
        self.vector_through(vector, saved).map_err(|nested| {
            log::error!("{nested} while vectoring through {vector:06o}");
            MachineError::DoubleFault { vector, nested }
        })
    }

    fn vector_through(&mut self, vector: u16, saved: Psw) -> Result<(), TrapCause> {
        self.push(saved.raw())?;
        self.push(self.regs.pc())?;
        let pc = self.read_virtual16(vector, Mode::Kernel)?;
        let psw = self.read_virtual16(vector.wrapping_add(2), Mode::Kernel)?;
        self.regs.set_pc(pc);
        self.load_psw(Psw::from_raw(psw).with_previous_mode(saved.current_mode()));
        Ok(())
    }

    /// Queues an interrupt request.
    ///
    /// # Errors
    ///
    /// See [`crate::InterruptController::interrupt`].
    pub fn interrupt(&mut self, vector: u8, priority: u8) -> Result<(), MachineError> {
        self.interrupts.interrupt(vector, priority)
    }

    /// Delivers the highest-ranked pending request if its priority exceeds
    /// the processor priority. A waiting processor resumes; a halted one
    /// accepts nothing and the request stays queued.
    ///
    /// # Errors
    ///
    /// Fatal errors from [`Cpu::trap_at`].
    pub fn service_interrupt(&mut self) -> Result<Option<InterruptRequest>, MachineError> {
        if self.run_state == RunState::Halted {
            return Ok(None);
        }
        let Some(request) = self.interrupts.eligible(self.psw.priority()) else {
            return Ok(None);
        };
        log::debug!(
            "interrupt vector {:03o} priority {} at pc {:06o}",
            request.vector,
            request.priority,
            self.regs.pc()
        );
        self.trap_at(u16::from(request.vector))?;
        self.interrupts.pop();
        self.count_interrupt();
        if self.run_state == RunState::Waiting {
            self.run_state = RunState::Running;
        }
        Ok(Some(request))
    }
}
