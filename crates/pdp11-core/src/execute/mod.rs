//! Instruction engine: fetch, decode and execute one instruction per step.
//!
//! Every instruction either retires, raises a guest-visible trap that is
//! dispatched before `step` returns, or reports a fatal [`MachineError`].
//! Register side effects of operand resolution are not rolled back when a
//! later access in the same instruction traps.

mod alu;
mod control;
mod flags;
mod operand;

pub use flags::FlagsUpdate;
pub use operand::Operand;

use crate::decoder::{DecodedInstruction, Decoder};
use crate::diag::TrapCounters;
use crate::encoding::Opcode;
use crate::interrupt::InterruptController;
use crate::memory::Unibus;
use crate::mmu::Mmu;
use crate::state::{Mode, Psw, RegisterFile, RunState};
use crate::{Fault, MachineError, StepOutcome, TrapCause};

/// The processor: registers, status word, MMU, bus and interrupt table.
#[derive(Debug, Default)]
pub struct Cpu {
    pub(crate) regs: RegisterFile,
    pub(crate) psw: Psw,
    pub(crate) mmu: Mmu,
    pub(crate) bus: Unibus,
    pub(crate) interrupts: InterruptController,
    pub(crate) run_state: RunState,
    last_pc: u16,
    last_instruction: u16,
    trace_instructions: bool,
    counters: TrapCounters,
}

impl Cpu {
    /// Processor with zeroed memory and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor on an existing bus.
    #[must_use]
    pub fn with_bus(bus: Unibus) -> Self {
        Self {
            bus,
            ..Self::default()
        }
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// Register file, mutably.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Processor status word.
    #[must_use]
    pub const fn psw(&self) -> Psw {
        self.psw
    }

    /// Current processor mode.
    #[must_use]
    pub const fn current_mode(&self) -> Mode {
        self.psw.current_mode()
    }

    /// Replaces the status word, re-banking `R6` if the current mode changes.
    pub fn load_psw(&mut self, psw: Psw) {
        let from = self.psw.current_mode();
        let to = psw.current_mode();
        if from != to {
            self.regs.switch_stack(from, to);
        }
        self.psw = psw;
    }

    /// Enters `mode`, recording the outgoing mode as previous.
    pub(crate) fn switch_mode(&mut self, mode: Mode) {
        let from = self.psw.current_mode();
        let mut psw = self.psw;
        psw.set_previous_mode(from);
        psw.set_current_mode(mode);
        self.load_psw(psw);
    }

    /// Memory management unit.
    #[must_use]
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// Memory management unit, mutably.
    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    /// Unibus with memory and devices.
    #[must_use]
    pub const fn bus(&self) -> &Unibus {
        &self.bus
    }

    /// Unibus, mutably.
    pub fn bus_mut(&mut self) -> &mut Unibus {
        &mut self.bus
    }

    /// Pending interrupt table.
    #[must_use]
    pub const fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    /// Current run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Forces the run state, e.g. to resume after `HALT` from a debugger.
    pub fn set_run_state(&mut self, state: RunState) {
        self.run_state = state;
    }

    /// Enables per-fetch `trace!` records.
    pub fn set_trace_instructions(&mut self, on: bool) {
        self.trace_instructions = on;
    }

    /// Address of the most recently fetched instruction.
    #[must_use]
    pub const fn last_pc(&self) -> u16 {
        self.last_pc
    }

    /// Most recently fetched instruction word.
    #[must_use]
    pub const fn last_instruction(&self) -> u16 {
        self.last_instruction
    }

    /// Instruction, trap and interrupt counts since construction.
    #[must_use]
    pub const fn counters(&self) -> TrapCounters {
        self.counters
    }

    pub(crate) fn count_interrupt(&mut self) {
        self.counters.interrupts = self.counters.interrupts.saturating_add(1);
    }

    /// Advances every device by one step.
    ///
    /// # Errors
    ///
    /// Fatal errors raised by a device.
    pub fn step_devices(&mut self) -> Result<(), MachineError> {
        self.bus.step_devices(&mut self.interrupts)
    }

    /// Executes one instruction, dispatching any trap it raises.
    ///
    /// Halted and waiting processors do nothing and report their state.
    ///
    /// # Errors
    ///
    /// Fatal conditions: a trap during trap dispatch, a jump to a register,
    /// or an invalid vector.
    pub fn step(&mut self) -> Result<StepOutcome, MachineError> {
        match self.run_state {
            RunState::Halted => return Ok(StepOutcome::Halted),
            RunState::Waiting => return Ok(StepOutcome::Waiting),
            RunState::Running => {}
        }
        match self.execute_next() {
            Ok(()) => Ok(match self.run_state {
                RunState::Running => StepOutcome::Retired,
                RunState::Waiting => StepOutcome::Waiting,
                RunState::Halted => StepOutcome::Halted,
            }),
            Err(Fault::Trap(cause)) => {
                log::debug!(
                    "trap {cause} ({:03o}) at {:06o}, instruction {:06o}",
                    cause.vector(),
                    self.last_pc,
                    self.last_instruction
                );
                self.counters.record_trap(cause);
                self.trap_at(cause.vector())?;
                Ok(StepOutcome::Trapped(cause))
            }
            Err(Fault::Fatal(error)) => Err(error),
        }
    }

    fn execute_next(&mut self) -> Result<(), Fault> {
        let pc = self.regs.pc();
        self.last_pc = pc;
        self.mmu.note_fetch(pc);
        self.counters.instructions = self.counters.instructions.saturating_add(1);
        let word = self.fetch_word()?;
        self.last_instruction = word;
        let Some(instr) = Decoder::decode(word) else {
            log::debug!("reserved instruction {word:06o} at {pc:06o}");
            return Err(TrapCause::IllegalInstruction.into());
        };
        if self.trace_instructions {
            log::trace!(
                "{pc:06o} {word:06o} {:?} psw {:06o} sp {:06o}",
                instr.opcode,
                self.psw.raw(),
                self.regs.sp()
            );
        }
        self.execute(instr)
    }

    fn execute(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        match instr.opcode {
            Opcode::Mov => self.op_mov(instr),
            Opcode::Cmp => self.op_cmp(instr),
            Opcode::Bit => self.op_bit(instr),
            Opcode::Bic => self.op_bic(instr),
            Opcode::Bis => self.op_bis(instr),
            Opcode::Add => self.op_add(instr),
            Opcode::Sub => self.op_sub(instr),
            Opcode::Clr => self.op_clr(instr),
            Opcode::Com => self.op_com(instr),
            Opcode::Inc => self.op_inc(instr),
            Opcode::Dec => self.op_dec(instr),
            Opcode::Neg => self.op_neg(instr),
            Opcode::Adc => self.op_adc(instr),
            Opcode::Sbc => self.op_sbc(instr),
            Opcode::Tst => self.op_tst(instr),
            Opcode::Ror => self.op_ror(instr),
            Opcode::Rol => self.op_rol(instr),
            Opcode::Asr => self.op_asr(instr),
            Opcode::Asl => self.op_asl(instr),
            Opcode::Swab => self.op_swab(instr),
            Opcode::Sxt => self.op_sxt(instr),
            Opcode::Mul => self.op_mul(instr),
            Opcode::Div => self.op_div(instr),
            Opcode::Ash => self.op_ash(instr),
            Opcode::Ashc => self.op_ashc(instr),
            Opcode::Xor => self.op_xor(instr),
            Opcode::Sob => self.op_sob(instr),
            Opcode::Jmp => self.op_jmp(instr),
            Opcode::Jsr => self.op_jsr(instr),
            Opcode::Rts => self.op_rts(instr),
            Opcode::Mark => self.op_mark(instr),
            Opcode::Mfpi => self.op_mfpi(instr),
            Opcode::Mtpi => self.op_mtpi(instr),
            Opcode::Rti | Opcode::Rtt => self.op_rti(),
            Opcode::Halt => self.op_halt(),
            Opcode::Wait => self.op_wait(),
            Opcode::Reset => self.op_reset(),
            Opcode::Spl => self.op_spl(instr),
            Opcode::Ccc | Opcode::Scc => {
                self.op_condition_codes(instr);
                Ok(())
            }
            Opcode::Setd => Ok(()),
            Opcode::Bpt => Err(TrapCause::Breakpoint.into()),
            Opcode::Iot => Err(TrapCause::Iot.into()),
            Opcode::Emt => Err(TrapCause::Emt.into()),
            Opcode::Trap => Err(TrapCause::Trap.into()),
            Opcode::Br
            | Opcode::Bne
            | Opcode::Beq
            | Opcode::Bge
            | Opcode::Blt
            | Opcode::Bgt
            | Opcode::Ble
            | Opcode::Bpl
            | Opcode::Bmi
            | Opcode::Bhi
            | Opcode::Blos
            | Opcode::Bvc
            | Opcode::Bvs
            | Opcode::Bcc
            | Opcode::Bcs => {
                self.op_branch(instr);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cpu;
    use crate::state::{GeneralRegister, Mode, Psw, RunState};
    use crate::{StepOutcome, TrapCause};

    fn cpu_with(program: &[u16]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.bus_mut().memory_mut().load(0o1000, program).unwrap();
        cpu.registers_mut().set_pc(0o1000);
        cpu.registers_mut().set_sp(0o700);
        cpu
    }

    #[test]
    fn mov_immediate_sets_register_and_flags() {
        let mut cpu = cpu_with(&[0o012_700, 0o100_000]);
        assert_eq!(cpu.step(), Ok(StepOutcome::Retired));
        assert_eq!(cpu.registers().get(GeneralRegister::R0), 0o100_000);
        assert!(cpu.psw().n());
        assert_eq!(cpu.registers().pc(), 0o1004);
    }

    #[test]
    fn movb_to_register_sign_extends() {
        let mut cpu = cpu_with(&[0o112_700, 0o200]);
        cpu.step().unwrap();
        assert_eq!(cpu.registers().get(GeneralRegister::R0), 0o177_600);
    }

    #[test]
    fn reserved_instruction_traps_through_010() {
        let mut cpu = cpu_with(&[0o000_007]);
        cpu.bus_mut().memory_mut().load(0o10, &[0o3000, 0o340]).unwrap();
        assert_eq!(cpu.step(), Ok(StepOutcome::Trapped(TrapCause::IllegalInstruction)));
        assert_eq!(cpu.registers().pc(), 0o3000);
        assert_eq!(cpu.psw().priority(), 7);
        assert_eq!(cpu.registers().sp(), 0o674);
    }

    #[test]
    fn psw_mode_change_rebanks_stack_pointer() {
        let mut cpu = Cpu::new();
        cpu.registers_mut().set_sp(0o1000);
        cpu.registers_mut().set_banked_sp(Mode::User, 0o2000);
        cpu.load_psw(Psw::from_raw(0o140_000));
        assert_eq!(cpu.registers().sp(), 0o2000);
        assert_eq!(cpu.registers().banked_sp(Mode::Kernel), 0o1000);
    }

    #[test]
    fn halted_processor_does_not_fetch() {
        let mut cpu = cpu_with(&[0o000_000, 0o005_200]);
        assert_eq!(cpu.step(), Ok(StepOutcome::Halted));
        assert_eq!(cpu.run_state(), RunState::Halted);
        assert_eq!(cpu.step(), Ok(StepOutcome::Halted));
        assert_eq!(cpu.registers().pc(), 0o1002);
    }
}
