//! Branches, subroutine linkage, privileged and processor-status instructions.

use super::operand::Operand;
use crate::decoder::DecodedInstruction;
use crate::encoding::{Opcode, OperandSize};
use crate::state::{GeneralRegister, Mode, Psw, RunState, PSW_PRIORITY_MASK};
use crate::{Cpu, Fault, MachineError, TrapCause};

const MODE_FIELDS: u16 = 0o170_000;

/// Whether `opcode` branches under the condition codes in `psw`.
#[must_use]
pub const fn branch_taken(opcode: Opcode, psw: Psw) -> bool {
    let (n, z, v, c) = (psw.n(), psw.z(), psw.v(), psw.c());
    match opcode {
        Opcode::Br => true,
        Opcode::Bne => !z,
        Opcode::Beq => z,
        Opcode::Bge => n == v,
        Opcode::Blt => n != v,
        Opcode::Bgt => !z && n == v,
        Opcode::Ble => z || n != v,
        Opcode::Bpl => !n,
        Opcode::Bmi => n,
        Opcode::Bhi => !c && !z,
        Opcode::Blos => c || z,
        Opcode::Bvc => !v,
        Opcode::Bvs => v,
        Opcode::Bcc => !c,
        Opcode::Bcs => c,
        _ => false,
    }
}

impl Cpu {
    fn memory_target(&mut self, instr: DecodedInstruction) -> Result<u16, Fault> {
        match self.fetch_operand(instr.destination(), OperandSize::Word)? {
            Operand::Memory(address) => Ok(address),
            Operand::Register(_) => Err(MachineError::RegisterOperand {
                instruction: instr.word,
                pc: self.last_pc(),
            }
            .into()),
        }
    }

    pub(super) fn op_branch(&mut self, instr: DecodedInstruction) {
        if branch_taken(instr.opcode, self.psw) {
            let target = self.regs.pc().wrapping_add(instr.branch_offset());
            self.regs.set_pc(target);
        }
    }

    pub(super) fn op_jmp(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let target = self.memory_target(instr)?;
        self.regs.set_pc(target);
        Ok(())
    }

    pub(super) fn op_jsr(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let link = instr.register();
        let target = self.memory_target(instr)?;
        self.push(self.regs.get(link))?;
        self.regs.set(link, self.regs.pc());
        self.regs.set_pc(target);
        Ok(())
    }

    pub(super) fn op_rts(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let link = instr.low_register();
        self.regs.set_pc(self.regs.get(link));
        let saved = self.pop()?;
        self.regs.set(link, saved);
        Ok(())
    }

    pub(super) fn op_mark(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let sp = self.regs.pc().wrapping_add(2 * instr.low_six());
        self.regs.set_sp(sp);
        self.regs.set_pc(self.regs.get(GeneralRegister::R5));
        let frame = self.pop()?;
        self.regs.set(GeneralRegister::R5, frame);
        Ok(())
    }

    pub(super) fn op_mfpi(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let previous = self.psw.previous_mode();
        let current = self.psw.current_mode();
        let value = match self.fetch_operand(instr.destination(), OperandSize::Word)? {
            Operand::Register(GeneralRegister::R6) => self.regs.stack_pointer(previous, current),
            Operand::Register(reg) => self.regs.get(reg),
            Operand::Memory(va) => self.read_virtual16(va, previous)?,
        };
        self.push(value)?;
        self.set_move_flags(value);
        Ok(())
    }

    pub(super) fn op_mtpi(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let previous = self.psw.previous_mode();
        let current = self.psw.current_mode();
        let destination = self.fetch_operand(instr.destination(), OperandSize::Word)?;
        let value = self.pop()?;
        match destination {
            Operand::Register(GeneralRegister::R6) => {
                self.regs.set_stack_pointer(previous, current, value);
            }
            Operand::Register(reg) => self.regs.set(reg, value),
            Operand::Memory(va) => self.write_virtual16(va, previous, value)?,
        }
        self.set_move_flags(value);
        Ok(())
    }

    fn set_move_flags(&mut self, value: u16) {
        self.psw.set_n(value & 0x8000 != 0);
        self.psw.set_z(value == 0);
        self.psw.set_v(false);
    }

    pub(super) fn op_rti(&mut self) -> Result<(), Fault> {
        let pc = self.pop()?;
        let mut raw = self.pop()?;
        let current = self.psw.current_mode();
        if !current.is_kernel() {
            raw = (raw & !PSW_PRIORITY_MASK) | (self.psw.raw() & PSW_PRIORITY_MASK);
            raw |= self.psw.raw() & MODE_FIELDS;
        }
        self.regs.set_pc(pc);
        self.load_psw(Psw::from_raw(raw));
        Ok(())
    }

    fn require_kernel(&self) -> Result<(), Fault> {
        if self.psw.current_mode() == Mode::Kernel {
            Ok(())
        } else {
            Err(TrapCause::IllegalInstruction.into())
        }
    }

    pub(super) fn op_halt(&mut self) -> Result<(), Fault> {
        self.require_kernel()?;
        log::info!("halt at {:06o}", self.last_pc());
        self.run_state = RunState::Halted;
        Ok(())
    }

    pub(super) fn op_wait(&mut self) -> Result<(), Fault> {
        self.require_kernel()?;
        self.run_state = RunState::Waiting;
        Ok(())
    }

    pub(super) fn op_reset(&mut self) -> Result<(), Fault> {
        if self.psw.current_mode() == Mode::Kernel {
            log::debug!("bus reset at {:06o}", self.last_pc());
            self.bus.reset_devices();
            self.interrupts.clear();
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn op_spl(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        if self.psw.current_mode() == Mode::Kernel {
            self.psw.set_priority((instr.word & 7) as u8);
        }
        Ok(())
    }

    pub(super) fn op_condition_codes(&mut self, instr: DecodedInstruction) {
        let codes = instr.word & 0o17;
        let current = self.psw.condition_codes();
        let updated = if instr.word & 0o20 != 0 {
            current | codes
        } else {
            current & !codes
        };
        self.psw.set_condition_codes(updated);
    }
}

#[cfg(test)]
mod tests {
    use super::branch_taken;
    use crate::encoding::Opcode;
    use crate::state::{GeneralRegister, Mode, Psw, RunState};
    use crate::{Cpu, MachineError, StepOutcome, TrapCause};

    fn cpu_with(program: &[u16]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.bus_mut().memory_mut().load(0o1000, program).unwrap();
        cpu.registers_mut().set_pc(0o1000);
        cpu.registers_mut().set_sp(0o700);
        cpu
    }

    #[test]
    fn signed_and_unsigned_branch_conditions() {
        let n = Psw::from_raw(0o10);
        assert!(branch_taken(Opcode::Blt, n));
        assert!(!branch_taken(Opcode::Bge, n));
        let nv = Psw::from_raw(0o12);
        assert!(branch_taken(Opcode::Bge, nv));
        let c = Psw::from_raw(0o1);
        assert!(branch_taken(Opcode::Blos, c));
        assert!(!branch_taken(Opcode::Bhi, c));
    }

    #[test]
    fn jsr_and_rts_link_through_register() {
        // JSR R5, @#2000 ; at 2000: RTS R5
        let mut cpu = cpu_with(&[0o004_537, 0o2000]);
        cpu.bus_mut().memory_mut().load(0o2000, &[0o000_205]).unwrap();
        cpu.registers_mut().set(GeneralRegister::R5, 0o4444);
        cpu.step().unwrap();
        assert_eq!(cpu.registers().pc(), 0o2000);
        assert_eq!(cpu.registers().get(GeneralRegister::R5), 0o1004);
        assert_eq!(cpu.registers().sp(), 0o676);
        cpu.step().unwrap();
        assert_eq!(cpu.registers().pc(), 0o1004);
        assert_eq!(cpu.registers().get(GeneralRegister::R5), 0o4444);
        assert_eq!(cpu.registers().sp(), 0o700);
    }

    #[test]
    fn jump_to_register_is_fatal() {
        let mut cpu = cpu_with(&[0o000_101]);
        assert_eq!(
            cpu.step(),
            Err(MachineError::RegisterOperand {
                instruction: 0o000_101,
                pc: 0o1000
            })
        );
    }

    #[test]
    fn privileged_instructions_in_user_mode() {
        let mut cpu = cpu_with(&[0o000_005, 0o000_232, 0o000_000]);
        cpu.bus_mut().memory_mut().load(0o10, &[0o3000, 0]).unwrap();
        cpu.registers_mut().set_banked_sp(Mode::User, 0o600);
        cpu.load_psw(Psw::from_raw(0o140_000));

        assert_eq!(cpu.step(), Ok(StepOutcome::Retired));
        assert_eq!(cpu.step(), Ok(StepOutcome::Retired));
        assert_eq!(cpu.psw().priority(), 0);
        assert_eq!(cpu.step(), Ok(StepOutcome::Trapped(TrapCause::IllegalInstruction)));
        assert_eq!(cpu.run_state(), RunState::Running);
        assert_eq!(cpu.current_mode(), Mode::Kernel);
        assert_eq!(cpu.psw().previous_mode(), Mode::User);
    }

    #[test]
    fn user_rti_cannot_raise_priority_or_leave_user_mode() {
        let mut cpu = cpu_with(&[0o000_002]);
        cpu.bus_mut().memory_mut().load(0o600, &[0o1234, 0o000_357]).unwrap();
        cpu.registers_mut().set_banked_sp(Mode::User, 0o600);
        cpu.load_psw(Psw::from_raw(0o170_000));
        cpu.step().unwrap();
        assert_eq!(cpu.registers().pc(), 0o1234);
        assert_eq!(cpu.psw().raw(), 0o170_017);
    }

    #[test]
    fn mfpi_reads_previous_mode_stack_pointer() {
        // MFPI SP with previous mode user
        let mut cpu = cpu_with(&[0o006_506]);
        cpu.registers_mut().set_banked_sp(Mode::User, 0o5555);
        cpu.load_psw(Psw::from_raw(0o030_000));
        cpu.step().unwrap();
        assert_eq!(cpu.registers().sp(), 0o676);
        assert_eq!(cpu.bus().memory().read16(0o676), Ok(0o5555));
    }

    #[test]
    fn mtpi_writes_previous_mode_stack_pointer() {
        let mut cpu = cpu_with(&[0o006_606]);
        cpu.bus_mut().memory_mut().load(0o676, &[0o4321]).unwrap();
        cpu.registers_mut().set_sp(0o676);
        cpu.load_psw(Psw::from_raw(0o030_000));
        cpu.step().unwrap();
        assert_eq!(cpu.registers().banked_sp(Mode::User), 0o4321);
        assert_eq!(cpu.registers().sp(), 0o700);
    }

    #[test]
    fn condition_code_operators_set_and_clear() {
        let mut cpu = cpu_with(&[0o000_277, 0o000_242]);
        cpu.step().unwrap();
        assert_eq!(cpu.psw().condition_codes(), 0o17);
        cpu.step().unwrap();
        assert_eq!(cpu.psw().condition_codes(), 0o15);
    }

    #[test]
    fn wait_idles_until_interrupt() {
        let mut cpu = cpu_with(&[0o000_001]);
        assert_eq!(cpu.step(), Ok(StepOutcome::Waiting));
        assert_eq!(cpu.step(), Ok(StepOutcome::Waiting));
        assert_eq!(cpu.registers().pc(), 0o1002);
    }
}
