//! Power-on state and the RK05 bootstrap loader.

use crate::state::{Psw, RegisterFile, RunState};
use crate::Cpu;

/// Load address of the bootstrap.
pub const BOOT_ROM_BASE: u32 = 0o2000;
/// Initial PC; the first word at [`BOOT_ROM_BASE`] is a signature.
pub const BOOT_ENTRY: u16 = 0o2002;

/// Reads block 0 of drive 0 into address 0 and jumps to it.
pub const BOOT_ROM: [u16; 29] = [
    0o042_113, // "KD"
    0o012_706, 0o2000, // MOV #boot_start, SP
    0o012_700, 0o000_000, // MOV #unit, R0
    0o010_003, // MOV R0, R3
    0o000_303, // SWAB R3
    0o006_303, // ASL R3
    0o006_303, // ASL R3
    0o006_303, // ASL R3
    0o006_303, // ASL R3
    0o006_303, // ASL R3
    0o012_701, 0o177_412, // MOV #RKDA, R1
    0o010_311, // MOV R3, (R1)
    0o005_041, // CLR -(R1)
    0o012_741, 0o177_000, // MOV #-256.*2, -(R1)
    0o012_741, 0o000_005, // MOV #READ+GO, -(R1)
    0o005_002, // CLR R2
    0o005_003, // CLR R3
    0o012_704, 0o2020, // MOV #START+20, R4
    0o005_005, // CLR R5
    0o105_711, // TSTB (R1)
    0o100_376, // BPL .-2
    0o105_011, // CLRB (R1)
    0o005_007, // CLR PC
];

impl Cpu {
    /// Power-on reset: clears registers, PSW, MMU and pending interrupts,
    /// resets every device, loads the bootstrap and points PC at it.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::default();
        self.psw = Psw::default();
        self.mmu.reset();
        self.interrupts.clear();
        self.run_state = RunState::Running;
        self.bus.reset_devices();
        if let Err(cause) = self.bus.memory_mut().load(BOOT_ROM_BASE, &BOOT_ROM) {
            log::error!("bootstrap load failed: {cause}");
        }
        self.regs.set_pc(BOOT_ENTRY);
        log::debug!("reset: bootstrap at {BOOT_ROM_BASE:06o}, pc {BOOT_ENTRY:06o}");
    }
}

#[cfg(test)]
mod tests {
    use super::{BOOT_ENTRY, BOOT_ROM, BOOT_ROM_BASE};
    use crate::state::{GeneralRegister, RunState};
    use crate::Cpu;

    #[test]
    fn reset_loads_bootstrap_and_clears_state() {
        let mut cpu = Cpu::new();
        cpu.registers_mut().set(GeneralRegister::R3, 0o7777);
        cpu.set_run_state(RunState::Halted);
        cpu.interrupt(0o60, 4).unwrap();

        cpu.reset();

        assert_eq!(cpu.registers().pc(), BOOT_ENTRY);
        assert_eq!(cpu.registers().get(GeneralRegister::R3), 0);
        assert_eq!(cpu.psw().raw(), 0);
        assert_eq!(cpu.run_state(), RunState::Running);
        assert!(cpu.interrupts().is_empty());
        for (offset, word) in (0_u32..).zip(BOOT_ROM) {
            assert_eq!(cpu.bus().memory().read16(BOOT_ROM_BASE + 2 * offset), Ok(word));
        }
    }
}
