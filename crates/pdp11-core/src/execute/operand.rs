//! Operand resolution for the eight addressing modes, virtual memory access
//! and the kernel-visible stack helpers.

use crate::decoder::{AddressingMode, OperandSpec};
use crate::encoding::OperandSize;
use crate::mmu::AccessKind;
use crate::state::{GeneralRegister, Mode};
use crate::{Cpu, TrapCause};

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A general register.
    Register(GeneralRegister),
    /// A virtual address in the current mode.
    Memory(u16),
}

impl Cpu {
    /// Reads a word at virtual address `va` as seen from `mode`.
    ///
    /// # Errors
    ///
    /// [`TrapCause::MemoryManagement`] if translation refuses the access,
    /// [`TrapCause::BusError`] if the physical access fails.
    pub fn read_virtual16(&mut self, va: u16, mode: Mode) -> Result<u16, TrapCause> {
        let pa = self.mmu.translate(va, mode, AccessKind::Read)?;
        self.read_physical16(pa)
    }

    /// Writes a word at virtual address `va` as seen from `mode`.
    ///
    /// # Errors
    ///
    /// As [`Cpu::read_virtual16`].
    pub fn write_virtual16(&mut self, va: u16, mode: Mode, value: u16) -> Result<(), TrapCause> {
        let pa = self.mmu.translate(va, mode, AccessKind::Write)?;
        self.write_physical16(pa, value)
    }

    /// Reads a byte at virtual address `va` as seen from `mode`.
    ///
    /// # Errors
    ///
    /// As [`Cpu::read_virtual16`].
    pub fn read_virtual8(&mut self, va: u16, mode: Mode) -> Result<u8, TrapCause> {
        let pa = self.mmu.translate(va, mode, AccessKind::Read)?;
        self.read_physical8(pa)
    }

    /// Writes a byte at virtual address `va` as seen from `mode`.
    ///
    /// # Errors
    ///
    /// As [`Cpu::read_virtual16`].
    pub fn write_virtual8(&mut self, va: u16, mode: Mode, value: u8) -> Result<(), TrapCause> {
        let pa = self.mmu.translate(va, mode, AccessKind::Write)?;
        self.write_physical8(pa, value)
    }

    /// Pushes a word onto the current mode's stack.
    pub(crate) fn push(&mut self, value: u16) -> Result<(), TrapCause> {
        let sp = self.regs.sp().wrapping_sub(2);
        self.regs.set_sp(sp);
        self.write_virtual16(sp, self.psw.current_mode(), value)
    }

    /// Pops a word from the current mode's stack.
    pub(crate) fn pop(&mut self) -> Result<u16, TrapCause> {
        let sp = self.regs.sp();
        let value = self.read_virtual16(sp, self.psw.current_mode())?;
        self.regs.set_sp(sp.wrapping_add(2));
        Ok(value)
    }

    /// Reads the word at PC and advances PC past it.
    pub(crate) fn fetch_word(&mut self) -> Result<u16, TrapCause> {
        let pc = self.regs.pc();
        let word = self.read_virtual16(pc, self.psw.current_mode())?;
        self.regs.set_pc(pc.wrapping_add(2));
        Ok(word)
    }

    /// Resolves an operand specifier, applying its register side effects
    /// (auto-increment, auto-decrement, index word fetch).
    ///
    /// Byte operations step `R0..R5` by one and `SP`/`PC` by two.
    ///
    /// # Errors
    ///
    /// Traps raised while reading an index word or a deferred pointer.
    pub fn fetch_operand(
        &mut self,
        spec: OperandSpec,
        size: OperandSize,
    ) -> Result<Operand, TrapCause> {
        let reg = spec.register;
        let step = if size == OperandSize::Byte && !reg.is_word_stepped() {
            1
        } else {
            2
        };
        let mode = self.psw.current_mode();
        let address = match spec.mode {
            AddressingMode::Register => return Ok(Operand::Register(reg)),
            AddressingMode::RegisterDeferred => self.regs.get(reg),
            AddressingMode::AutoIncrement => {
                let address = self.regs.get(reg);
                self.regs.set(reg, address.wrapping_add(step));
                address
            }
            AddressingMode::AutoIncrementDeferred => {
                let pointer = self.regs.get(reg);
                self.regs.set(reg, pointer.wrapping_add(2));
                self.read_virtual16(pointer, mode)?
            }
            AddressingMode::AutoDecrement => {
                let address = self.regs.get(reg).wrapping_sub(step);
                self.regs.set(reg, address);
                address
            }
            AddressingMode::AutoDecrementDeferred => {
                let pointer = self.regs.get(reg).wrapping_sub(2);
                self.regs.set(reg, pointer);
                self.read_virtual16(pointer, mode)?
            }
            AddressingMode::Index => {
                let index = self.fetch_word()?;
                self.regs.get(reg).wrapping_add(index)
            }
            AddressingMode::IndexDeferred => {
                let index = self.fetch_word()?;
                let pointer = self.regs.get(reg).wrapping_add(index);
                self.read_virtual16(pointer, mode)?
            }
        };
        Ok(Operand::Memory(address))
    }

    /// Reads a resolved operand. Byte reads return the value zero-extended.
    ///
    /// # Errors
    ///
    /// Traps raised by the memory access.
    pub fn read_operand(&mut self, operand: Operand, size: OperandSize) -> Result<u16, TrapCause> {
        match (operand, size) {
            (Operand::Register(reg), OperandSize::Word) => Ok(self.regs.get(reg)),
            (Operand::Register(reg), OperandSize::Byte) => Ok(self.regs.get(reg) & 0xFF),
            (Operand::Memory(va), OperandSize::Word) => {
                self.read_virtual16(va, self.psw.current_mode())
            }
            (Operand::Memory(va), OperandSize::Byte) => {
                self.read_virtual8(va, self.psw.current_mode()).map(u16::from)
            }
        }
    }

    /// Writes a resolved operand. Byte writes to a register replace only its low byte.
    ///
    /// # Errors
    ///
    /// Traps raised by the memory access.
    pub fn write_operand(
        &mut self,
        operand: Operand,
        size: OperandSize,
        value: u16,
    ) -> Result<(), TrapCause> {
        match (operand, size) {
            (Operand::Register(reg), OperandSize::Word) => {
                self.regs.set(reg, value);
                Ok(())
            }
            (Operand::Register(reg), OperandSize::Byte) => {
                let merged = (self.regs.get(reg) & 0xFF00) | (value & 0xFF);
                self.regs.set(reg, merged);
                Ok(())
            }
            (Operand::Memory(va), OperandSize::Word) => {
                self.write_virtual16(va, self.psw.current_mode(), value)
            }
            (Operand::Memory(va), OperandSize::Byte) => {
                #[allow(clippy::cast_possible_truncation)]
                let byte = (value & 0xFF) as u8;
                self.write_virtual8(va, self.psw.current_mode(), byte)
            }
        }
    }
}
