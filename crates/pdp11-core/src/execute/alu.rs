//! Data-manipulating instructions: double-operand, single-operand and the
//! extended instruction set.

use super::flags::FlagsUpdate;
use super::operand::Operand;
use crate::decoder::DecodedInstruction;
use crate::encoding::OperandSize;
use crate::state::GeneralRegister;
use crate::{Cpu, Fault};

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn sign_extend_byte(value: u16) -> u16 {
    value as u8 as i8 as i16 as u16
}

impl Cpu {
    fn source_and_destination(
        &mut self,
        instr: DecodedInstruction,
    ) -> Result<(u16, Operand, u16), Fault> {
        let size = instr.size;
        let source = self.fetch_operand(instr.source(), size)?;
        let src = self.read_operand(source, size)?;
        let destination = self.fetch_operand(instr.destination(), size)?;
        let dst = self.read_operand(destination, size)?;
        Ok((src, destination, dst))
    }

    fn destination_value(&mut self, instr: DecodedInstruction) -> Result<(Operand, u16), Fault> {
        let destination = self.fetch_operand(instr.destination(), instr.size)?;
        let value = self.read_operand(destination, instr.size)?;
        Ok((destination, value))
    }

    fn commit(
        &mut self,
        operand: Operand,
        size: OperandSize,
        result: u16,
        update: FlagsUpdate,
    ) -> Result<(), Fault> {
        update.apply(&mut self.psw);
        self.write_operand(operand, size, result)?;
        Ok(())
    }

    pub(super) fn op_mov(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let source = self.fetch_operand(instr.source(), size)?;
        let value = self.read_operand(source, size)?;
        let destination = self.fetch_operand(instr.destination(), size)?;
        FlagsUpdate::logical(value, size).apply(&mut self.psw);
        match (destination, size) {
            (Operand::Register(reg), OperandSize::Byte) => {
                self.regs.set(reg, sign_extend_byte(value));
            }
            _ => self.write_operand(destination, size, value)?,
        }
        Ok(())
    }

    pub(super) fn op_cmp(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (src, _, dst) = self.source_and_destination(instr)?;
        let sign = size.sign_bit();
        let result = src.wrapping_sub(dst) & size.mask();
        let overflow = (src ^ dst) & sign != 0 && (dst ^ result) & sign == 0;
        FlagsUpdate::arithmetic(result, size, overflow, src < dst).apply(&mut self.psw);
        Ok(())
    }

    pub(super) fn op_bit(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (src, _, dst) = self.source_and_destination(instr)?;
        FlagsUpdate::logical(src & dst, instr.size).apply(&mut self.psw);
        Ok(())
    }

    pub(super) fn op_bic(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (src, destination, dst) = self.source_and_destination(instr)?;
        let result = !src & dst & instr.size.mask();
        self.commit(destination, instr.size, result, FlagsUpdate::logical(result, instr.size))
    }

    pub(super) fn op_bis(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (src, destination, dst) = self.source_and_destination(instr)?;
        let result = src | dst;
        self.commit(destination, instr.size, result, FlagsUpdate::logical(result, instr.size))
    }

    pub(super) fn op_add(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (src, destination, dst) = self.source_and_destination(instr)?;
        let (result, carry) = dst.overflowing_add(src);
        let overflow = (src ^ dst) & 0x8000 == 0 && (dst ^ result) & 0x8000 != 0;
        let update = FlagsUpdate::arithmetic(result, OperandSize::Word, overflow, carry);
        self.commit(destination, OperandSize::Word, result, update)
    }

    pub(super) fn op_sub(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (src, destination, dst) = self.source_and_destination(instr)?;
        let (result, borrow) = dst.overflowing_sub(src);
        let overflow = (src ^ dst) & 0x8000 != 0 && (src ^ result) & 0x8000 == 0;
        let update = FlagsUpdate::arithmetic(result, OperandSize::Word, overflow, borrow);
        self.commit(destination, OperandSize::Word, result, update)
    }

    pub(super) fn op_clr(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let destination = self.fetch_operand(instr.destination(), instr.size)?;
        self.commit(
            destination,
            instr.size,
            0,
            FlagsUpdate::arithmetic(0, instr.size, false, false),
        )
    }

    pub(super) fn op_com(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = !value & size.mask();
        self.commit(destination, size, result, FlagsUpdate::arithmetic(result, size, false, true))
    }

    pub(super) fn op_inc(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = value.wrapping_add(1) & size.mask();
        let update = FlagsUpdate::with_overflow(result, size, result == size.sign_bit());
        self.commit(destination, size, result, update)
    }

    pub(super) fn op_dec(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = value.wrapping_sub(1) & size.mask();
        let update = FlagsUpdate::with_overflow(result, size, result == size.max_positive());
        self.commit(destination, size, result, update)
    }

    pub(super) fn op_neg(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = 0_u16.wrapping_sub(value) & size.mask();
        let update = FlagsUpdate::arithmetic(result, size, result == size.sign_bit(), result != 0);
        self.commit(destination, size, result, update)
    }

    pub(super) fn op_adc(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let carry_in = self.psw.c();
        let result = value.wrapping_add(u16::from(carry_in)) & size.mask();
        let update = FlagsUpdate::arithmetic(
            result,
            size,
            carry_in && value == size.max_positive(),
            carry_in && value == size.mask(),
        );
        self.commit(destination, size, result, update)
    }

    pub(super) fn op_sbc(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let borrow_in = self.psw.c();
        let result = value.wrapping_sub(u16::from(borrow_in)) & size.mask();
        let update = FlagsUpdate::arithmetic(
            result,
            size,
            borrow_in && value == size.sign_bit(),
            borrow_in && value == 0,
        );
        self.commit(destination, size, result, update)
    }

    pub(super) fn op_tst(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (_, value) = self.destination_value(instr)?;
        FlagsUpdate::arithmetic(value, instr.size, false, false).apply(&mut self.psw);
        Ok(())
    }

    pub(super) fn op_ror(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let high = if self.psw.c() { size.sign_bit() } else { 0 };
        let result = (value >> 1) | high;
        self.commit(destination, size, result, FlagsUpdate::shifted(result, size, value & 1 != 0))
    }

    pub(super) fn op_rol(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = ((value << 1) | u16::from(self.psw.c())) & size.mask();
        let carry = value & size.sign_bit() != 0;
        self.commit(destination, size, result, FlagsUpdate::shifted(result, size, carry))
    }

    pub(super) fn op_asr(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = (value >> 1) | (value & size.sign_bit());
        self.commit(destination, size, result, FlagsUpdate::shifted(result, size, value & 1 != 0))
    }

    pub(super) fn op_asl(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let size = instr.size;
        let (destination, value) = self.destination_value(instr)?;
        let result = (value << 1) & size.mask();
        let carry = value & size.sign_bit() != 0;
        self.commit(destination, size, result, FlagsUpdate::shifted(result, size, carry))
    }

    pub(super) fn op_swab(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let (destination, value) = self.destination_value(instr)?;
        let result = value.swap_bytes();
        let update = FlagsUpdate::arithmetic(result, OperandSize::Byte, false, false);
        self.commit(destination, OperandSize::Word, result, update)
    }

    pub(super) fn op_sxt(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let destination = self.fetch_operand(instr.destination(), OperandSize::Word)?;
        let negative = self.psw.n();
        self.psw.set_z(!negative);
        self.psw.set_v(false);
        let result = if negative { 0xFFFF } else { 0 };
        self.write_operand(destination, OperandSize::Word, result)?;
        Ok(())
    }

    pub(super) fn op_xor(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let register = self.regs.get(instr.register());
        let (destination, value) = self.destination_value(instr)?;
        let result = register ^ value;
        self.commit(
            destination,
            OperandSize::Word,
            result,
            FlagsUpdate::logical(result, OperandSize::Word),
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub(super) fn op_mul(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let reg = instr.register();
        let multiplicand = i32::from(self.regs.get(reg) as i16);
        let (_, value) = self.destination_value(instr)?;
        let product = multiplicand * i32::from(value as i16);
        self.regs.set(reg, (product >> 16) as u16);
        self.regs.set(reg.pair(), product as u16);
        self.psw.set_n(product < 0);
        self.psw.set_z(product == 0);
        self.psw.set_v(false);
        self.psw.set_c(i16::try_from(product).is_err());
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub(super) fn op_div(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let reg = instr.register();
        let dividend =
            (u32::from(self.regs.get(reg)) << 16 | u32::from(self.regs.get(reg.pair()))) as i32;
        let (_, value) = self.destination_value(instr)?;
        let divisor = i64::from(value as i16);
        self.psw.set_condition_codes(0);
        if divisor == 0 {
            self.psw.set_v(true);
            self.psw.set_c(true);
            return Ok(());
        }
        let quotient = i64::from(dividend) / divisor;
        let remainder = i64::from(dividend) % divisor;
        let Ok(quotient) = i16::try_from(quotient) else {
            self.psw.set_v(true);
            return Ok(());
        };
        self.regs.set(reg, quotient as u16);
        self.regs.set(reg.pair(), remainder as u16);
        self.psw.set_n(quotient < 0);
        self.psw.set_z(quotient == 0);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub(super) fn op_ash(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let reg = instr.register();
        let value = self.regs.get(reg);
        let (_, count) = self.destination_value(instr)?;
        let count = u32::from(count & 0o77);
        let (result, carry) = if count == 0 {
            (value, self.psw.c())
        } else if count & 0o40 != 0 {
            let shift = 0o100 - count;
            let wide = i32::from(value as i16);
            ((wide >> shift.min(31)) as u16, (wide >> (shift - 1)) & 1 != 0)
        } else {
            let wide = u32::from(value) << count;
            (wide as u16, (wide >> 16) & 1 != 0)
        };
        self.regs.set(reg, result);
        self.psw.set_n(result & 0x8000 != 0);
        self.psw.set_z(result == 0);
        self.psw.set_v((value ^ result) & 0x8000 != 0);
        self.psw.set_c(carry);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub(super) fn op_ashc(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let reg = instr.register();
        let value = u32::from(self.regs.get(reg)) << 16 | u32::from(self.regs.get(reg.pair()));
        let (_, count) = self.destination_value(instr)?;
        let count = u32::from(count & 0o77);
        let (result, carry) = if count == 0 {
            (value, self.psw.c())
        } else if count & 0o40 != 0 {
            let shift = 0o100 - count;
            let wide = i64::from(value as i32);
            ((wide >> shift) as u32, (wide >> (shift - 1)) & 1 != 0)
        } else {
            let wide = u64::from(value) << count;
            (wide as u32, (wide >> 32) & 1 != 0)
        };
        self.regs.set(reg, (result >> 16) as u16);
        self.regs.set(reg.pair(), result as u16);
        self.psw.set_n(result & 0x8000_0000 != 0);
        self.psw.set_z(result == 0);
        self.psw.set_v((value ^ result) & 0x8000_0000 != 0);
        self.psw.set_c(carry);
        Ok(())
    }

    pub(super) fn op_sob(&mut self, instr: DecodedInstruction) -> Result<(), Fault> {
        let reg: GeneralRegister = instr.register();
        let count = self.regs.get(reg).wrapping_sub(1);
        self.regs.set(reg, count);
        if count != 0 {
            let target = self.regs.pc().wrapping_sub(2 * instr.low_six());
            self.regs.set_pc(target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::state::GeneralRegister;
    use crate::Cpu;

    fn run(program: &[u16], setup: impl FnOnce(&mut Cpu)) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.bus_mut().memory_mut().load(0o1000, program).unwrap();
        cpu.registers_mut().set_pc(0o1000);
        cpu.registers_mut().set_sp(0o700);
        setup(&mut cpu);
        cpu.step().unwrap();
        cpu
    }

    fn r(n: u16) -> GeneralRegister {
        GeneralRegister::from_field(n)
    }

    #[rstest]
    #[case::plain(0o000_001, 0o000_001, 0o000_002, 0b0000)]
    #[case::signed_overflow(0o077_777, 0o000_001, 0o100_000, 0b1010)]
    #[case::carry_out(0o177_777, 0o000_001, 0, 0b0101)]
    #[case::both(0o100_000, 0o100_000, 0, 0b0111)]
    fn add_sets_architectural_flags(
        #[case] a: u16,
        #[case] b: u16,
        #[case] sum: u16,
        #[case] nzvc: u16,
    ) {
        let cpu = run(&[0o060_001], |cpu| {
            cpu.registers_mut().set(r(0), a);
            cpu.registers_mut().set(r(1), b);
        });
        assert_eq!(cpu.registers().get(r(1)), sum);
        assert_eq!(cpu.psw().condition_codes(), nzvc);
    }

    #[test]
    fn sub_overflow_uses_source_sign() {
        let cpu = run(&[0o160_001], |cpu| {
            cpu.registers_mut().set(r(0), 1);
            cpu.registers_mut().set(r(1), 0o100_000);
        });
        assert_eq!(cpu.registers().get(r(1)), 0o077_777);
        assert!(cpu.psw().v());
        assert!(!cpu.psw().c());
    }

    #[test]
    fn inc_overflow_only_at_sign_boundary() {
        let cpu = run(&[0o005_200], |cpu| cpu.registers_mut().set(r(0), 0o077_777));
        assert!(cpu.psw().v());
        assert!(cpu.psw().n());
        let cpu = run(&[0o005_200], |cpu| cpu.registers_mut().set(r(0), 0o177_777));
        assert!(!cpu.psw().v());
        assert!(cpu.psw().z());
    }

    #[test]
    fn byte_negate_flags_use_byte_width() {
        let cpu = run(&[0o105_400], |cpu| cpu.registers_mut().set(r(0), 0o177_600));
        assert_eq!(cpu.registers().get(r(0)), 0o177_600);
        assert!(cpu.psw().v());
        assert!(cpu.psw().c());
        assert!(cpu.psw().n());
    }

    #[test]
    fn swab_flags_come_from_low_byte() {
        let cpu = run(&[0o000_300], |cpu| cpu.registers_mut().set(r(0), 0o000_377));
        assert_eq!(cpu.registers().get(r(0)), 0o177_400);
        assert!(cpu.psw().z());
        assert!(!cpu.psw().n());
    }

    #[test]
    fn asr_overflow_is_n_xor_c() {
        let cpu = run(&[0o006_200], |cpu| cpu.registers_mut().set(r(0), 0o100_001));
        assert_eq!(cpu.registers().get(r(0)), 0o140_000);
        assert!(cpu.psw().c());
        assert!(cpu.psw().n());
        assert!(!cpu.psw().v());
    }

    #[test]
    fn mul_sets_carry_when_product_exceeds_a_word() {
        let cpu = run(&[0o070_001], |cpu| {
            cpu.registers_mut().set(r(0), 400);
            cpu.registers_mut().set(r(1), 400);
        });
        assert_eq!(cpu.registers().get(r(0)), 2);
        assert_eq!(cpu.registers().get(r(1)), 28_928);
        assert!(cpu.psw().c());
    }

    #[test]
    fn div_by_zero_sets_v_and_c() {
        let cpu = run(&[0o071_002], |cpu| {
            cpu.registers_mut().set(r(0), 0);
            cpu.registers_mut().set(r(1), 100);
        });
        assert!(cpu.psw().v());
        assert!(cpu.psw().c());
        assert_eq!(cpu.registers().get(r(1)), 100);
    }

    #[test]
    fn div_produces_quotient_and_remainder() {
        let cpu = run(&[0o071_002], |cpu| {
            cpu.registers_mut().set(r(0), 0);
            cpu.registers_mut().set(r(1), 100);
            cpu.registers_mut().set(r(2), 7);
        });
        assert_eq!(cpu.registers().get(r(0)), 14);
        assert_eq!(cpu.registers().get(r(1)), 2);
        assert_eq!(cpu.psw().condition_codes(), 0);
    }

    #[test]
    fn div_quotient_overflow_leaves_registers() {
        let cpu = run(&[0o071_002], |cpu| {
            cpu.registers_mut().set(r(0), 1);
            cpu.registers_mut().set(r(1), 0);
            cpu.registers_mut().set(r(2), 1);
        });
        assert!(cpu.psw().v());
        assert_eq!(cpu.registers().get(r(0)), 1);
    }

    #[rstest]
    #[case::left(0o000_003, 0o000_002, 0o000_020, false)]
    #[case::right(0o000_077, 0o000_003, 0o000_001, true)]
    #[case::negative_right(0o000_076, 0o177_770, 0o177_776, false)]
    fn ash_shifts_by_signed_count(
        #[case] count: u16,
        #[case] value: u16,
        #[case] expected: u16,
        #[case] carry: bool,
    ) {
        let cpu = run(&[0o072_001], |cpu| {
            cpu.registers_mut().set(r(0), value);
            cpu.registers_mut().set(r(1), count);
        });
        assert_eq!(cpu.registers().get(r(0)), expected);
        assert_eq!(cpu.psw().c(), carry);
    }

    #[test]
    fn ashc_shifts_register_pair() {
        let cpu = run(&[0o073_002], |cpu| {
            cpu.registers_mut().set(r(0), 0);
            cpu.registers_mut().set(r(1), 0o100_000);
            cpu.registers_mut().set(r(2), 1);
        });
        assert_eq!(cpu.registers().get(r(0)), 1);
        assert_eq!(cpu.registers().get(r(1)), 0);
    }

    #[test]
    fn sob_loops_until_zero() {
        let cpu = run(&[0o077_001], |cpu| cpu.registers_mut().set(r(0), 2));
        assert_eq!(cpu.registers().get(r(0)), 1);
        assert_eq!(cpu.registers().pc(), 0o1000);
    }
}
