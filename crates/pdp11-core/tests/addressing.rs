//! Operand addressing modes through general registers and the PC.

#![allow(clippy::pedantic, clippy::nursery)]

use log as _;
use pdp11_core::{Cpu, GeneralRegister, StepOutcome, TrapCause};
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const R0: GeneralRegister = GeneralRegister::R0;
const R1: GeneralRegister = GeneralRegister::R1;
const SP: GeneralRegister = GeneralRegister::R6;

const WORD: u16 = 0o7070;
const BYTE: u8 = 0o125;

/// Where a destination operand lands.
#[derive(Debug, Clone, Copy)]
enum Target {
    Register(GeneralRegister),
    Memory(u32),
}

fn cpu_with(program: &[u16]) -> Cpu {
    let mut cpu = Cpu::new();
    let memory = cpu.bus_mut().memory_mut();
    memory.load(0o1000, program).unwrap();
    memory.load(0o1776, &[0o2006, 0o2004, 0o0, 0o444, 0o666]).unwrap();
    cpu.registers_mut().set_pc(0o1000);
    cpu.registers_mut().set_sp(0o700);
    cpu.registers_mut().set(R1, 0o2000);
    cpu
}

#[rstest]
#[case::register(&[0o010_100], 0o2000, 0o2000, 0o1002)]
#[case::register_deferred(&[0o011_100], 0o2004, 0o2000, 0o1002)]
#[case::autoincrement(&[0o012_100], 0o2004, 0o2002, 0o1002)]
#[case::autoincrement_deferred(&[0o013_100], 0o444, 0o2002, 0o1002)]
#[case::autodecrement(&[0o014_100], 0o2006, 0o1776, 0o1002)]
#[case::autodecrement_deferred(&[0o015_100], 0o666, 0o1776, 0o1002)]
#[case::index(&[0o016_100, 0o4], 0o444, 0o2000, 0o1004)]
#[case::index_deferred(&[0o017_100, 0o0], 0o444, 0o2000, 0o1004)]
#[case::immediate(&[0o012_700, 0o7070], 0o7070, 0o2000, 0o1004)]
#[case::absolute(&[0o013_700, 0o2006], 0o666, 0o2000, 0o1004)]
#[case::relative(&[0o016_700, 0o1000], 0o444, 0o2000, 0o1004)]
#[case::relative_deferred(&[0o017_700, 0o774], 0o444, 0o2000, 0o1004)]
fn mov_source_modes(#[case] program: &[u16], #[case] r0: u16, #[case] r1: u16, #[case] pc: u16) {
    let mut cpu = cpu_with(program);

    assert_eq!(cpu.step(), Ok(StepOutcome::Retired));

    assert_eq!(cpu.registers().get(R0), r0);
    assert_eq!(cpu.registers().get(R1), r1);
    assert_eq!(cpu.registers().pc(), pc);
}

#[rstest]
#[case::register(0o01, None, Target::Register(R1), R1, WORD)]
#[case::register_deferred(0o11, None, Target::Memory(0o2000), R1, 0o2000)]
#[case::autoincrement(0o21, None, Target::Memory(0o2000), R1, 0o2002)]
#[case::autoincrement_deferred(0o31, None, Target::Memory(0o2004), R1, 0o2002)]
#[case::autodecrement(0o41, None, Target::Memory(0o1776), R1, 0o1776)]
#[case::autodecrement_deferred(0o51, None, Target::Memory(0o2006), R1, 0o1776)]
#[case::index(0o61, Some(0o4), Target::Memory(0o2004), R1, 0o2000)]
#[case::index_deferred(0o71, Some(0o0), Target::Memory(0o2004), R1, 0o2000)]
#[case::immediate(0o27, Some(0o0), Target::Memory(0o1004), R1, 0o2000)]
#[case::absolute(0o37, Some(0o2006), Target::Memory(0o2006), R1, 0o2000)]
#[case::relative(0o67, Some(0o1000), Target::Memory(0o2006), R1, 0o2000)]
#[case::stack_autoincrement(0o26, None, Target::Memory(0o700), SP, 0o702)]
fn mov_word_destination_modes(
    #[case] dst: u16,
    #[case] extension: Option<u16>,
    #[case] target: Target,
    #[case] stepped: GeneralRegister,
    #[case] after: u16,
) {
    let mut program = vec![0o012_700 | dst, WORD];
    program.extend(extension);
    let mut cpu = cpu_with(&program);

    assert_eq!(cpu.step(), Ok(StepOutcome::Retired));

    match target {
        Target::Register(reg) => assert_eq!(cpu.registers().get(reg), WORD),
        Target::Memory(pa) => assert_eq!(cpu.bus().memory().read16(pa), Ok(WORD)),
    }
    assert_eq!(cpu.registers().get(stepped), after);
    assert_eq!(cpu.registers().pc(), 0o1004 + 2 * extension.map_or(0, |_| 1));
}

#[rstest]
#[case::register(0o01, None, Target::Register(R1), R1, u16::from(BYTE))]
#[case::register_deferred(0o11, None, Target::Memory(0o2000), R1, 0o2000)]
#[case::autoincrement(0o21, None, Target::Memory(0o2000), R1, 0o2001)]
#[case::autoincrement_deferred(0o31, None, Target::Memory(0o2004), R1, 0o2002)]
#[case::autodecrement(0o41, None, Target::Memory(0o1777), R1, 0o1777)]
#[case::autodecrement_deferred(0o51, None, Target::Memory(0o2006), R1, 0o1776)]
#[case::index(0o61, Some(0o5), Target::Memory(0o2005), R1, 0o2000)]
#[case::index_deferred(0o71, Some(0o0), Target::Memory(0o2004), R1, 0o2000)]
#[case::immediate(0o27, Some(0o0), Target::Memory(0o1004), R1, 0o2000)]
#[case::absolute(0o37, Some(0o2007), Target::Memory(0o2007), R1, 0o2000)]
#[case::relative(0o67, Some(0o1000), Target::Memory(0o2006), R1, 0o2000)]
#[case::stack_autoincrement(0o26, None, Target::Memory(0o700), SP, 0o702)]
fn movb_destination_modes(
    #[case] dst: u16,
    #[case] extension: Option<u16>,
    #[case] target: Target,
    #[case] stepped: GeneralRegister,
    #[case] after: u16,
) {
    let mut program = vec![0o112_700 | dst, u16::from(BYTE)];
    program.extend(extension);
    let mut cpu = cpu_with(&program);

    assert_eq!(cpu.step(), Ok(StepOutcome::Retired));

    match target {
        Target::Register(reg) => assert_eq!(cpu.registers().get(reg), u16::from(BYTE)),
        Target::Memory(pa) => {
            assert_eq!(cpu.bus().memory().read8(pa), Ok(BYTE));
            let neighbour = pa ^ 1;
            assert_ne!(cpu.bus().memory().read8(neighbour), Ok(BYTE));
        }
    }
    assert_eq!(cpu.registers().get(stepped), after);
    assert_eq!(cpu.registers().pc(), 0o1004 + 2 * extension.map_or(0, |_| 1));
}

#[test]
fn byte_autoincrement_steps_by_one() {
    let mut cpu = cpu_with(&[0o112_100]); // MOVB (R1)+, R0
    cpu.step().unwrap();
    assert_eq!(cpu.registers().get(R0), 0o004);
    assert_eq!(cpu.registers().get(R1), 0o2001);
}

#[test]
fn byte_autoincrement_on_stack_pointer_steps_by_two() {
    let mut cpu = cpu_with(&[0o112_600]); // MOVB (SP)+, R0
    cpu.registers_mut().set_sp(0o2004);
    cpu.step().unwrap();
    assert_eq!(cpu.registers().get(R0), 0o044);
    assert_eq!(cpu.registers().sp(), 0o2006);
}

#[test]
fn byte_write_to_register_keeps_high_byte() {
    let mut cpu = cpu_with(&[0o150_100]); // BISB R1, R0
    cpu.registers_mut().set(R0, 0o177_400);
    cpu.registers_mut().set(R1, 0o152_017);
    cpu.step().unwrap();
    assert_eq!(cpu.registers().get(R0), 0o177_417);
}

#[test]
fn odd_word_address_is_bus_error() {
    let mut cpu = cpu_with(&[0o011_100]);
    cpu.bus_mut().memory_mut().load(0o4, &[0o3000, 0o340]).unwrap();
    cpu.registers_mut().set(R1, 0o2001);
    assert_eq!(cpu.step(), Ok(StepOutcome::Trapped(TrapCause::BusError)));
    assert_eq!(cpu.registers().pc(), 0o3000);
}

#[test]
fn jsr_and_rts_link_through_register() {
    // JSR R5, @#1010 ; ... ; RTS R5
    let mut cpu = cpu_with(&[0o004_537, 0o1010, 0o0, 0o0, 0o000_205]);
    cpu.registers_mut().set(GeneralRegister::R5, 0o5555);

    cpu.step().unwrap();
    assert_eq!(cpu.registers().pc(), 0o1010);
    assert_eq!(cpu.registers().get(GeneralRegister::R5), 0o1004);
    assert_eq!(cpu.registers().sp(), 0o676);

    cpu.step().unwrap();
    assert_eq!(cpu.registers().pc(), 0o1004);
    assert_eq!(cpu.registers().get(GeneralRegister::R5), 0o5555);
    assert_eq!(cpu.registers().sp(), 0o700);
}
