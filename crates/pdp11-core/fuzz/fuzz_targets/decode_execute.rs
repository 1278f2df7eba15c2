#![no_main]

use libfuzzer_sys::fuzz_target;
use pdp11_core::{Cpu, Decoder, Mode, Psw, StepOutcome};

const STEPS: usize = 64;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let words: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take(2048)
        .collect();
    for word in &words {
        let _ = Decoder::decode(*word);
    }

    let mut cpu = Cpu::new();
    let memory = cpu.bus_mut().memory_mut();
    for vector in (0o4_u32..0o400).step_by(4) {
        let _ = memory.load(vector, &[0o1000, 0o340]);
    }
    let _ = memory.load(0o1000, &words);
    cpu.registers_mut().set_sp(0o776);
    if data[0] & 1 != 0 {
        cpu.registers_mut().set_banked_sp(Mode::User, 0o20_000);
        cpu.load_psw(Psw::from_raw(0o140_000));
    }
    cpu.registers_mut().set_pc(0o1000);

    for _ in 0..STEPS {
        match cpu.step() {
            Ok(StepOutcome::Halted | StepOutcome::Waiting) | Err(_) => break,
            Ok(_) => {}
        }
        let _ = cpu.service_interrupt();
    }
});
