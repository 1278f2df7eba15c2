//! KL11 console terminal.

use std::io::Write;
use std::sync::mpsc::Receiver;

use crate::api::{Device, DeviceContext, DEFAULT_CONSOLE_OUTPUT_DELAY};
use crate::{MachineError, TrapCause};

/// Keyboard interrupt vector.
pub const CONSOLE_INPUT_VECTOR: u8 = 0o60;
/// Printer interrupt vector.
pub const CONSOLE_OUTPUT_VECTOR: u8 = 0o64;
/// Console bus request level.
pub const CONSOLE_PRIORITY: u8 = 4;

const DONE: u16 = 0o200;
const INTERRUPT_ENABLE: u16 = 0o100;
const READER_ENABLE: u16 = 0o1;

/// KL11 console: keyboard input arrives on a channel, printer output goes
/// to a writer. Registers are RCSR, RBUF, XCSR, XBUF at word offsets 0..6.
pub struct Console<W> {
    input: Receiver<u8>,
    output: W,
    rcsr: u16,
    rbuf: u16,
    xcsr: u16,
    xbuf: u16,
    countdown: u8,
    delay: u8,
}

impl<W> core::fmt::Debug for Console<W> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Console")
            .field("rcsr", &self.rcsr)
            .field("rbuf", &self.rbuf)
            .field("xcsr", &self.xcsr)
            .field("xbuf", &self.xbuf)
            .finish_non_exhaustive()
    }
}

impl<W: Write> Console<W> {
    /// Console reading from `input` and printing to `output`.
    #[must_use]
    pub fn new(input: Receiver<u8>, output: W) -> Self {
        Self::with_delay(input, output, DEFAULT_CONSOLE_OUTPUT_DELAY)
    }

    /// Console whose printer takes `delay` steps per character.
    #[must_use]
    pub fn with_delay(input: Receiver<u8>, output: W, delay: u8) -> Self {
        Self {
            input,
            output,
            rcsr: 0,
            rbuf: 0,
            xcsr: DONE,
            xbuf: 0,
            countdown: 0,
            delay,
        }
    }

    /// Printer sink.
    #[must_use]
    pub const fn output(&self) -> &W {
        &self.output
    }

    fn poll_keyboard(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        if self.rcsr & DONE != 0 {
            return Ok(());
        }
        let Ok(byte) = self.input.try_recv() else {
            return Ok(());
        };
        self.rbuf = u16::from(byte & 0x7F);
        self.rcsr |= DONE;
        if self.rcsr & INTERRUPT_ENABLE != 0 {
            ctx.interrupt(CONSOLE_INPUT_VECTOR, CONSOLE_PRIORITY)?;
        }
        Ok(())
    }

    fn drain_printer(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        if self.xcsr & DONE != 0 {
            return Ok(());
        }
        self.countdown = self.countdown.saturating_add(1);
        if self.countdown <= self.delay {
            return Ok(());
        }
        #[allow(clippy::cast_possible_truncation)]
        let byte = (self.xbuf & 0x7F) as u8;
        if let Err(err) = self.output.write_all(&[byte]).and_then(|()| self.output.flush()) {
            log::warn!("kl11: console output failed: {err}");
        }
        self.xcsr |= DONE;
        if self.xcsr & INTERRUPT_ENABLE != 0 {
            ctx.interrupt(CONSOLE_OUTPUT_VECTOR, CONSOLE_PRIORITY)?;
        }
        Ok(())
    }
}

impl<W: Write> Device for Console<W> {
    fn name(&self) -> &'static str {
        "kl11"
    }

    fn read16(&mut self, addr: u32) -> Result<u16, TrapCause> {
        Ok(match addr & 0o6 {
            0o0 => self.rcsr,
            0o2 => {
                if self.rcsr & DONE == 0 {
                    return Ok(0);
                }
                self.rcsr &= !(DONE | READER_ENABLE);
                self.rbuf
            }
            0o4 => self.xcsr,
            _ => 0,
        })
    }

    fn write16(&mut self, addr: u32, value: u16) -> Result<(), TrapCause> {
        match addr & 0o6 {
            0o0 => self.rcsr = (self.rcsr & !INTERRUPT_ENABLE) | (value & INTERRUPT_ENABLE),
            0o4 => self.xcsr = (self.xcsr & !INTERRUPT_ENABLE) | (value & INTERRUPT_ENABLE),
            0o6 => {
                self.xbuf = value & 0x7F;
                self.xcsr &= !DONE;
                self.countdown = 0;
            }
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.rcsr = 0;
        self.rbuf = 0;
        self.xcsr = DONE;
        self.xbuf = 0;
        self.countdown = 0;
    }

    fn step(&mut self, ctx: &mut DeviceContext<'_>) -> Result<(), MachineError> {
        self.poll_keyboard(ctx)?;
        self.drain_printer(ctx)
    }
}
