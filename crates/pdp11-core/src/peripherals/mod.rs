//! Standard Unibus peripherals: line clock, console terminal, disk.

/// KW11-L line clock.
pub mod clock;
/// KL11 console terminal.
pub mod console;
/// RK11 controller with one RK05 drive.
pub mod disk;

pub use clock::{LineClock, CLOCK_PRIORITY, CLOCK_VECTOR};
pub use console::{Console, CONSOLE_INPUT_VECTOR, CONSOLE_OUTPUT_VECTOR, CONSOLE_PRIORITY};
pub use disk::{Disk, DISK_BYTES, DISK_PRIORITY, DISK_VECTOR};
