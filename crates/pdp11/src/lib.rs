//! Host side of the PDP-11/40 emulator: disk image files and the terminal
//! that feeds the console keyboard.

use clap as _;
use env_logger as _;
#[cfg(test)]
use tempfile as _;

/// RK05 image files.
pub mod image;
/// Host keyboard plumbing.
pub mod terminal;
