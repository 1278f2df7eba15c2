//! Boots an RK05 image on the emulated PDP-11/40 with the host terminal as
//! the system console.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use pdp11::image::open_disk_image;
use pdp11::terminal::spawn_keyboard;
use pdp11_core::{Machine, MachineConfig, DEFAULT_CLOCK_INTERVAL, DEFAULT_CONSOLE_OUTPUT_DELAY};
#[cfg(test)]
use tempfile as _;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RK05 image attached as drive 0
    #[arg(short, long, default_value = "rk0")]
    disk: PathBuf,

    /// Stop after this many machine cycles
    #[arg(long)]
    max_steps: Option<u64>,

    /// Instructions between line clock ticks
    #[arg(long, default_value_t = DEFAULT_CLOCK_INTERVAL)]
    clock_interval: u32,

    /// Device steps the console printer takes per character
    #[arg(long, default_value_t = DEFAULT_CONSOLE_OUTPUT_DELAY)]
    console_delay: u8,

    /// Log every instruction fetch at trace level
    #[arg(long)]
    trace: bool,

    /// Print the register dump to stderr when the machine stops
    #[arg(long)]
    dump: bool,
}

impl Args {
    const fn config(&self) -> MachineConfig {
        MachineConfig {
            clock_interval: self.clock_interval,
            console_output_delay: self.console_delay,
            trace_instructions: self.trace,
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let disk = open_disk_image(&args.disk)?;
    let keyboard = spawn_keyboard(io::stdin());
    let mut machine = Machine::with_standard_devices(args.config(), disk, keyboard, io::stdout())?;
    log::info!("booting {}", args.disk.display());

    let result = machine.run(args.max_steps);
    if args.dump {
        eprintln!("{}", machine.cpu().diagnostics());
    }
    let outcome = result?;
    log::info!("{} cycles, last step {:?}", outcome.cycles, outcome.final_step);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::Args;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_core_configuration() {
        let args = Args::parse_from(["pdp11"]);
        assert_eq!(args.disk.to_str(), Some("rk0"));
        assert_eq!(args.max_steps, None);
        assert_eq!(args.config(), pdp11_core::MachineConfig::default());
    }

    #[test]
    fn parses_run_limits() {
        let args =
            Args::parse_from(["pdp11", "--disk", "unix.rk", "--max-steps", "500", "--trace"]);
        assert_eq!(args.max_steps, Some(500));
        assert!(args.config().trace_instructions);
    }
}
