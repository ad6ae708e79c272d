use std::path::PathBuf;
use std::process;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use log::*;
use simple_logger::SimpleLogger;

use synvm::console::StdConsole;
use synvm::memory::StdMem;
use synvm::processor::{ExitReason, Processor};

/// Runs a binary image on the virtual machine
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the binary image
    file: PathBuf,

    /// Diagnostics written to stderr
    #[arg(short, long, default_value_t = LevelFilter::Warn)]
    log_level: LevelFilter,

    /// Stop after this many instructions
    #[arg(short, long)]
    max_steps: Option<u64>,
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let args = Args::parse();
    SimpleLogger::new()
        .with_level(args.log_level)
        .init()
        .wrap_err("Cannot initialize logging")?;

    info!("Loading program ...");
    let mut mem = StdMem::from_file(&args.file)?;
    let mut cpu = Processor::default();
    let mut console = StdConsole;

    info!("Executing program ...");
    let exit = match args.max_steps {
        Some(max_steps) => cpu.run_with_limit(&mut mem, &mut console, max_steps),
        None => cpu.run(&mut mem, &mut console),
    };

    match exit {
        ExitReason::Halted => Ok(()),
        ExitReason::Faulted(fault) => {
            eprintln!("Aborted: {}", fault);
            process::exit(1);
        }
        ExitReason::Interrupted { steps } => {
            eprintln!("Stopped after {} steps", steps);
            process::exit(2);
        }
    }
}
