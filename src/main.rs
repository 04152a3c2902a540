//! gbcom - bus command script replayer
//!
//! Reads a whitespace separated script of bus commands (write, read, sleep,
//! GPIO) and replays it against a bus controller reached through an FT4222H
//! USB bridge. Every read prints its value on stdout as `0x%08X`.
//!
//! # Architecture
//!
//! - `gbcom-core` parses the script into commands and encodes them as 5 byte
//!   opcode frames over an abstract [`BusMaster`](gbcom_core::BusMaster)
//! - `gbcom-ft4222` drives the FT4222H SPI master and GPIO interfaces
//! - `gbcom-dummy` emulates the bus controller in memory

mod cli;
mod programmers;

use clap::Parser;
use cli::Cli;
use gbcom_core::Script;
use std::path::Path;

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = if cli.list_devices {
        list_devices()
    } else {
        match cli.script.as_deref() {
            Some(path) if cli.check => check_script(path),
            Some(path) => run(&cli.programmer, path),
            None => Err("no script given".into()),
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(programmer: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    let summary =
        programmers::run_script(programmer, || Script::from_file(path), stdout.lock())?;
    log::info!(
        "Done: {} commands executed, {} skipped, {} reads",
        summary.executed,
        summary.skipped,
        summary.reads.len()
    );
    Ok(())
}

fn check_script(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let script = Script::from_file(path)?;
    for (i, command) in script.iter().enumerate() {
        println!("{:4}: {}", i, command);
    }

    let diagnostics = script.diagnostics();
    if diagnostics.is_empty() {
        println!("{}: {} commands, no problems found", path.display(), script.len());
        Ok(())
    } else {
        Err(format!(
            "{}: {} commands, {} problems",
            path.display(),
            script.len(),
            diagnostics.len()
        )
        .into())
    }
}

#[cfg(feature = "ft4222")]
fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    use gbcom_ft4222::{list_interfaces, InterfaceKind};

    let interfaces = list_interfaces()?;
    if interfaces.is_empty() {
        println!("No FT4222H devices found");
        return Ok(());
    }

    for kind in [InterfaceKind::SpiMaster, InterfaceKind::Gpio] {
        println!("{} interfaces:", kind);
        for (index, iface) in interfaces.iter().filter(|i| i.kind == kind).enumerate() {
            println!("  [{}] {}", index, iface);
        }
    }
    Ok(())
}

#[cfg(not(feature = "ft4222"))]
fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    Err("built without FT4222H support".into())
}
