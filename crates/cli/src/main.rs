// GBAJam - Handheld Bring-up Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gbajam_core::display::COLUMNS;
use gbajam_core::startup;
use gbajam_rom::{RequiredSymbols, RomInfo, TITLE_LENGTH};
use gbajam_sim::{FrameLimitReached, Machine, SimConfig, TextScreen};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "GBAJam bring-up tools", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot the startup program on the hardware model and show the screen.
    Run(RunArgs),

    /// Build a cartridge image from a linked firmware ELF.
    Rom(RomArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Vertical blanks to wait for before stopping
    #[arg(long, default_value = "60")]
    frames: u64,

    /// Hard stop after this many frames, even mid-wait
    #[arg(long)]
    frame_limit: Option<u64>,

    /// Write a machine snapshot (JSON) when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RomArgs {
    /// Path to the linked firmware ELF
    program: PathBuf,

    /// Where to write the image; without it the program is only checked
    output: Option<PathBuf>,

    /// Cartridge title (default: program file name, upper-cased)
    #[arg(long)]
    title: Option<String>,

    /// Symbol that must sit at the start of ROM
    #[arg(long, default_value = "_start")]
    entry_symbol: String,

    /// Symbol that must sit right after the cartridge header
    #[arg(long, default_value = "rom_header_end")]
    header_end_symbol: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run_program(args),
        Commands::Rom(args) => build_rom(args),
    }
}

fn run_program(args: RunArgs) -> ExitCode {
    if args.frames == 0 {
        error!("--frames must be at least 1");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let config = SimConfig {
        frame_limit: args.frame_limit,
    };
    info!("Booting startup program");
    let mut idle = startup::boot(Machine::with_config(config));

    silence_frame_limit_panics();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        for _ in 0..args.frames {
            idle.wait_for_vertical_blank();
        }
    }));
    if let Err(payload) = outcome {
        match payload.downcast_ref::<FrameLimitReached>() {
            Some(stopped) => warn!("Stopped at frame limit after {} frames", stopped.frames),
            None => {
                error!("Simulation failed: {}", panic_message(payload.as_ref()));
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    }

    let machine = idle.hardware();
    print_screen(&machine.screen());
    println!(
        "frames: {}, scanlines: {}, interrupts serviced: {}",
        machine.frames(),
        machine.scanlines(),
        machine.serviced_irqs()
    );

    if let Some(path) = &args.snapshot {
        if let Err(e) = write_snapshot(path, machine) {
            error!("{:#}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
        info!("Snapshot written to {:?}", path);
    }

    ExitCode::from(EXIT_PASS)
}

/// The frame limit unwinds on purpose; keep it out of stderr.
fn silence_frame_limit_panics() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if info.payload().downcast_ref::<FrameLimitReached>().is_none() {
            default_hook(info);
        }
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn print_screen(screen: &TextScreen) {
    let border = format!("+{}+", "-".repeat(COLUMNS as usize));
    println!("{}", border);
    for line in screen.lines() {
        println!("|{}|", line);
    }
    println!("{}", border);
}

fn write_snapshot(path: &Path, machine: &Machine) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&machine.snapshot())
        .context("Failed to serialize snapshot")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write snapshot {:?}", path))
}

fn build_rom(args: RomArgs) -> ExitCode {
    let title = args
        .title
        .unwrap_or_else(|| gbajam_rom::default_title(&args.program));
    let title = match gbajam_rom::truncate_title(&title) {
        Some(short) => {
            warn!(
                "Title {:?} is longer than {} bytes, using {:?}",
                title, TITLE_LENGTH, short
            );
            short
        }
        None => title,
    };

    let info = RomInfo {
        title,
        symbols: RequiredSymbols {
            entry: args.entry_symbol,
            header_end: args.header_end_symbol,
        },
    };

    info!("Reading program: {:?}", args.program);
    let image = match gbajam_rom::make_rom_from_path(&args.program, &info) {
        Ok(image) => image,
        Err(e) => {
            error!("{}: {}", args.program.display(), e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match &args.output {
        Some(output) => {
            let written = std::fs::write(output, &image)
                .with_context(|| format!("Failed to write ROM image {:?}", output));
            if let Err(e) = written {
                error!("{:#}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
            info!("Wrote {} bytes to {:?}", image.len(), output);
        }
        None => info!("Program is a valid ROM image ({} bytes)", image.len()),
    }

    ExitCode::from(EXIT_PASS)
}
