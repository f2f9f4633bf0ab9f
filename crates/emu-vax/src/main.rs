mod args;
mod report;

use args::Args;
use clap::Parser;
use cpu_vax::{StopReason, Vax};
use emu_core::FlatMemory;
use report::Report;
use std::process;
use tracing::info;

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let image = match std::fs::read(&args.image) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.image.display());
            process::exit(2);
        }
    };

    let config = args.to_config();
    if let Err(e) = args.validate(image.len(), &config) {
        eprintln!("Error: {e}");
        process::exit(2);
    }

    let mut memory = FlatMemory::new(config.memory_size);
    memory.load(args.load_addr, &image);
    info!(
        "loaded {} bytes at {:#010X}, entry {:#010X}, scbb {:#010X}",
        image.len(),
        args.load_addr,
        config.reset_pc,
        config.scbb
    );

    let mut cpu = Vax::with_config(config);
    let stop = match cpu.run(&mut memory, args.max_instructions) {
        Ok(stop) => stop,
        Err(e) => {
            eprintln!("Host error at PC {:#010X}: {e}", cpu.regs.pc());
            process::exit(2);
        }
    };
    info!("stopped ({stop:?}) after {}", cpu.instructions());

    let report = Report::new(&cpu, stop);
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Failed to encode report: {e}");
            process::exit(2);
        }
    }

    let code = match stop {
        StopReason::Halted(cpu_vax::HaltReason::Instruction) => 0,
        StopReason::Limit => 1,
        StopReason::Halted(cpu_vax::HaltReason::DoubleFault) => 3,
    };
    process::exit(code);
}
