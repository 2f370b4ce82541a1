//! ri2c - drive an I2C bus from a USB FTDI MPSSE adapter
//!
//! The host encodes I2C start/stop conditions and byte transfers into MPSSE
//! commands, batches them, and round-trips them over USB; acknowledge bits
//! come back in the response stream and steer the transaction. See
//! `ri2c-core` for the engine and `ri2c-ftdi` for the adapter backend.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Default log level from verbosity; RUST_LOG still wins
    let default_filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Commands::Read {
            device,
            address,
            count,
        } => commands::run_read(&device, address, count),
        Commands::Write {
            device,
            address,
            data,
        } => commands::run_write(&device, address, data),
        Commands::Transfer {
            device,
            address,
            count,
            data,
        } => commands::run_transfer(&device, address, data, count),
        Commands::Scan { device } => commands::run_scan(&device),
        Commands::ListDevices => commands::run_list_devices(),
    }
}
