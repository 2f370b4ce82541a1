//! Subcommand implementations

use std::error::Error;

use ri2c_core::address::SlaveAddress;
use ri2c_core::bus::{EngineConfig, TransactionRequest};
use ri2c_core::engine::I2cEngine;
use ri2c_ftdi::{FtdiConfig, FtdiI2c};

use crate::cli::DeviceArgs;

pub fn run_read(
    device: &DeviceArgs,
    address: SlaveAddress,
    count: usize,
) -> Result<(), Box<dyn Error>> {
    let mut dev = open_and_configure(device)?;
    let mut engine = engine_for(&mut dev, device);
    let data = engine.transaction(&TransactionRequest::read(address, count))?;
    print!("{}", format_hex(&data));
    Ok(())
}

pub fn run_write(
    device: &DeviceArgs,
    address: SlaveAddress,
    data: Vec<u8>,
) -> Result<(), Box<dyn Error>> {
    let len = data.len();
    let mut dev = open_and_configure(device)?;
    let mut engine = engine_for(&mut dev, device);
    engine.transaction(&TransactionRequest::write(address, data))?;
    println!("{} byte(s) written to {}", len, address);
    Ok(())
}

pub fn run_transfer(
    device: &DeviceArgs,
    address: SlaveAddress,
    data: Vec<u8>,
    count: usize,
) -> Result<(), Box<dyn Error>> {
    let mut dev = open_and_configure(device)?;
    let mut engine = engine_for(&mut dev, device);
    let read = engine.transaction(&TransactionRequest::write_read(address, data, count))?;
    print!("{}", format_hex(&read));
    Ok(())
}

pub fn run_scan(device: &DeviceArgs) -> Result<(), Box<dyn Error>> {
    let mut dev = open_and_configure(device)?;
    let mut engine = engine_for(&mut dev, device);
    log::info!("scanning addresses 0x00..=0x7E");
    let found = engine.scan()?;

    if found.is_empty() {
        println!("No responding slaves found.");
    } else {
        for address in found {
            println!("Slave ACKed address {}", address);
        }
    }
    Ok(())
}

pub fn run_list_devices() -> Result<(), Box<dyn Error>> {
    let devices = FtdiI2c::list_devices()?;
    if devices.is_empty() {
        println!("No FTDI devices found.");
    } else {
        for info in devices {
            println!("{}", info);
        }
    }
    Ok(())
}

fn open_and_configure(args: &DeviceArgs) -> Result<FtdiI2c, Box<dyn Error>> {
    let config = FtdiConfig::for_chip(args.chip).interface(args.port)?;
    let mut dev = FtdiI2c::open(&config)?;
    dev.configure(args.speed)?;
    Ok(dev)
}

fn engine_for<'a>(dev: &'a mut FtdiI2c, args: &DeviceArgs) -> I2cEngine<&'a mut FtdiI2c> {
    I2cEngine::with_config(
        dev,
        EngineConfig {
            hold_repeat: args.hold_repeat,
        },
    )
}

/// Dump bytes in lowercase hex, 16 per line
fn format_hex(data: &[u8]) -> String {
    let mut out = String::new();
    for (i, byte) in data.iter().enumerate() {
        out.push_str(&format!("{:02x}", byte));
        if (i + 1) % 16 == 0 || i + 1 == data.len() {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}
