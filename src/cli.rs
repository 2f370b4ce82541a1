//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use ri2c_core::address::SlaveAddress;
use ri2c_core::bus::I2cSpeed;
use ri2c_ftdi::{FtdiChipType, FtdiInterface};

/// Parse a byte in hex (0x), octal (0o), binary (0b), or decimal form
fn parse_byte(s: &str) -> Result<u8, String> {
    let (digits, radix) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (hex, 16)
    } else if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        (oct, 8)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (bin, 2)
    } else {
        (s, 10)
    };
    u8::from_str_radix(digits, radix).map_err(|e| format!("invalid byte '{}': {}", s, e))
}

/// Parse a 7-bit slave address; the top bit is masked off
fn parse_address(s: &str) -> Result<SlaveAddress, String> {
    parse_byte(s).map(SlaveAddress::new)
}

/// Parse the bus speed; only 100 and 400 kHz exist
fn parse_speed(s: &str) -> Result<I2cSpeed, String> {
    match s {
        "100" => Ok(I2cSpeed::Standard100k),
        "400" => Ok(I2cSpeed::Fast400k),
        other => Err(format!(
            "unsupported bus speed '{}': only 100 and 400 (kHz) are supported",
            other
        )),
    }
}

fn parse_chip(s: &str) -> Result<FtdiChipType, String> {
    FtdiChipType::parse(s)
        .ok_or_else(|| format!("unknown chip type '{}': valid types: 232h, 2232h, 4232h", s))
}

fn parse_port(s: &str) -> Result<FtdiInterface, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => FtdiInterface::from_char(c)
            .ok_or_else(|| format!("invalid channel '{}': must be A, B, C, or D", s)),
        _ => Err(format!("invalid channel '{}': must be A, B, C, or D", s)),
    }
}

#[derive(Parser)]
#[command(name = "ri2c")]
#[command(author, version, about = "USB I2C bus master for FTDI MPSSE adapters", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Adapter options shared across commands
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// FTDI chip type (232h, 2232h, 4232h)
    #[arg(long, default_value = "232h", value_parser = parse_chip)]
    pub chip: FtdiChipType,

    /// MPSSE channel to use
    #[arg(long, default_value = "A", value_parser = parse_port)]
    pub port: FtdiInterface,

    /// Bus speed in kHz (100 or 400)
    #[arg(long, default_value = "100", value_parser = parse_speed)]
    pub speed: I2cSpeed,

    /// Repeat count pacing start/stop line transitions
    #[arg(long, default_value_t = 40)]
    pub hold_repeat: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read bytes from a slave
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// 7-bit slave address (e.g. 0x3C)
        #[arg(short, long, value_parser = parse_address)]
        address: SlaveAddress,

        /// Number of bytes to read
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Write bytes to a slave
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// 7-bit slave address (e.g. 0x3C)
        #[arg(short, long, value_parser = parse_address)]
        address: SlaveAddress,

        /// Data bytes (hex, octal, binary, or decimal)
        #[arg(required = true, value_parser = parse_byte)]
        data: Vec<u8>,
    },

    /// Write bytes, then read with a repeated start
    Transfer {
        #[command(flatten)]
        device: DeviceArgs,

        /// 7-bit slave address (e.g. 0x3C)
        #[arg(short, long, value_parser = parse_address)]
        address: SlaveAddress,

        /// Number of bytes to read after the write
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Data bytes (hex, octal, binary, or decimal)
        #[arg(required = true, value_parser = parse_byte)]
        data: Vec<u8>,
    },

    /// Scan the bus for responding slaves
    Scan {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// List connected FTDI adapters
    ListDevices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_parse_in_all_radixes() {
        assert_eq!(parse_byte("0x12").unwrap(), 0x12);
        assert_eq!(parse_byte("0o22").unwrap(), 0o22);
        assert_eq!(parse_byte("0b1010").unwrap(), 0b1010);
        assert_eq!(parse_byte("18").unwrap(), 18);
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("banana").is_err());
    }

    #[test]
    fn addresses_are_masked_to_seven_bits() {
        assert_eq!(parse_address("0xBC").unwrap(), SlaveAddress::new(0x3C));
    }

    #[test]
    fn only_two_speeds_exist() {
        assert_eq!(parse_speed("100").unwrap(), I2cSpeed::Standard100k);
        assert_eq!(parse_speed("400").unwrap(), I2cSpeed::Fast400k);
        assert!(parse_speed("1000").is_err());
        assert!(parse_speed("10").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
