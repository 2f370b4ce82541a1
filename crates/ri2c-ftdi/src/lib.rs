//! ri2c-ftdi - FTDI MPSSE adapter backend
//!
//! This crate opens and configures FTDI high-speed chips (FT232H, FT2232H,
//! FT4232H) for I2C mastering and exposes them as a byte
//! [`Transport`](ri2c_core::transport::Transport) for the core engine.
//!
//! Pin assignment on the low byte: SCL on ADBUS0, SDA driven on ADBUS1 and
//! sampled on ADBUS2 (the two tied together on the cable form the
//! bidirectional data line).
//!
//! # Example
//!
//! ```no_run
//! use ri2c_core::address::SlaveAddress;
//! use ri2c_core::bus::{I2cSpeed, TransactionRequest};
//! use ri2c_core::engine::I2cEngine;
//! use ri2c_ftdi::{FtdiConfig, FtdiI2c};
//!
//! let mut dev = FtdiI2c::open(&FtdiConfig::default())?;
//! dev.configure(I2cSpeed::Standard100k)?;
//!
//! let mut engine = I2cEngine::new(&mut dev);
//! let data = engine.transaction(&TransactionRequest::read(SlaveAddress::new(0x3C), 1))?;
//! println!("{:02x?}", data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod device;
mod error;
mod protocol;

pub use device::{FtdiConfig, FtdiDeviceInfo, FtdiI2c};
pub use error::{FtdiError, Result};
pub use protocol::{identify_device, ChipCaps, FtdiChipType, FtdiInterface, SUPPORTED_DEVICES};
