//! ri2c-core - I2C bus mastering over an MPSSE command engine
//!
//! This crate turns a clocked-command serial engine (FTDI MPSSE and
//! compatibles) into an I2C bus master. It encodes start/stop conditions and
//! byte transfers into engine opcodes, batches them into bounded command
//! buffers, and interprets acknowledge bits to run complete transactions:
//! writes, reads, write-then-read with a repeated start, and a full bus
//! presence scan.
//!
//! The hardware seam is the [`transport::Transport`] trait - one blocking
//! write of a command batch, one bounded blocking read of the response.
//! Backends (real USB devices, emulators) live in their own crates.
//!
//! # Example
//!
//! ```ignore
//! use ri2c_core::address::SlaveAddress;
//! use ri2c_core::bus::{I2cSpeed, TransactionRequest};
//! use ri2c_core::engine::I2cEngine;
//!
//! let mut engine = I2cEngine::new(&mut device);
//! engine.configure(I2cSpeed::Standard100k, true)?;
//!
//! // register-pointer write, repeated start, 4-byte read
//! let req = TransactionRequest::write_read(SlaveAddress::new(0x3C), vec![0x00], 4);
//! let data = engine.transaction(&req)?;
//! # Ok::<(), ri2c_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod address;
pub mod bus;
pub mod engine;
pub mod error;
pub mod mpsse;
pub mod transport;

pub use error::{Error, Result};
