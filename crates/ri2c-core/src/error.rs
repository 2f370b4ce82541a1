//! Error types for I2C engine operations

use thiserror::Error;

/// Result type alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running an I2C transaction
#[derive(Debug, Error)]
pub enum Error {
    /// The command buffer has no room for another byte
    ///
    /// The transaction is aborted; nothing from the overflowing batch is
    /// sent to the device.
    #[error("command buffer full")]
    BufferFull,

    /// I/O failure or timeout talking to the device
    ///
    /// Fatal for the current transaction. The device handle itself may
    /// still be usable for a fresh transaction.
    #[error("transport error: {0}")]
    Transport(String),

    /// The slave did not acknowledge its address
    #[error("slave NAKed address 0x{0:02X}")]
    SlaveNakAddr(u8),

    /// The slave did not acknowledge a data byte
    ///
    /// Bytes before `index` were accepted; the transaction was closed with
    /// a stop condition.
    #[error("slave NAKed data byte {index}")]
    SlaveNakData {
        /// Zero-based position of the refused byte in the write payload
        index: usize,
    },

    /// A read of zero bytes was requested
    #[error("read length must be at least 1")]
    InvalidLength,

    /// The request carries neither a write payload nor a read length
    #[error("transaction has nothing to write and nothing to read")]
    EmptyTransaction,

    /// Device open or setup failed before any transaction was attempted
    #[error("configuration failed: {0}")]
    Config(String),
}
