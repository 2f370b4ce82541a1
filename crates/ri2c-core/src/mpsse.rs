//! MPSSE command protocol constants and the bounded command buffer
//!
//! Commands are queued host-side into a [`CommandBuffer`] and shipped to the
//! device as one write. The engine executes the batch in order; responses
//! (ack bits, read data) come back over the same pipe after a
//! [`SEND_IMMEDIATE`].

use crate::error::{Error, Result};

// ============================================================================
// MPSSE command opcodes
// ============================================================================

/// Clock out one data byte, MSB first, on the falling clock edge
pub const CLOCK_BYTE_OUT_FALLING: u8 = 0x11;

/// Clock out N+1 bits, MSB first, on the falling clock edge
pub const CLOCK_BIT_OUT_FALLING: u8 = 0x13;

/// Clock in one data byte on the falling clock edge
pub const CLOCK_BYTE_IN_FALLING: u8 = 0x20;

/// Clock in N+1 bits on the rising clock edge
pub const CLOCK_BIT_IN_RISING: u8 = 0x22;

/// Set output levels and directions of the low 8 GPIO lines
pub const SET_BITS_LOW: u8 = 0x80;

/// Disable internal loopback
pub const DISABLE_LOOPBACK: u8 = 0x85;

/// Set clock divisor (followed by 2 bytes, little-endian)
pub const SET_CLOCK_DIVISOR: u8 = 0x86;

/// Flush queued response data back to the host now
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Disable the divide-by-5 prescaler (full-rate master clock)
pub const DISABLE_CLOCK_DIV5: u8 = 0x8A;

/// Enable 3-phase data clocking (data transitions on a different edge
/// than the sampling edge)
pub const ENABLE_3PHASE_CLOCK: u8 = 0x8C;

/// Disable adaptive clocking
pub const DISABLE_ADAPTIVE_CLOCK: u8 = 0x97;

/// Enable hardware open-drain on selected low-byte lines (chip-dependent)
pub const OPEN_DRAIN_ENABLE: u8 = 0x9E;

// ============================================================================
// Pin assignments (low byte)
//
// SCL is bit 0 (TCK). SDA uses two pins tied together on the cable:
// bit 1 (TDI) drives the line, bit 2 (TDO) samples it.
// ============================================================================

/// Clock line (ADBUS0)
pub const PIN_SCL: u8 = 1 << 0;

/// Data output line (ADBUS1)
pub const PIN_SDA_OUT: u8 = 1 << 1;

/// Data input line (ADBUS2)
pub const PIN_SDA_IN: u8 = 1 << 2;

/// Fixed direction byte: SCL and SDA-out driven, SDA-in and the rest inputs
pub const PIN_DIRECTIONS: u8 = PIN_SDA_OUT | PIN_SCL;

/// Capacity of one command batch in bytes
pub const COMMAND_BUFFER_SIZE: usize = 1024;

/// Bounded, append-only batch of MPSSE command bytes
///
/// One buffer holds the commands for one round-trip to the device. Appending
/// past capacity is an error, never a silent truncation. A multi-byte
/// opcode+operand group must never be split across two batches: the device
/// sees a plain byte stream and respects no command boundaries.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    bytes: heapless::Vec<u8, COMMAND_BUFFER_SIZE>,
}

impl CommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one command or operand byte
    pub fn append(&mut self, byte: u8) -> Result<()> {
        self.bytes.push(byte).map_err(|_| Error::BufferFull)
    }

    /// Number of queued bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The queued bytes, in append order
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Discard all queued bytes
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
