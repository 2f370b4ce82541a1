//! Byte transport to the engine
//!
//! The engine speaks to the device through this seam: one blocking write of
//! a command batch, then (when a response is expected) a bounded blocking
//! read. Backends decide how the bytes move; the engine owns the framing.

use crate::error::Result;

/// A blocking byte pipe to the command engine
pub trait Transport {
    /// Write all of `data` as one unit
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` response bytes, bounded by the backend's
    /// read timeout; returns the number of bytes placed in `buf`
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).recv(buf)
    }
}
