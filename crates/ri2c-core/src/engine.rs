//! The I2C master engine
//!
//! [`I2cEngine`] encodes bus conditions and byte transfers into MPSSE
//! commands, batches them into a [`CommandBuffer`], executes round-trips
//! against the [`Transport`], and interprets acknowledge bits to drive the
//! transaction state machine.
//!
//! Everything is strictly sequential: one blocking write, then (when a
//! response is expected) one blocking read. No acknowledge bit is consulted
//! before its byte's round-trip completes, and a slave NAK always closes the
//! transaction with a stop condition before the error is returned.

use crate::address::SlaveAddress;
use crate::bus::{AckStatus, EngineConfig, I2cSpeed, TransactionRequest};
use crate::error::{Error, Result};
use crate::mpsse::*;
use crate::transport::Transport;

/// I2C bus master over an MPSSE command transport
///
/// The engine holds the transport for as long as it lives; pass `&mut dev`
/// to keep ownership at the call site (the blanket `Transport` impl for
/// `&mut T` covers that). Only one engine may drive a given transport at a
/// time.
pub struct I2cEngine<T> {
    transport: T,
    buf: CommandBuffer,
    hold_repeat: usize,
}

impl<T: Transport> I2cEngine<T> {
    /// Create an engine with default tunables
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    /// Create an engine with explicit tunables
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Self {
            transport,
            buf: CommandBuffer::new(),
            hold_repeat: config.hold_repeat.max(1),
        }
    }

    /// Give the transport back
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Queue one byte, dropping the whole batch on overflow
    ///
    /// A full buffer means the batch under construction is unsendable: a
    /// partial flush would hand the device half a command group. Nothing
    /// reaches the wire from an overflowing batch.
    fn append(&mut self, byte: u8) -> Result<()> {
        if let Err(e) = self.buf.append(byte) {
            self.buf.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Send the queued batch as one write and clear the buffer
    ///
    /// The buffer is cleared whether or not the write succeeds. An empty
    /// buffer is a no-op.
    fn execute(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        log::trace!("executing {} command bytes", self.buf.len());
        let result = self.transport.send(self.buf.as_bytes());
        self.buf.clear();
        result
    }

    /// Read exactly `buf.len()` response bytes
    fn recv_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = self.transport.recv(buf)?;
        if n != buf.len() {
            return Err(Error::Transport(format!(
                "short read: expected {} response bytes, got {}",
                buf.len(),
                n
            )));
        }
        Ok(())
    }

    /// Queue a set-levels command for SDA and SCL
    ///
    /// Both lines stay configured as outputs; releasing the bus relies on
    /// the hardware open-drain mode set up once at configuration time.
    fn set_lines(&mut self, sda: bool, scl: bool) -> Result<()> {
        let mut value = 0u8;
        if sda {
            value |= PIN_SDA_OUT;
        }
        if scl {
            value |= PIN_SCL;
        }
        self.append(SET_BITS_LOW)?;
        self.append(value)?;
        self.append(PIN_DIRECTIONS)
    }

    /// Queue a line state `hold_repeat` times to pace the edge
    fn hold_lines(&mut self, sda: bool, scl: bool) -> Result<()> {
        for _ in 0..self.hold_repeat {
            self.set_lines(sda, scl)?;
        }
        Ok(())
    }

    /// Queue a start condition: SDA falls while SCL is high
    pub fn start(&mut self) -> Result<()> {
        self.hold_lines(true, true)?;
        self.hold_lines(false, true)?;
        self.hold_lines(false, false)
    }

    /// Queue a stop condition: SDA rises while SCL is high
    pub fn stop(&mut self) -> Result<()> {
        self.hold_lines(false, false)?;
        self.hold_lines(false, true)?;
        self.hold_lines(true, true)
    }

    /// Clock one byte out and sample the slave's acknowledge bit
    ///
    /// Runs its own round-trip: the batch is flushed and exactly one
    /// response byte is read back. On Ack, SDA is re-asserted high before
    /// returning so the next byte starts from a driven line.
    pub fn send_byte(&mut self, byte: u8) -> Result<AckStatus> {
        self.append(CLOCK_BYTE_OUT_FALLING)?;
        // length 0x0000 clocks one byte
        self.append(0x00)?;
        self.append(0x00)?;
        self.append(byte)?;

        // release SDA so the slave can drive the acknowledge bit
        self.set_lines(true, false)?;

        self.append(CLOCK_BIT_IN_RISING)?;
        // length 0x00 samples one bit
        self.append(0x00)?;

        self.append(SEND_IMMEDIATE)?;
        self.execute()?;

        let mut response = [0u8; 1];
        self.recv_exact(&mut response)?;

        match AckStatus::from_response(response[0]) {
            AckStatus::Nak => Ok(AckStatus::Nak),
            AckStatus::Ack => {
                self.set_lines(true, false)?;
                self.execute()?;
                Ok(AckStatus::Ack)
            }
        }
    }

    /// Clock `n` bytes in, acknowledging each one except the last
    ///
    /// All `n` byte+ack command groups go out in one batch and the response
    /// comes back in one round-trip. The master NAKs the final byte to tell
    /// the slave to stop driving the bus.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if n == 0 {
            return Err(Error::InvalidLength);
        }

        for i in 0..n {
            self.append(CLOCK_BYTE_IN_FALLING)?;
            self.append(0x00)?;
            self.append(0x00)?;

            self.append(CLOCK_BIT_OUT_FALLING)?;
            self.append(0x00)?;
            self.append(if i == n - 1 { 0x80 } else { 0x00 })?;
        }

        self.append(SEND_IMMEDIATE)?;
        self.execute()?;

        let mut data = vec![0u8; n];
        self.recv_exact(&mut data)?;
        Ok(data)
    }

    /// Run one complete transaction
    ///
    /// Write-only, read-only, or write-then-read with a repeated start.
    /// Returns the bytes read (empty for write-only). A NAK terminates the
    /// transaction cleanly with a stop condition and is reported as
    /// [`Error::SlaveNakAddr`] or [`Error::SlaveNakData`].
    pub fn transaction(&mut self, req: &TransactionRequest) -> Result<Vec<u8>> {
        if req.write.is_none() && req.read_len.is_none() {
            return Err(Error::EmptyTransaction);
        }
        if req.read_len == Some(0) {
            return Err(Error::InvalidLength);
        }

        if let Some(payload) = req.write.as_deref() {
            log::debug!("writing {} bytes to slave {}", payload.len(), req.address);
            self.start()?;
            self.address_phase(req.address, req.address.write_address())?;

            for (index, &byte) in payload.iter().enumerate() {
                match self.send_byte(byte)? {
                    AckStatus::Ack => log::trace!("slave ACKed data byte 0x{:02X}", byte),
                    AckStatus::Nak => {
                        log::debug!("slave NAKed data byte {} (0x{:02X})", index, byte);
                        self.finish_with_stop()?;
                        return Err(Error::SlaveNakData { index });
                    }
                }
            }
        }

        let mut data = Vec::new();
        if let Some(n) = req.read_len {
            log::debug!("reading {} bytes from slave {}", n, req.address);
            // after a write phase this is the repeated start
            self.start()?;
            self.address_phase(req.address, req.address.read_address())?;
            data = self.read_bytes(n)?;
        }

        self.finish_with_stop()?;
        Ok(data)
    }

    /// Probe every 7-bit address and collect the responders
    ///
    /// Each address gets a start, its READ-form address byte, and a stop;
    /// no data phase. A NAK is the normal "nobody home" outcome, not an
    /// error.
    pub fn scan(&mut self) -> Result<Vec<SlaveAddress>> {
        let mut found = Vec::new();
        for raw in 0x00..0x7F {
            let address = SlaveAddress::new(raw);
            self.start()?;
            let ack = self.send_byte(address.read_address())?;
            self.finish_with_stop()?;
            if ack.is_ack() {
                log::debug!("slave ACKed address {}", address);
                found.push(address);
            } else {
                log::trace!("no response at address {}", address);
            }
        }
        Ok(found)
    }

    /// One-time clock and mode setup for I2C operation
    ///
    /// Disables the divide-by-5 prescaler and adaptive clocking, enables
    /// 3-phase data clocking, parks both lines at idle-high with fixed
    /// output directions, programs the clock divisor, optionally enables
    /// hardware open-drain on the bus lines, and disables loopback.
    pub fn configure(&mut self, speed: I2cSpeed, hw_open_drain: bool) -> Result<()> {
        log::debug!("configuring engine clock for {}", speed);
        self.append(DISABLE_CLOCK_DIV5)?;
        self.append(DISABLE_ADAPTIVE_CLOCK)?;
        self.append(ENABLE_3PHASE_CLOCK)?;
        self.execute()?;

        self.set_lines(true, true)?;

        let divisor = speed.divisor();
        self.append(SET_CLOCK_DIVISOR)?;
        self.append((divisor & 0xFF) as u8)?;
        self.append((divisor >> 8) as u8)?;
        self.execute()?;

        if hw_open_drain {
            log::debug!("enabling hardware open-drain on SDA/SCL");
            self.append(OPEN_DRAIN_ENABLE)?;
            self.append(PIN_SDA_OUT | PIN_SCL)?;
            self.append(0x00)?;
            self.execute()?;
        }

        self.append(DISABLE_LOOPBACK)?;
        self.execute()
    }

    fn address_phase(&mut self, address: SlaveAddress, wire_byte: u8) -> Result<()> {
        match self.send_byte(wire_byte)? {
            AckStatus::Ack => {
                log::trace!("slave ACKed address {}", address);
                Ok(())
            }
            AckStatus::Nak => {
                log::debug!("slave NAKed address {}", address);
                self.finish_with_stop()?;
                Err(Error::SlaveNakAddr(address.raw()))
            }
        }
    }

    fn finish_with_stop(&mut self) -> Result<()> {
        self.stop()?;
        self.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Records writes and serves canned responses
    #[derive(Default)]
    struct MockTransport {
        sent: Vec<Vec<u8>>,
        responses: VecDeque<Vec<u8>>,
    }

    impl MockTransport {
        fn respond(&mut self, bytes: &[u8]) {
            self.responses.push_back(bytes.to_vec());
        }

        /// All writes concatenated into one stream
        fn stream(&self) -> Vec<u8> {
            self.sent.iter().flatten().copied().collect()
        }
    }

    impl Transport for MockTransport {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.sent.push(data.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
            match self.responses.pop_front() {
                Some(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }

    /// Decode SET_BITS_LOW triplets from a command stream into value bytes
    fn line_states(stream: &[u8]) -> Vec<u8> {
        let mut states = Vec::new();
        let mut i = 0;
        while i < stream.len() {
            match stream[i] {
                SET_BITS_LOW => {
                    assert_eq!(stream[i + 2], PIN_DIRECTIONS);
                    states.push(stream[i + 1]);
                    i += 3;
                }
                CLOCK_BYTE_OUT_FALLING => i += 4,
                CLOCK_BYTE_IN_FALLING | CLOCK_BIT_OUT_FALLING => i += 3,
                CLOCK_BIT_IN_RISING => i += 2,
                SEND_IMMEDIATE => i += 1,
                other => panic!("unexpected opcode 0x{:02X}", other),
            }
        }
        states
    }

    fn dedup(states: Vec<u8>) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        for s in states {
            if out.last() != Some(&s) {
                out.push(s);
            }
        }
        out
    }

    fn engine(hold_repeat: usize) -> I2cEngine<MockTransport> {
        I2cEngine::with_config(MockTransport::default(), EngineConfig { hold_repeat })
    }

    #[test]
    fn start_stop_returns_lines_to_idle_high() {
        for hold_repeat in [1, 7, 40] {
            let mut eng = engine(hold_repeat);
            eng.start().unwrap();
            eng.stop().unwrap();
            eng.execute().unwrap();

            let states = line_states(&eng.transport.stream());
            assert_eq!(states.len(), 6 * hold_repeat);
            // only SDA/SCL bits are ever driven
            assert!(states.iter().all(|s| s & !(PIN_SDA_OUT | PIN_SCL) == 0));
            // both lines end high
            assert_eq!(*states.last().unwrap(), PIN_SDA_OUT | PIN_SCL);
            // the distinct sequence is independent of the repeat factor
            assert_eq!(
                dedup(states),
                vec![
                    PIN_SDA_OUT | PIN_SCL,
                    PIN_SCL,
                    0x00,
                    PIN_SCL,
                    PIN_SDA_OUT | PIN_SCL,
                ]
            );
        }
    }

    #[test]
    fn send_byte_encodes_transfer_release_and_sample() {
        let mut eng = engine(1);
        eng.transport.respond(&[0x00]);
        assert_eq!(eng.send_byte(0x55).unwrap(), AckStatus::Ack);

        // first batch: byte out, SDA release, ack sample, flush marker
        assert_eq!(
            eng.transport.sent[0],
            vec![
                CLOCK_BYTE_OUT_FALLING,
                0x00,
                0x00,
                0x55,
                SET_BITS_LOW,
                PIN_SDA_OUT,
                PIN_DIRECTIONS,
                CLOCK_BIT_IN_RISING,
                0x00,
                SEND_IMMEDIATE,
            ]
        );
        // second batch re-asserts SDA high after the Ack
        assert_eq!(
            eng.transport.sent[1],
            vec![SET_BITS_LOW, PIN_SDA_OUT, PIN_DIRECTIONS]
        );
    }

    #[test]
    fn send_byte_nak_skips_the_reassert_batch() {
        let mut eng = engine(1);
        eng.transport.respond(&[0x01]);
        assert_eq!(eng.send_byte(0xA0).unwrap(), AckStatus::Nak);
        assert_eq!(eng.transport.sent.len(), 1);
    }

    #[test]
    fn send_byte_without_response_is_a_transport_error() {
        let mut eng = engine(1);
        assert!(matches!(eng.send_byte(0x00), Err(Error::Transport(_))));
    }

    #[test]
    fn read_bytes_acks_all_but_the_last() {
        let mut eng = engine(1);
        eng.transport.respond(&[0x11, 0x22, 0x33]);
        let data = eng.read_bytes(3).unwrap();
        assert_eq!(data, vec![0x11, 0x22, 0x33]);

        let batch = &eng.transport.sent[0];
        let ack_bits: Vec<u8> = batch
            .chunks(6)
            .take(3)
            .map(|group| {
                assert_eq!(&group[..5], &[CLOCK_BYTE_IN_FALLING, 0x00, 0x00, CLOCK_BIT_OUT_FALLING, 0x00]);
                group[5]
            })
            .collect();
        assert_eq!(ack_bits, vec![0x00, 0x00, 0x80]);
        assert_eq!(*batch.last().unwrap(), SEND_IMMEDIATE);
    }

    #[test]
    fn single_byte_read_is_master_naked() {
        let mut eng = engine(1);
        eng.transport.respond(&[0xAB]);
        eng.read_bytes(1).unwrap();
        let batch = &eng.transport.sent[0];
        assert_eq!(batch[5], 0x80);
    }

    #[test]
    fn zero_length_read_is_rejected() {
        let mut eng = engine(1);
        assert!(matches!(eng.read_bytes(0), Err(Error::InvalidLength)));
        assert!(eng.transport.sent.is_empty());
    }

    #[test]
    fn short_read_is_a_transport_error() {
        let mut eng = engine(1);
        eng.transport.respond(&[0x11]);
        assert!(matches!(eng.read_bytes(2), Err(Error::Transport(_))));
    }

    #[test]
    fn overflowing_batch_sends_nothing() {
        // each line state costs 3 bytes; 6 * hold_repeat states per
        // start+stop pair, so this cannot fit in one buffer
        let mut eng = engine(COMMAND_BUFFER_SIZE);
        assert!(matches!(eng.start(), Err(Error::BufferFull)));
        assert!(eng.transport.sent.is_empty());
        assert!(eng.buf.is_empty());
    }

    #[test]
    fn empty_request_is_rejected() {
        let mut eng = engine(1);
        let req = TransactionRequest {
            address: SlaveAddress::new(0x3C),
            write: None,
            read_len: None,
        };
        assert!(matches!(eng.transaction(&req), Err(Error::EmptyTransaction)));
        assert!(eng.transport.sent.is_empty());
    }

    #[test]
    fn zero_length_read_request_touches_nothing() {
        let mut eng = engine(1);
        let req = TransactionRequest::read(SlaveAddress::new(0x3C), 0);
        assert!(matches!(eng.transaction(&req), Err(Error::InvalidLength)));
        assert!(eng.transport.sent.is_empty());
    }

    #[test]
    fn execute_with_empty_buffer_writes_nothing() {
        let mut eng = engine(1);
        eng.execute().unwrap();
        assert!(eng.transport.sent.is_empty());
    }

    #[test]
    fn configure_programs_divisor_little_endian() {
        let mut eng = engine(1);
        eng.configure(I2cSpeed::Standard100k, true).unwrap();
        let stream = eng.transport.stream();

        assert!(stream.starts_with(&[
            DISABLE_CLOCK_DIV5,
            DISABLE_ADAPTIVE_CLOCK,
            ENABLE_3PHASE_CLOCK,
        ]));
        let div_at = stream
            .iter()
            .position(|&b| b == SET_CLOCK_DIVISOR)
            .unwrap();
        assert_eq!(&stream[div_at..div_at + 3], &[SET_CLOCK_DIVISOR, 0x2B, 0x01]);
        let od_at = stream.iter().position(|&b| b == OPEN_DRAIN_ENABLE).unwrap();
        assert_eq!(
            &stream[od_at..od_at + 3],
            &[OPEN_DRAIN_ENABLE, PIN_SDA_OUT | PIN_SCL, 0x00]
        );
        assert_eq!(*stream.last().unwrap(), DISABLE_LOOPBACK);
    }

    #[test]
    fn configure_without_open_drain_skips_the_command() {
        let mut eng = engine(1);
        eng.configure(I2cSpeed::Fast400k, false).unwrap();
        let stream = eng.transport.stream();
        assert!(!stream.contains(&OPEN_DRAIN_ENABLE));
        let div_at = stream
            .iter()
            .position(|&b| b == SET_CLOCK_DIVISOR)
            .unwrap();
        assert_eq!(&stream[div_at..div_at + 3], &[SET_CLOCK_DIVISOR, 0x4A, 0x00]);
    }
}
