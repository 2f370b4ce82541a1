//! ri2c-dummy - In-memory MPSSE and I2C slave emulator
//!
//! This crate provides a dummy transport that decodes the MPSSE command
//! stream byte for byte, tracks the SDA/SCL levels to detect start and stop
//! conditions, and emulates a configurable set of I2C slaves. It is useful
//! for testing the engine without real hardware.
//!
//! The emulator is deliberately strict: response data only becomes readable
//! after a `SEND_IMMEDIATE`, a command group split across two writes is an
//! error, and unknown opcodes are rejected. Every bus-level event is
//! recorded in a transcript for assertions.

use std::collections::{BTreeMap, VecDeque};

use ri2c_core::address::SlaveAddress;
use ri2c_core::error::{Error, Result};
use ri2c_core::mpsse::*;
use ri2c_core::transport::Transport;

/// Behavior of one emulated slave
#[derive(Debug, Clone, Default)]
pub struct SlaveConfig {
    /// Bytes served to master reads, in order; 0xFF once exhausted
    pub read_data: Vec<u8>,
    /// NAK the data byte at this zero-based position of a write phase
    pub nak_data_at: Option<usize>,
}

impl SlaveConfig {
    /// A slave that ACKs everything and reads back 0xFF
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these bytes to master reads
    pub fn with_read_data(mut self, data: &[u8]) -> Self {
        self.read_data = data.to_vec();
        self
    }

    /// Refuse the write data byte at `index`
    pub fn nak_data_at(mut self, index: usize) -> Self {
        self.nak_data_at = Some(index);
        self
    }
}

/// One observable event on the emulated bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// Start (or repeated start) condition
    Start,
    /// Stop condition
    Stop,
    /// Address byte in wire form, with the slave's response
    Address {
        /// The raw wire byte (7-bit address plus direction bit)
        raw: u8,
        /// Whether a slave acknowledged
        ack: bool,
    },
    /// Data byte written by the master, with the slave's response
    Write {
        /// The byte on the wire
        byte: u8,
        /// Whether the slave acknowledged
        ack: bool,
    },
    /// Data byte read by the master, with the master's acknowledge
    Read {
        /// The byte the slave drove
        byte: u8,
        /// Whether the master acknowledged (false on the final byte)
        master_ack: bool,
    },
}

#[derive(Debug)]
struct SlaveState {
    config: SlaveConfig,
    written: Vec<u8>,
    read_pos: usize,
}

/// Emulated MPSSE engine wired to a set of emulated I2C slaves
#[derive(Debug)]
pub struct DummyBus {
    slaves: BTreeMap<u8, SlaveState>,
    /// Line levels; `true` is high. Both idle high.
    sda: bool,
    scl: bool,
    /// The next clocked-out byte is an address byte
    expecting_address: bool,
    /// 7-bit address of the slave that ACKed the current transaction
    current: Option<u8>,
    /// Position of the next write data byte within the current phase
    data_index: usize,
    /// Acknowledge produced by the last clocked-out byte, consumed by the
    /// next bit-in command
    ack_pending: Option<bool>,
    /// Byte produced by the last byte-in command, consumed by the
    /// following master acknowledge bit
    last_read: Option<u8>,
    /// Response bytes queued by clock-in commands
    pending: Vec<u8>,
    /// Response bytes released to the host by SEND_IMMEDIATE
    ready: VecDeque<u8>,
    transcript: Vec<BusEvent>,
    divisor: Option<u16>,
    three_phase: bool,
    adaptive_disabled: bool,
    div5_disabled: bool,
    loopback_disabled: bool,
    open_drain_low: Option<u8>,
}

impl Default for DummyBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBus {
    /// Create an emulator with idle-high lines and no slaves
    pub fn new() -> Self {
        DummyBus {
            slaves: BTreeMap::new(),
            sda: true,
            scl: true,
            expecting_address: false,
            current: None,
            data_index: 0,
            ack_pending: None,
            last_read: None,
            pending: Vec::new(),
            ready: VecDeque::new(),
            transcript: Vec::new(),
            divisor: None,
            three_phase: false,
            adaptive_disabled: false,
            div5_disabled: false,
            loopback_disabled: false,
            open_drain_low: None,
        }
    }

    /// Attach a slave at the given address
    pub fn add_slave(&mut self, address: SlaveAddress, config: SlaveConfig) {
        self.slaves.insert(
            address.raw(),
            SlaveState {
                config,
                written: Vec::new(),
                read_pos: 0,
            },
        );
    }

    /// Everything that happened on the bus so far
    pub fn transcript(&self) -> &[BusEvent] {
        &self.transcript
    }

    /// Bytes a slave accepted so far
    pub fn written(&self, address: SlaveAddress) -> Option<&[u8]> {
        self.slaves
            .get(&address.raw())
            .map(|s| s.written.as_slice())
    }

    /// Programmed clock divisor, if any
    pub fn divisor(&self) -> Option<u16> {
        self.divisor
    }

    /// Whether 3-phase clocking was enabled
    pub fn three_phase(&self) -> bool {
        self.three_phase
    }

    /// Low-byte open-drain mask, if programmed
    pub fn open_drain_low(&self) -> Option<u8> {
        self.open_drain_low
    }

    /// Whether loopback was disabled
    pub fn loopback_disabled(&self) -> bool {
        self.loopback_disabled
    }

    /// Whether the divide-by-5 prescaler was disabled
    pub fn div5_disabled(&self) -> bool {
        self.div5_disabled
    }

    /// Whether adaptive clocking was disabled
    pub fn adaptive_disabled(&self) -> bool {
        self.adaptive_disabled
    }

    fn apply_lines(&mut self, value: u8) {
        let sda = value & PIN_SDA_OUT != 0;
        let scl = value & PIN_SCL != 0;

        if self.scl && scl {
            if self.sda && !sda {
                self.transcript.push(BusEvent::Start);
                self.expecting_address = true;
                self.current = None;
            } else if !self.sda && sda {
                self.transcript.push(BusEvent::Stop);
                self.expecting_address = false;
                self.current = None;
            }
        }

        self.sda = sda;
        self.scl = scl;
    }

    fn byte_out(&mut self, byte: u8) {
        if self.expecting_address {
            self.expecting_address = false;
            let address = byte >> 1;
            let ack = self.slaves.contains_key(&address);
            self.transcript.push(BusEvent::Address { raw: byte, ack });
            self.current = if ack { Some(address) } else { None };
            self.data_index = 0;
            self.ack_pending = Some(ack);
            return;
        }

        let ack = match self.current.and_then(|a| self.slaves.get_mut(&a)) {
            Some(slave) => {
                let refused = slave.config.nak_data_at == Some(self.data_index);
                if !refused {
                    slave.written.push(byte);
                }
                !refused
            }
            // nobody is driving the acknowledge; the line floats high
            None => false,
        };
        self.transcript.push(BusEvent::Write { byte, ack });
        self.data_index += 1;
        self.ack_pending = Some(ack);
    }

    fn byte_in(&mut self) -> u8 {
        match self.current.and_then(|a| self.slaves.get_mut(&a)) {
            Some(slave) => {
                let byte = slave
                    .config
                    .read_data
                    .get(slave.read_pos)
                    .copied()
                    .unwrap_or(0xFF);
                slave.read_pos += 1;
                byte
            }
            None => 0xFF,
        }
    }

    fn process(&mut self, data: &[u8]) -> Result<()> {
        let need = |i: usize, n: usize| {
            if i + n > data.len() {
                Err(Error::Transport(format!(
                    "command group split across batches at offset {}",
                    i
                )))
            } else {
                Ok(())
            }
        };

        let mut i = 0;
        while i < data.len() {
            match data[i] {
                SET_BITS_LOW => {
                    need(i, 3)?;
                    self.apply_lines(data[i + 1]);
                    i += 3;
                }
                CLOCK_BYTE_OUT_FALLING => {
                    need(i, 4)?;
                    if data[i + 1] != 0 || data[i + 2] != 0 {
                        return Err(Error::Transport(
                            "multi-byte clock-out not emulated".into(),
                        ));
                    }
                    self.byte_out(data[i + 3]);
                    i += 4;
                }
                CLOCK_BIT_IN_RISING => {
                    need(i, 2)?;
                    // the slave's acknowledge; a floating line reads high
                    let ack = self.ack_pending.take().unwrap_or(false);
                    self.pending.push(if ack { 0x00 } else { 0x01 });
                    i += 2;
                }
                CLOCK_BYTE_IN_FALLING => {
                    need(i, 3)?;
                    if data[i + 1] != 0 || data[i + 2] != 0 {
                        return Err(Error::Transport(
                            "multi-byte clock-in not emulated".into(),
                        ));
                    }
                    let byte = self.byte_in();
                    self.pending.push(byte);
                    self.last_read = Some(byte);
                    i += 3;
                }
                CLOCK_BIT_OUT_FALLING => {
                    need(i, 3)?;
                    // the master drives the MSB of the operand as its
                    // acknowledge bit: low is ACK, high is NAK
                    let master_ack = data[i + 2] & 0x80 == 0;
                    let byte = self.last_read.take().unwrap_or(0xFF);
                    self.transcript.push(BusEvent::Read { byte, master_ack });
                    i += 3;
                }
                SEND_IMMEDIATE => {
                    self.ready.extend(self.pending.drain(..));
                    i += 1;
                }
                SET_CLOCK_DIVISOR => {
                    need(i, 3)?;
                    self.divisor = Some(u16::from_le_bytes([data[i + 1], data[i + 2]]));
                    i += 3;
                }
                OPEN_DRAIN_ENABLE => {
                    need(i, 3)?;
                    self.open_drain_low = Some(data[i + 1]);
                    i += 3;
                }
                DISABLE_LOOPBACK => {
                    self.loopback_disabled = true;
                    i += 1;
                }
                DISABLE_CLOCK_DIV5 => {
                    self.div5_disabled = true;
                    i += 1;
                }
                ENABLE_3PHASE_CLOCK => {
                    self.three_phase = true;
                    i += 1;
                }
                DISABLE_ADAPTIVE_CLOCK => {
                    self.adaptive_disabled = true;
                    i += 1;
                }
                other => {
                    return Err(Error::Transport(format!(
                        "unsupported MPSSE opcode 0x{:02X} at offset {}",
                        other, i
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Transport for DummyBus {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        log::trace!("emulating {} command bytes", data.len());
        self.process(data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.ready.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.ready.pop_front().unwrap_or(0);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ri2c_core::bus::{EngineConfig, TransactionRequest};
    use ri2c_core::engine::I2cEngine;
    use ri2c_core::Error;

    const ADDR: SlaveAddress = SlaveAddress::new(0x3C);

    fn engine(bus: DummyBus) -> I2cEngine<DummyBus> {
        I2cEngine::with_config(bus, EngineConfig { hold_repeat: 3 })
    }

    fn count(events: &[BusEvent], wanted: BusEvent) -> usize {
        events.iter().filter(|&&e| e == wanted).count()
    }

    #[test]
    fn read_one_byte_returns_the_slave_payload() {
        let mut bus = DummyBus::new();
        bus.add_slave(ADDR, SlaveConfig::new().with_read_data(&[0xAB]));
        let mut eng = engine(bus);

        let data = eng
            .transaction(&TransactionRequest::read(ADDR, 1))
            .unwrap();
        assert_eq!(data, vec![0xAB]);

        let bus = eng.into_inner();
        assert_eq!(
            bus.transcript(),
            &[
                BusEvent::Start,
                BusEvent::Address { raw: 0x79, ack: true },
                BusEvent::Read {
                    byte: 0xAB,
                    master_ack: false
                },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn data_nak_stops_the_write_short() {
        let mut bus = DummyBus::new();
        bus.add_slave(ADDR, SlaveConfig::new().nak_data_at(1));
        let mut eng = engine(bus);

        let result = eng.transaction(&TransactionRequest::write(ADDR, vec![0x12, 0x34]));
        assert!(matches!(result, Err(Error::SlaveNakData { index: 1 })));

        let bus = eng.into_inner();
        assert_eq!(
            bus.transcript(),
            &[
                BusEvent::Start,
                BusEvent::Address { raw: 0x78, ack: true },
                BusEvent::Write {
                    byte: 0x12,
                    ack: true
                },
                BusEvent::Write {
                    byte: 0x34,
                    ack: false
                },
                BusEvent::Stop,
            ]
        );
        assert_eq!(bus.written(ADDR).unwrap(), &[0x12]);
    }

    #[test]
    fn address_nak_sends_no_payload() {
        let target = SlaveAddress::new(0x10);
        let mut eng = engine(DummyBus::new());

        let result = eng.transaction(&TransactionRequest::write(target, vec![0x12]));
        assert!(matches!(result, Err(Error::SlaveNakAddr(0x10))));

        let bus = eng.into_inner();
        assert_eq!(
            bus.transcript(),
            &[
                BusEvent::Start,
                BusEvent::Address {
                    raw: 0x20,
                    ack: false
                },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn write_then_read_uses_one_repeated_start() {
        let mut bus = DummyBus::new();
        bus.add_slave(ADDR, SlaveConfig::new().with_read_data(&[0xAA, 0xBB]));
        let mut eng = engine(bus);

        let data = eng
            .transaction(&TransactionRequest::write_read(ADDR, vec![0x00], 2))
            .unwrap();
        assert_eq!(data, vec![0xAA, 0xBB]);

        let bus = eng.into_inner();
        let events = bus.transcript();
        assert_eq!(count(events, BusEvent::Start), 2);
        assert_eq!(count(events, BusEvent::Stop), 1);
        assert_eq!(events.last(), Some(&BusEvent::Stop));
        assert_eq!(bus.written(ADDR).unwrap(), &[0x00]);
    }

    #[test]
    fn scan_finds_the_single_responder() {
        let mut bus = DummyBus::new();
        bus.add_slave(ADDR, SlaveConfig::new());
        let mut eng = engine(bus);

        let found = eng.scan().unwrap();
        assert_eq!(found, vec![ADDR]);

        // every probed address opens and closes its own transaction
        let bus = eng.into_inner();
        assert_eq!(count(bus.transcript(), BusEvent::Start), 0x7F);
        assert_eq!(count(bus.transcript(), BusEvent::Stop), 0x7F);
    }

    #[test]
    fn transcript_does_not_depend_on_the_hold_repeat() {
        let run = |hold_repeat: usize| {
            let mut bus = DummyBus::new();
            bus.add_slave(ADDR, SlaveConfig::new().nak_data_at(1));
            let mut eng = I2cEngine::with_config(bus, EngineConfig { hold_repeat });
            let _ = eng.transaction(&TransactionRequest::write(ADDR, vec![0x12, 0x34]));
            eng.into_inner().transcript().to_vec()
        };
        assert_eq!(run(1), run(40));
    }

    #[test]
    fn configure_programs_the_emulated_registers() {
        let mut eng = engine(DummyBus::new());
        eng.configure(ri2c_core::bus::I2cSpeed::Fast400k, true)
            .unwrap();

        let bus = eng.into_inner();
        assert_eq!(bus.divisor(), Some(0x004A));
        assert!(bus.three_phase());
        assert!(bus.div5_disabled());
        assert!(bus.adaptive_disabled());
        assert!(bus.loopback_disabled());
        assert_eq!(bus.open_drain_low(), Some(0x03));
    }

    #[test]
    fn reads_past_the_slave_data_float_high() {
        let mut bus = DummyBus::new();
        bus.add_slave(ADDR, SlaveConfig::new().with_read_data(&[0x42]));
        let mut eng = engine(bus);

        let data = eng
            .transaction(&TransactionRequest::read(ADDR, 3))
            .unwrap();
        assert_eq!(data, vec![0x42, 0xFF, 0xFF]);
    }

    #[test]
    fn split_command_groups_are_rejected() {
        let mut bus = DummyBus::new();
        assert!(matches!(
            bus.send(&[SET_BITS_LOW, 0x03]),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn unknown_opcodes_are_rejected() {
        let mut bus = DummyBus::new();
        assert!(matches!(bus.send(&[0x42]), Err(Error::Transport(_))));
    }
}
