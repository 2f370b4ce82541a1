//! FTDI MPSSE device implementation
//!
//! This module provides the `FtdiI2c` struct: opening and one-time setup of
//! the adapter, the byte `Transport` the engine drives, and USB enumeration
//! of supported adapters.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use ftdi::{find_by_vid_pid, BitMode, Device, Interface};
use ri2c_core::bus::I2cSpeed;
use ri2c_core::engine::I2cEngine;
use ri2c_core::error::Error as CoreError;
use ri2c_core::mpsse::SET_BITS_LOW;
use ri2c_core::transport::Transport;

use crate::error::{FtdiError, Result};
use crate::protocol::*;

/// Latency timer in milliseconds
///
/// Response data here is small (ack bits, short reads) and ack-paced, so a
/// relaxed timer is fine; it bounds how long a short response can sit in
/// the chip before being returned.
const LATENCY_TIMER_MS: u8 = 16;

/// Default bound on one blocking response read
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);

/// Poll interval while waiting for response bytes
const READ_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Configuration for opening an FTDI adapter
#[derive(Debug, Clone)]
pub struct FtdiConfig {
    /// Chip variant (determines VID/PID and capabilities)
    pub chip: FtdiChipType,
    /// Interface/channel to use (A, B on multi-channel parts)
    pub interface: FtdiInterface,
    /// Bound on one blocking response read
    pub read_timeout: Duration,
}

impl Default for FtdiConfig {
    fn default() -> Self {
        FtdiConfig {
            chip: FtdiChipType::default(),
            interface: FtdiInterface::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl FtdiConfig {
    /// Create a config for a specific chip variant
    pub fn for_chip(chip: FtdiChipType) -> Self {
        FtdiConfig {
            chip,
            ..FtdiConfig::default()
        }
    }

    /// Set the interface/channel, validated against the chip's channel count
    pub fn interface(mut self, interface: FtdiInterface) -> Result<Self> {
        let max_channel = self.chip.channel_count();
        if interface.index() >= max_channel {
            return Err(FtdiError::InvalidChannel(format!(
                "channel {} not available on {} (max: {})",
                interface.letter(),
                self.chip.name(),
                (b'A' + max_channel - 1) as char
            )));
        }
        self.interface = interface;
        Ok(self)
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// An open FTDI adapter in MPSSE mode
///
/// Created by [`FtdiI2c::open`], then put into I2C shape once with
/// [`FtdiI2c::configure`]. Implements [`Transport`], so an
/// [`I2cEngine`] can borrow it for transactions.
pub struct FtdiI2c {
    device: Device,
    chip: FtdiChipType,
    caps: ChipCaps,
    read_timeout: Duration,
}

impl FtdiI2c {
    /// Open an FTDI adapter with the given configuration
    ///
    /// Opens by VID/PID and channel, resets the device, drains any stale
    /// bytes from the receive queue, sets the latency timer, and switches
    /// the channel into MPSSE mode. The engine clock is not touched until
    /// [`configure`](Self::configure).
    pub fn open(config: &FtdiConfig) -> Result<Self> {
        log::info!(
            "opening FTDI {} channel {}",
            config.chip.name(),
            config.interface.letter()
        );

        let interface = match config.interface {
            FtdiInterface::A => Interface::A,
            FtdiInterface::B => Interface::B,
            FtdiInterface::C => Interface::C,
            FtdiInterface::D => Interface::D,
        };

        let vid = config.chip.vendor_id();
        let pid = config.chip.product_id();
        log::debug!("looking for FTDI device VID={:04X} PID={:04X}", vid, pid);

        let mut device = find_by_vid_pid(vid, pid)
            .interface(interface)
            .open()
            .map_err(|e| FtdiError::OpenFailed(format!("{}", e)))?;

        device
            .usb_reset()
            .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;

        device
            .set_latency_timer(LATENCY_TIMER_MS)
            .map_err(|e| FtdiError::ConfigFailed(format!("set latency timer failed: {}", e)))?;

        device
            .set_bitmode(0x00, BitMode::Reset)
            .map_err(|e| FtdiError::ConfigFailed(format!("bit mode reset failed: {}", e)))?;

        device
            .set_bitmode(0x00, BitMode::Mpsse)
            .map_err(|e| FtdiError::ConfigFailed(format!("set MPSSE mode failed: {}", e)))?;

        let mut ftdi = FtdiI2c {
            device,
            chip: config.chip,
            caps: config.chip.caps(),
            read_timeout: config.read_timeout,
        };
        ftdi.drain_stale();

        Ok(ftdi)
    }

    /// Open the default adapter (FT232H, channel A)
    pub fn open_first() -> Result<Self> {
        Self::open(&FtdiConfig::default())
    }

    /// One-time I2C setup of the MPSSE engine
    ///
    /// Programs the clock for the requested bus speed, enables 3-phase
    /// clocking, parks both lines at idle-high, and enables hardware
    /// open-drain when the chip supports it. On chips without that
    /// capability a warning is emitted: the lines are driven push-pull and
    /// bus integrity depends on external open-drain wiring.
    pub fn configure(&mut self, speed: I2cSpeed) -> ri2c_core::Result<()> {
        let open_drain = self.caps.contains(ChipCaps::OPEN_DRAIN);
        if !open_drain {
            log::warn!(
                "{} has no hardware open-drain; SDA/SCL integrity depends on external open-drain wiring",
                self.chip.name()
            );
        }

        let chip_name = self.chip.name();
        let mut engine = I2cEngine::new(&mut *self);
        engine.configure(speed, open_drain)?;

        log::info!("{} configured for I2C at {}", chip_name, speed);
        Ok(())
    }

    /// The capability descriptor resolved at open
    pub fn caps(&self) -> ChipCaps {
        self.caps
    }

    /// Best-effort drain of stale bytes left in the receive queue
    ///
    /// libftdi reads return 0 once the queue is dry; failures are ignored.
    fn drain_stale(&mut self) {
        let mut scratch = [0u8; 256];
        let mut drained = 0usize;
        loop {
            match self.device.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }
        if drained > 0 {
            log::debug!("drained {} stale bytes from receive queue", drained);
        }
    }

    /// Release the I/O pins (all inputs)
    fn release_pins(&mut self) -> Result<()> {
        let buf = [SET_BITS_LOW, 0x00, 0x00];
        self.device
            .write_all(&buf)
            .map_err(|e| FtdiError::TransferFailed(format!("write failed: {}", e)))
    }

    /// List connected supported adapters
    pub fn list_devices() -> Result<Vec<FtdiDeviceInfo>> {
        let mut devices = Vec::new();

        let iter = nusb::list_devices().map_err(|e| FtdiError::UsbError(e.to_string()))?;
        for dev in iter {
            let vid = dev.vendor_id();
            let pid = dev.product_id();

            if let Some(chip) = identify_device(vid, pid) {
                devices.push(FtdiDeviceInfo {
                    bus: dev.bus_number(),
                    address: dev.device_address(),
                    vendor_id: vid,
                    product_id: pid,
                    chip,
                    serial: dev.serial_number().map(str::to_string),
                });
            }
        }

        Ok(devices)
    }
}

impl Drop for FtdiI2c {
    fn drop(&mut self) {
        if let Err(e) = self.release_pins() {
            log::warn!("failed to release pins on close: {}", e);
        }
    }
}

impl Transport for FtdiI2c {
    fn send(&mut self, data: &[u8]) -> ri2c_core::Result<()> {
        self.device
            .write_all(data)
            .map_err(|e| CoreError::Transport(format!("write failed: {}", e)))?;
        log::trace!("sent {} bytes", data.len());
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> ri2c_core::Result<usize> {
        let deadline = Instant::now() + self.read_timeout;
        let mut total = 0;

        while total < buf.len() {
            match self.device.read(&mut buf[total..]) {
                Ok(0) => {
                    if Instant::now() >= deadline {
                        return Err(CoreError::Transport(format!(
                            "read timed out after {:?} ({}/{} bytes)",
                            self.read_timeout,
                            total,
                            buf.len()
                        )));
                    }
                    std::thread::sleep(READ_POLL_INTERVAL);
                }
                Ok(n) => total += n,
                Err(e) => {
                    return Err(CoreError::Transport(format!("read failed: {}", e)));
                }
            }
        }

        log::trace!("received {} bytes", total);
        Ok(total)
    }
}

/// Information about a connected adapter
#[derive(Debug, Clone)]
pub struct FtdiDeviceInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// Vendor ID
    pub vendor_id: u16,
    /// Product ID
    pub product_id: u16,
    /// Chip variant
    pub chip: FtdiChipType,
    /// Serial number, if the descriptor carries one
    pub serial: Option<String>,
}

impl std::fmt::Display for FtdiDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at bus {} address {} ({:04X}:{:04X}) serial {}",
            self.chip.name(),
            self.bus,
            self.address,
            self.vendor_id,
            self.product_id,
            self.serial.as_deref().unwrap_or("-")
        )
    }
}
