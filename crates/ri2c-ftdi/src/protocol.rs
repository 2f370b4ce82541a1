//! FTDI device constants and the chip capability table

use bitflags::bitflags;

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// FT2232H product ID (dual channel)
pub const FTDI_FT2232H_PID: u16 = 0x6010;

/// FT4232H product ID (quad channel)
pub const FTDI_FT4232H_PID: u16 = 0x6011;

/// FT232H product ID (single channel)
pub const FTDI_FT232H_PID: u16 = 0x6014;

bitflags! {
    /// Capabilities that vary across chip variants, resolved once at open
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChipCaps: u32 {
        /// Hardware open-drain drive on the low-byte GPIO lines
        ///
        /// Without it the adapter drives the bus push-pull and line
        /// integrity depends on external open-drain wiring.
        const OPEN_DRAIN = 1 << 0;
    }
}

/// Supported FTDI chip variants
///
/// All of these are high-speed parts with a 60 MHz master clock and an
/// MPSSE engine; only the FT232H adds hardware open-drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiChipType {
    /// FT232H (single channel, hardware open-drain)
    #[default]
    Ft232H,
    /// FT2232H (dual channel)
    Ft2232H,
    /// FT4232H (quad channel)
    Ft4232H,
}

impl FtdiChipType {
    /// Get the vendor ID for this chip
    pub fn vendor_id(&self) -> u16 {
        FTDI_VID
    }

    /// Get the product ID for this chip
    pub fn product_id(&self) -> u16 {
        match self {
            FtdiChipType::Ft232H => FTDI_FT232H_PID,
            FtdiChipType::Ft2232H => FTDI_FT2232H_PID,
            FtdiChipType::Ft4232H => FTDI_FT4232H_PID,
        }
    }

    /// Get the number of MPSSE-capable channels
    pub fn channel_count(&self) -> u8 {
        match self {
            FtdiChipType::Ft232H => 1,
            FtdiChipType::Ft2232H => 2,
            // only channels A and B of the FT4232H carry an MPSSE engine
            FtdiChipType::Ft4232H => 2,
        }
    }

    /// Get the capability descriptor for this chip
    pub fn caps(&self) -> ChipCaps {
        match self {
            FtdiChipType::Ft232H => ChipCaps::OPEN_DRAIN,
            FtdiChipType::Ft2232H | FtdiChipType::Ft4232H => ChipCaps::empty(),
        }
    }

    /// Parse a chip type from a CLI string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "232h" | "ft232h" => Some(FtdiChipType::Ft232H),
            "2232h" | "ft2232h" => Some(FtdiChipType::Ft2232H),
            "4232h" | "ft4232h" => Some(FtdiChipType::Ft4232H),
            _ => None,
        }
    }

    /// Get the name of this chip
    pub fn name(&self) -> &'static str {
        match self {
            FtdiChipType::Ft232H => "FT232H",
            FtdiChipType::Ft2232H => "FT2232H",
            FtdiChipType::Ft4232H => "FT4232H",
        }
    }
}

/// FTDI interface/channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtdiInterface {
    /// Channel A (default)
    #[default]
    A,
    /// Channel B
    B,
    /// Channel C
    C,
    /// Channel D
    D,
}

impl FtdiInterface {
    /// Parse interface from character
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(FtdiInterface::A),
            'B' => Some(FtdiInterface::B),
            'C' => Some(FtdiInterface::C),
            'D' => Some(FtdiInterface::D),
            _ => None,
        }
    }

    /// Get the interface index (0-3)
    pub fn index(&self) -> u8 {
        match self {
            FtdiInterface::A => 0,
            FtdiInterface::B => 1,
            FtdiInterface::C => 2,
            FtdiInterface::D => 3,
        }
    }

    /// Get the channel letter
    pub fn letter(&self) -> char {
        match self {
            FtdiInterface::A => 'A',
            FtdiInterface::B => 'B',
            FtdiInterface::C => 'C',
            FtdiInterface::D => 'D',
        }
    }
}

/// A supported adapter for enumeration
pub struct SupportedDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub chip: FtdiChipType,
}

/// All adapters this backend can drive
pub const SUPPORTED_DEVICES: &[SupportedDevice] = &[
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: FTDI_FT232H_PID,
        chip: FtdiChipType::Ft232H,
    },
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: FTDI_FT2232H_PID,
        chip: FtdiChipType::Ft2232H,
    },
    SupportedDevice {
        vendor_id: FTDI_VID,
        product_id: FTDI_FT4232H_PID,
        chip: FtdiChipType::Ft4232H,
    },
];

/// Get the chip behind a VID/PID pair, if supported
pub fn identify_device(vid: u16, pid: u16) -> Option<FtdiChipType> {
    SUPPORTED_DEVICES
        .iter()
        .find(|d| d.vendor_id == vid && d.product_id == pid)
        .map(|d| d.chip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_ft232h_has_open_drain() {
        assert!(FtdiChipType::Ft232H.caps().contains(ChipCaps::OPEN_DRAIN));
        assert!(!FtdiChipType::Ft2232H.caps().contains(ChipCaps::OPEN_DRAIN));
        assert!(!FtdiChipType::Ft4232H.caps().contains(ChipCaps::OPEN_DRAIN));
    }

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!(FtdiChipType::parse("232h"), Some(FtdiChipType::Ft232H));
        assert_eq!(FtdiChipType::parse("FT2232H"), Some(FtdiChipType::Ft2232H));
        assert_eq!(FtdiChipType::parse("ft4232h"), Some(FtdiChipType::Ft4232H));
        assert_eq!(FtdiChipType::parse("232r"), None);
    }

    #[test]
    fn identify_covers_the_supported_table() {
        assert_eq!(
            identify_device(FTDI_VID, FTDI_FT232H_PID),
            Some(FtdiChipType::Ft232H)
        );
        assert_eq!(identify_device(0x1234, 0x5678), None);
    }
}
