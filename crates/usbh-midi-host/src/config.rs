//! Sizing of the static slot pool.
//!
//! Every buffer the host needs is allocated once when the registry is built from
//! a [`HostConfig`]. Nothing grows afterwards, so the numbers here are the whole
//! memory budget: `max_devices * max_cables * in_cable_buffer_size` bytes of
//! inbound FIFO plus one parser per cable.

use serde::{Deserialize, Serialize};
use usbh_midi_parser::ParserSettings;

use crate::error::{Error, Result};
use crate::types::MAX_CABLES;

pub const DEFAULT_MAX_DEVICES: usize = 4;

/// Highest address a USB host stack can assign.
pub const DEFAULT_MAX_DEVICE_ADDRESS: u8 = 127;

pub const DEFAULT_IN_CABLE_BUFFER_SIZE: usize = 128;

/// Inbound FIFO sizes are limited by the host stack's 16-bit byte counts.
const MAX_IN_CABLE_BUFFER_SIZE: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Devices tracked at the same time. Further connects are ignored.
    pub max_devices: usize,
    /// Connects from addresses above this are rejected.
    pub max_device_address: u8,
    /// Cables mapped per device. Data on higher cables is discarded.
    pub max_cables: usize,
    /// Inbound FIFO capacity of each cable, in bytes.
    pub in_cable_buffer_size: usize,
    pub parser: ParserSettings,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            max_device_address: DEFAULT_MAX_DEVICE_ADDRESS,
            max_cables: MAX_CABLES,
            in_cable_buffer_size: DEFAULT_IN_CABLE_BUFFER_SIZE,
            parser: ParserSettings::default(),
        }
    }
}

impl HostConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_devices == 0 {
            return Err(Error::InvalidConfig(
                "max_devices must be at least 1".to_string(),
            ));
        }
        if self.max_device_address == 0 {
            return Err(Error::InvalidConfig(
                "max_device_address must be at least 1".to_string(),
            ));
        }
        if self.max_cables == 0 || self.max_cables > MAX_CABLES {
            return Err(Error::InvalidConfig(format!(
                "max_cables must be between 1 and {}, got {}",
                MAX_CABLES, self.max_cables
            )));
        }
        if self.in_cable_buffer_size == 0 || self.in_cable_buffer_size > MAX_IN_CABLE_BUFFER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "in_cable_buffer_size must be between 1 and {}, got {}",
                MAX_IN_CABLE_BUFFER_SIZE, self.in_cable_buffer_size
            )));
        }
        self.parser.validate()?;
        Ok(())
    }

    /// Outbound buffer the host stack needs per device so that a maximum size
    /// SysEx fits in whole 4-byte USB MIDI event packets.
    ///
    /// Three payload bytes per packet, two extra for F0/F7, plus one spare packet.
    pub fn tx_buffer_size(&self) -> usize {
        (((self.parser.sysex_max_size + 2) / 3) + 1) * 4
    }

    /// Total inbound FIFO bytes the pool allocates.
    pub fn in_fifo_bytes(&self) -> usize {
        self.max_devices * self.max_cables * self.in_cable_buffer_size
    }
}
