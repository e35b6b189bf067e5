//! Registry builder.

use usbh_midi_parser::{MessageParser, ParserSettings, StreamParser};

use super::Registry;
use crate::config::HostConfig;
use crate::error::Result;
use crate::host::MidiHostStack;
use crate::types::DeviceAddress;

/// Fluent construction of a [`Registry`]. Validation happens in `build`.
///
/// ```ignore
/// let registry = RegistryBuilder::new()
///     .max_devices(2)
///     .in_cable_buffer_size(256)
///     .build(host)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    config: HostConfig,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every setting at once, e.g. with a deserialized config.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_devices(mut self, max_devices: usize) -> Self {
        self.config.max_devices = max_devices;
        self
    }

    pub fn max_device_address(mut self, max_device_address: DeviceAddress) -> Self {
        self.config.max_device_address = max_device_address;
        self
    }

    pub fn max_cables(mut self, max_cables: usize) -> Self {
        self.config.max_cables = max_cables;
        self
    }

    pub fn in_cable_buffer_size(mut self, size: usize) -> Self {
        self.config.in_cable_buffer_size = size;
        self
    }

    pub fn parser_settings(mut self, settings: ParserSettings) -> Self {
        self.config.parser = settings;
        self
    }

    pub fn sysex_max_size(mut self, size: usize) -> Self {
        self.config.parser.sysex_max_size = size;
        self
    }

    pub fn one_byte_parsing(mut self, enabled: bool) -> Self {
        self.config.parser.one_byte_parsing = enabled;
        self
    }

    pub fn build<H: MidiHostStack>(self, host: H) -> Result<Registry<H, StreamParser>> {
        Registry::new(host, self.config)
    }

    /// Build with a custom parser. `new_parser` runs once per cable of every slot.
    pub fn build_with_parser<H, P, F>(self, host: H, new_parser: F) -> Result<Registry<H, P>>
    where
        H: MidiHostStack,
        P: MessageParser,
        F: FnMut() -> P,
    {
        Registry::with_parser(host, self.config, new_parser)
    }
}
