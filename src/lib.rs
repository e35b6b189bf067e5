//! # usbh-midi - USB MIDI host session multiplexer
//!
//! Splits the byte streams of USB MIDI devices into independent per-device,
//! per-cable transports that a pull-based MIDI parser can consume.
//!
//! ## Architecture
//!
//! - **usbh-midi-parser** - transport contract, parser seam, MIDI 1.0 stream parser
//! - **usbh-midi-host** - byte FIFO, cable transport and interface, device slot, registry
//!
//! ## Quick Start
//!
//! ```ignore
//! use usbh_midi::prelude::*;
//!
//! let host = SimulatedHost::new();
//! let mut registry = RegistryBuilder::new().max_devices(2).build(host.clone())?;
//! registry.set_on_connect(|dev, n_in, n_out| println!("device {dev}: {n_in} in, {n_out} out"));
//!
//! // forward the host stack's callbacks
//! registry.mount_cb(1, 0x81, 0x02, 1, 1);
//! registry.rx_cb(1, 1);
//!
//! // main loop
//! let ready = registry.read_all();
//! registry.write_flush_all();
//! ```
//!
//! ## Feature Flags
//!
//! - `sim` (default) - `SimulatedHost`, an in-memory host stack

/// Re-export of usbh-midi-host for direct access
pub use usbh_midi_host as host;

/// Re-export of usbh-midi-parser for direct access
pub use usbh_midi_parser as parser;

pub use usbh_midi_host::{
    is_message_available_on_cable, ByteFifo, CableBitmap, CableInterface, CableNumber,
    CableTransport, DeviceAddress, DeviceInlet, DeviceSlot, HostCallbacks, HostConfig,
    MidiHostStack, MidiReceiver, ReadyMap, Registry, RegistryBuilder, MAX_CABLES, NO_CABLE,
    NO_DEVICE,
};

#[cfg(feature = "sim")]
pub use usbh_midi_host::sim;

pub use usbh_midi_parser::{
    Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MessageParser, MidiMsg,
    MidiTransport, ParserSettings, StreamParser, SystemCommonMsg, SystemRealTimeMsg,
};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{HostCallbacks, HostConfig, MidiReceiver, ReadyMap, Registry, RegistryBuilder};

    // Parser side
    pub use crate::{Channel, ChannelVoiceMsg, MessageParser, MidiMsg, MidiTransport};

    #[cfg(feature = "sim")]
    pub use crate::sim::SimulatedHost;
}
