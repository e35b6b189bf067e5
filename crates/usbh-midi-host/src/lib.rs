//! USB MIDI host session multiplexer.
//!
//! Turns the byte streams a USB host stack delivers for up to 16 virtual cables
//! per device into independent per-cable transports that a pull-based MIDI
//! parser can consume.
//!
//! - [`Registry`]: fixed pool of device slots, entry point for host events
//! - [`DeviceSlot`]: all cables of one connected device
//! - [`CableInterface`]: one cable's transport bound to its parser
//! - [`CableTransport`]: inbound FIFO and outbound stream writer for one cable
//! - [`MidiReceiver`]: the receive path, detachable from the registry so
//!   `rx_cb` and `read_all` can run in different contexts
//!
//! The host stack itself is abstracted by [`MidiHostStack`]. With the `sim`
//! feature (on by default), `sim::SimulatedHost` implements it in memory.
//!
//! # Example
//!
//! ```ignore
//! use usbh_midi_host::{HostCallbacks, RegistryBuilder};
//! use usbh_midi_host::sim::SimulatedHost;
//!
//! let host = SimulatedHost::new();
//! let mut registry = RegistryBuilder::new().max_devices(2).build(host.clone())?;
//!
//! registry.mount_cb(1, 0x81, 0x02, 1, 1);
//! if let Some(iface) = registry.interface_from_device_and_cable(1, 0) {
//!     iface.parser_mut().set_handle_message(|msg| println!("{msg:?}"));
//! }
//!
//! host.push_rx(1, 0, &[0x90, 0x3C, 0x7F]);
//! registry.rx_cb(1, 1);
//!
//! loop {
//!     registry.read_all();
//!     registry.write_flush_all();
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

mod cable;
mod config;
mod device;
mod host;
mod registry;
mod types;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use cable::{
    ByteFifo, CableInterface, CableTransport, FifoConsumer, FifoProducer, PLACEHOLDER_BYTE,
};
pub use config::{
    HostConfig, DEFAULT_IN_CABLE_BUFFER_SIZE, DEFAULT_MAX_DEVICES, DEFAULT_MAX_DEVICE_ADDRESS,
};
pub use device::{DeviceInlet, DeviceSlot, InWriteFailCallback};
pub use host::{HostCallbacks, MidiHostStack};
pub use registry::{
    is_message_available_on_cable, ConnectCallback, DisconnectCallback, MidiReceiver, ReadyMap,
    Registry, RegistryBuilder, RX_CHUNK_SIZE,
};
pub use types::{CableBitmap, CableNumber, DeviceAddress, MAX_CABLES, NO_CABLE, NO_DEVICE};

pub use usbh_midi_parser::{
    Channel, ChannelVoiceMsg, MessageParser, MidiMsg, MidiTransport, ParserSettings, StreamParser,
};
