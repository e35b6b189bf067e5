//! MIDI 1.0 byte-stream parsing over a pull-based transport.
//!
//! A [`MidiTransport`] buffers raw bytes; a [`MessageParser`] pulls them and
//! dispatches complete messages. [`StreamParser`] is the built-in parser and
//! produces [`MidiMsg`] values.
//!
//! # Example
//!
//! ```ignore
//! use usbh_midi_parser::{MessageParser, SliceTransport, StreamParser};
//!
//! let mut parser = StreamParser::default();
//! parser.set_handle_message(|msg| println!("{msg:?}"));
//!
//! let mut transport = SliceTransport::new(&[0x90, 0x3C, 0x7F]);
//! while parser.parse(&mut transport) {}
//! ```

pub mod error;
pub use error::{Error, Result};

mod parser;
mod settings;
mod stream;
mod transport;

pub use parser::MessageParser;
pub use settings::{ParserSettings, DEFAULT_SYSEX_MAX_SIZE};
pub use stream::StreamParser;
pub use transport::{MidiTransport, SliceTransport};

// Re-export the message types parsers produce (users shouldn't need midi-msg directly)
pub use midi_msg::{
    Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg, SystemCommonMsg,
    SystemRealTimeMsg,
};
