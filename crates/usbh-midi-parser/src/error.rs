//! Error types for the MIDI stream parser.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI decode error: {0}")]
    Decode(String),

    #[error("SysEx message exceeds {max} bytes")]
    SysExOverflow { max: usize },

    #[error("SysEx interrupted by status byte {status:#04x}")]
    SysExInterrupted { status: u8 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl From<midi_msg::ParseError> for Error {
    fn from(e: midi_msg::ParseError) -> Self {
        Error::Decode(format!("{e:?}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
