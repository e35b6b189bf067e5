//! Error types for the USB MIDI host layer.
//!
//! Only construction and configuration return errors. The data path reports
//! failures through transport flags and the registry's failure callback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Parser error: {0}")]
    Parser(#[from] usbh_midi_parser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
