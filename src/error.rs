//! Centralized error type for the usbh-midi umbrella crate.
//!
//! Wraps the member crates' errors so `?` propagates across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] usbh_midi_host::Error),

    #[error("Parser: {0}")]
    Parser(#[from] usbh_midi_parser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
