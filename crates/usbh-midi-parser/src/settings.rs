//! Parser settings.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default upper bound on a buffered SysEx message, F0 and F7 included.
pub const DEFAULT_SYSEX_MAX_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Consume at most one byte per `parse` call instead of running until a
    /// message completes.
    pub one_byte_parsing: bool,
    pub sysex_max_size: usize,
    /// Report Note On with velocity 0 as Note Off. Off by default because some
    /// control surface protocols treat the two differently.
    pub null_velocity_note_on_as_note_off: bool,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            one_byte_parsing: false,
            sysex_max_size: DEFAULT_SYSEX_MAX_SIZE,
            null_velocity_note_on_as_note_off: false,
        }
    }
}

impl ParserSettings {
    pub fn validate(&self) -> Result<()> {
        if self.sysex_max_size < 2 {
            return Err(Error::InvalidConfig(format!(
                "sysex_max_size must hold at least F0 and F7, got {}",
                self.sysex_max_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = ParserSettings::default();
        assert!(settings.validate().is_ok());
        assert!(!settings.one_byte_parsing);
        assert!(!settings.null_velocity_note_on_as_note_off);
        assert_eq!(settings.sysex_max_size, 128);
    }

    #[test]
    fn test_tiny_sysex_buffer_rejected() {
        let settings = ParserSettings {
            sysex_max_size: 1,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }
}
