//! Parser seam between a cable transport and message decoding.

use crate::transport::MidiTransport;

/// A protocol state machine driven by pulling bytes from a [`MidiTransport`].
pub trait MessageParser {
    /// Drop any partially decoded message and return to the idle state.
    fn reset(&mut self);

    /// Advance the state machine using whatever the transport has buffered.
    ///
    /// Returns `true` if a complete message was dispatched during this call.
    fn parse<T: MidiTransport>(&mut self, transport: &mut T) -> bool;
}
