//! A cable transport bound to its parser.

use usbh_midi_parser::{MessageParser, MidiMsg, MidiTransport};

use super::transport::CableTransport;
use crate::host::MidiHostStack;

/// The application-facing end of one virtual cable.
///
/// Owns the cable's transport and one parser instance. Register message
/// handlers on the parser (`parser_mut()`), then let `Registry::read_all`
/// drive it, or call [`read`](Self::read) directly.
pub struct CableInterface<P: MessageParser, H: MidiHostStack> {
    transport: CableTransport<H>,
    parser: P,
}

impl<P: MessageParser, H: MidiHostStack> CableInterface<P, H> {
    pub fn new(transport: CableTransport<H>, parser: P) -> Self {
        Self { transport, parser }
    }

    /// Reset the parser and empty the inbound FIFO. Called on every (re)connect.
    pub fn begin(&mut self) {
        self.transport.begin();
        self.parser.reset();
    }

    /// Drive the parser one message step. Returns `true` if a message was dispatched.
    pub fn read(&mut self) -> bool {
        self.parser.parse(&mut self.transport)
    }

    /// Send raw bytes. Stops at the first byte the host stack refuses.
    ///
    /// Returns `false` if the transmission could not start or was cut short;
    /// poll `transport().out_overflow()` and retry later.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> bool {
        if !self.transport.begin_transmission() {
            return false;
        }
        let mut complete = true;
        for &byte in bytes {
            self.transport.write(byte);
            if self.transport.out_overflow() {
                complete = false;
                break;
            }
        }
        self.transport.end_transmission();
        complete
    }

    pub fn send(&mut self, msg: &MidiMsg) -> bool {
        self.send_bytes(&msg.to_midi())
    }

    pub fn transport(&self) -> &CableTransport<H> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut CableTransport<H> {
        &mut self.transport
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub fn parser_mut(&mut self) -> &mut P {
        &mut self.parser
    }
}

impl<P, H> std::fmt::Debug for CableInterface<P, H>
where
    P: MessageParser + std::fmt::Debug,
    H: MidiHostStack,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CableInterface")
            .field("transport", &self.transport)
            .field("parser", &self.parser)
            .finish()
    }
}
