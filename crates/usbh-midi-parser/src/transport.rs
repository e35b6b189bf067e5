//! Pull-based byte transport contract.
//!
//! A parser never receives bytes pushed at it. It asks its transport how many
//! bytes are buffered and pulls them one at a time, and it writes outbound bytes
//! one at a time between `begin_transmission` and `end_transmission`.

/// Byte stream a [`MessageParser`](crate::MessageParser) reads from and writes to.
///
/// Implementations must be non-blocking: every method returns immediately.
pub trait MidiTransport {
    /// Echo received bytes back out. Transports that cannot do this keep the default.
    const THRU_ACTIVATED: bool = false;

    /// Reset the inbound side to empty.
    fn begin(&mut self);

    /// Detach the transport from whatever it was bound to.
    fn end(&mut self);

    /// Number of bytes that can be read right now.
    fn available(&self) -> usize;

    /// Pop one byte.
    ///
    /// Only meaningful after `available()` reported data. On an empty stream the
    /// returned byte is a placeholder and must not be treated as payload.
    fn read(&mut self) -> u8;

    /// Queue one outbound byte. Failures are latched by the transport, not returned.
    fn write(&mut self, byte: u8);

    /// Returns `false` if outbound bytes cannot be accepted right now.
    fn begin_transmission(&mut self) -> bool;

    fn end_transmission(&mut self);
}

impl<T: MidiTransport> MidiTransport for &mut T {
    const THRU_ACTIVATED: bool = T::THRU_ACTIVATED;

    fn begin(&mut self) {
        (**self).begin()
    }

    fn end(&mut self) {
        (**self).end()
    }

    fn available(&self) -> usize {
        (**self).available()
    }

    fn read(&mut self) -> u8 {
        (**self).read()
    }

    fn write(&mut self, byte: u8) {
        (**self).write(byte)
    }

    fn begin_transmission(&mut self) -> bool {
        (**self).begin_transmission()
    }

    fn end_transmission(&mut self) {
        (**self).end_transmission()
    }
}

/// In-memory transport backed by a byte slice, for tests and offline parsing.
#[derive(Debug, Default, Clone)]
pub struct SliceTransport<'a> {
    input: &'a [u8],
    pos: usize,
    output: Vec<u8>,
}

impl<'a> SliceTransport<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            output: Vec::new(),
        }
    }

    /// Bytes written through the transport so far.
    pub fn written(&self) -> &[u8] {
        &self.output
    }
}

impl MidiTransport for SliceTransport<'_> {
    fn begin(&mut self) {
        self.pos = self.input.len();
    }

    fn end(&mut self) {
        self.pos = self.input.len();
        self.output.clear();
    }

    fn available(&self) -> usize {
        self.input.len() - self.pos
    }

    fn read(&mut self) -> u8 {
        match self.input.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                byte
            }
            None => 0,
        }
    }

    fn write(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn begin_transmission(&mut self) -> bool {
        true
    }

    fn end_transmission(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_transport_reads_in_order() {
        let mut t = SliceTransport::new(&[0x90, 0x3C, 0x7F]);
        assert_eq!(t.available(), 3);
        assert_eq!(t.read(), 0x90);
        assert_eq!(t.read(), 0x3C);
        assert_eq!(t.read(), 0x7F);
        assert_eq!(t.available(), 0);
        assert_eq!(t.read(), 0);
    }

    #[test]
    fn test_slice_transport_write() {
        let mut t = SliceTransport::new(&[]);
        assert!(t.begin_transmission());
        t.write(0xF8);
        t.end_transmission();
        assert_eq!(t.written(), &[0xF8]);
    }

    #[test]
    fn test_begin_discards_pending_input() {
        let mut t = SliceTransport::new(&[1, 2, 3]);
        t.read();
        t.begin();
        assert_eq!(t.available(), 0);
    }
}
