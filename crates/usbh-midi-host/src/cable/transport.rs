//! One virtual cable's byte channel.
//!
//! - Inbound: host receive path (producer) -> FIFO -> parser (consumer)
//! - Outbound: parser or application -> host stack stream writer, one byte at a time
//!
//! The transport holds only the consumer half of its inbound FIFO. The
//! producer half lives with the receive path (`DeviceInlet`), so bytes can be
//! stored while the parser drains.
//!
//! Failures are latched in flags and never returned as errors. Callers poll
//! `in_overflow`, `in_underflow` and `out_overflow` between operations.

use usbh_midi_parser::MidiTransport;

use super::fifo::FifoConsumer;
use crate::host::MidiHostStack;
use crate::types::{CableNumber, DeviceAddress, NO_CABLE, NO_DEVICE};

/// Returned by `read` when nothing could be read. Never valid payload.
pub const PLACEHOLDER_BYTE: u8 = 0;

pub struct CableTransport<H: MidiHostStack> {
    host: H,
    dev_addr: DeviceAddress,
    cable: CableNumber,
    has_in: bool,
    has_out: bool,
    in_fifo: FifoConsumer,
    in_underflow: bool,
    out_overflow: bool,
}

impl<H: MidiHostStack> CableTransport<H> {
    /// Unconfigured transport draining `in_fifo`.
    pub fn new(host: H, in_fifo: FifoConsumer) -> Self {
        Self {
            host,
            dev_addr: NO_DEVICE,
            cable: NO_CABLE,
            has_in: false,
            has_out: false,
            in_fifo,
            in_underflow: false,
            out_overflow: false,
        }
    }

    /// Bind to `(dev_addr, cable)` and reset to an empty, error-free state.
    /// Safe to call again on a configured transport.
    pub fn configure(
        &mut self,
        dev_addr: DeviceAddress,
        cable: CableNumber,
        has_in: bool,
        has_out: bool,
    ) {
        self.dev_addr = dev_addr;
        self.cable = cable;
        self.has_in = has_in;
        self.has_out = has_out;
        self.in_fifo.clear();
        self.in_underflow = false;
        self.out_overflow = false;
    }

    /// Return to the unconfigured baseline, discarding buffered bytes.
    pub fn clear(&mut self) {
        self.configure(NO_DEVICE, NO_CABLE, false, false);
    }

    pub fn device_address(&self) -> DeviceAddress {
        self.dev_addr
    }

    pub fn cable_number(&self) -> CableNumber {
        self.cable
    }

    pub fn has_in_cable(&self) -> bool {
        self.has_in
    }

    pub fn has_out_cable(&self) -> bool {
        self.has_out
    }

    pub fn is_configured(&self) -> bool {
        self.dev_addr != NO_DEVICE && self.cable != NO_CABLE
    }

    /// The receive path tried to store more bytes than the FIFO had room for.
    /// Cleared by the next successful `read`.
    pub fn in_overflow(&self) -> bool {
        self.in_fifo.overflow()
    }

    /// The last `read` found nothing to return.
    pub fn in_underflow(&self) -> bool {
        self.in_underflow
    }

    /// The last `write` was not accepted. Wait for this to clear before writing more.
    pub fn out_overflow(&self) -> bool {
        self.out_overflow
    }

    pub fn in_capacity(&self) -> usize {
        self.in_fifo.capacity()
    }
}

impl<H: MidiHostStack> MidiTransport for CableTransport<H> {
    fn begin(&mut self) {
        self.in_fifo.clear();
    }

    fn end(&mut self) {
        self.clear();
    }

    fn available(&self) -> usize {
        if self.has_in {
            self.in_fifo.available()
        } else {
            0
        }
    }

    fn read(&mut self) -> u8 {
        if !self.has_in {
            self.in_underflow = true;
            return PLACEHOLDER_BYTE;
        }
        match self.in_fifo.read() {
            Some(byte) => {
                self.in_underflow = false;
                byte
            }
            None => {
                self.in_underflow = true;
                PLACEHOLDER_BYTE
            }
        }
    }

    fn write(&mut self, byte: u8) {
        if !self.has_out || self.dev_addr == NO_DEVICE {
            self.out_overflow = true;
            return;
        }
        self.out_overflow = self.host.stream_write(self.dev_addr, self.cable, &[byte]) != 1;
    }

    fn begin_transmission(&mut self) -> bool {
        self.dev_addr != NO_DEVICE && self.has_out && self.host.can_write_stream(self.dev_addr)
    }

    fn end_transmission(&mut self) {}
}

impl<H: MidiHostStack> std::fmt::Debug for CableTransport<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CableTransport")
            .field("dev_addr", &self.dev_addr)
            .field("cable", &self.cable)
            .field("has_in", &self.has_in)
            .field("has_out", &self.has_out)
            .field("available", &self.in_fifo.available())
            .field("in_overflow", &self.in_fifo.overflow())
            .field("out_overflow", &self.out_overflow)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::fifo::{ByteFifo, FifoProducer};
    use crate::sim::SimulatedHost;

    fn transport(capacity: usize) -> (SimulatedHost, FifoProducer, CableTransport<SimulatedHost>) {
        let host = SimulatedHost::new();
        let (inlet, fifo) = ByteFifo::new(capacity).split();
        let transport = CableTransport::new(host.clone(), fifo);
        (host, inlet, transport)
    }

    #[test]
    fn test_unconfigured_baseline() {
        let (_host, _inlet, t) = transport(8);
        assert_eq!(t.device_address(), NO_DEVICE);
        assert_eq!(t.cable_number(), NO_CABLE);
        assert!(!t.has_in_cable());
        assert!(!t.has_out_cable());
        assert!(!t.is_configured());
        assert_eq!(t.available(), 0);
        assert_eq!(t.in_capacity(), 8);
    }

    #[test]
    fn test_fifo_round_trip() {
        let (_host, mut inlet, mut t) = transport(16);
        t.configure(3, 0, true, true);
        assert_eq!(inlet.write(&[0x90, 0x3C]), 2);
        assert_eq!(inlet.write(&[0x7F]), 1);
        assert_eq!(t.available(), 3);
        assert_eq!(t.read(), 0x90);
        assert_eq!(t.read(), 0x3C);
        assert_eq!(t.read(), 0x7F);
        assert!(!t.in_underflow());
        assert_eq!(t.read(), PLACEHOLDER_BYTE);
        assert!(t.in_underflow());
    }

    #[test]
    fn test_no_midi_in_hides_buffered_bytes() {
        let (_host, mut inlet, mut t) = transport(8);
        t.configure(3, 1, false, true);
        inlet.write(&[1, 2, 3]);
        assert_eq!(t.available(), 0);
        assert_eq!(t.read(), PLACEHOLDER_BYTE);
        assert!(t.in_underflow());
        assert!(!t.in_overflow());
    }

    #[test]
    fn test_overflow_latched_until_read() {
        let (_host, mut inlet, mut t) = transport(4);
        t.configure(5, 0, true, false);
        assert_eq!(inlet.write(&[1, 2, 3, 4, 5, 6]), 4);
        assert!(t.in_overflow());
        assert_eq!(t.available(), 4);

        // still latched after another push attempt
        assert_eq!(inlet.write(&[7]), 0);
        assert!(t.in_overflow());

        assert_eq!(t.read(), 1);
        assert!(!t.in_overflow());
        assert_eq!(t.read(), 2);
        assert_eq!(t.read(), 3);
        assert_eq!(t.read(), 4);
        t.read();
        assert!(t.in_underflow());
    }

    #[test]
    fn test_configure_resets_state() {
        let (_host, mut inlet, mut t) = transport(2);
        t.configure(5, 0, true, true);
        inlet.write(&[1, 2, 3]);
        assert!(t.in_overflow());

        t.configure(6, 2, true, false);
        assert_eq!(t.device_address(), 6);
        assert_eq!(t.cable_number(), 2);
        assert_eq!(t.available(), 0);
        assert!(!t.in_overflow());
        assert_eq!(inlet.free(), 2);
    }

    #[test]
    fn test_end_returns_to_baseline() {
        let (_host, mut inlet, mut t) = transport(8);
        t.configure(5, 0, true, true);
        inlet.write(&[1]);
        t.end();
        assert!(!t.is_configured());
        assert_eq!(t.available(), 0);
    }

    #[test]
    fn test_write_forwards_to_host() {
        let (host, _inlet, mut t) = transport(8);
        t.configure(5, 2, false, true);
        assert!(t.begin_transmission());
        t.write(0xF8);
        t.end_transmission();
        assert!(!t.out_overflow());
        assert_eq!(host.queued_out(5, 2), vec![0xF8]);
    }

    #[test]
    fn test_write_refused_without_midi_out() {
        let (host, _inlet, mut t) = transport(8);
        t.configure(5, 0, true, false);
        assert!(!t.begin_transmission());
        t.write(0x90);
        assert!(t.out_overflow());
        assert!(host.queued_out(5, 0).is_empty());
    }

    #[test]
    fn test_write_rejected_by_full_host_queue() {
        let (host, _inlet, mut t) = transport(8);
        host.set_tx_capacity(1);
        t.configure(5, 0, false, true);
        t.write(0x90);
        assert!(!t.out_overflow());
        assert!(!t.begin_transmission());
        t.write(0x3C);
        assert!(t.out_overflow());
    }
}
