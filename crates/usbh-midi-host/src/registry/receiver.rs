//! Receive half of the registry.
//!
//! Owns the producer end of every cable FIFO in the pool and the host stack
//! handle used to pull received bytes. It starts out attached to its
//! [`Registry`](super::Registry), which forwards `rx_cb` to it. Detach it with
//! `Registry::take_receiver` to run the receive callback from another context
//! (interrupt handler, host task) while the application loop keeps calling
//! `read_all` on the registry.

use crate::device::{DeviceInlet, InWriteFailCallback};
use crate::host::MidiHostStack;
use crate::types::{CableNumber, DeviceAddress, NO_DEVICE};

/// Bytes pulled from the host stack per `stream_read` call.
pub const RX_CHUNK_SIZE: usize = 48;

pub struct MidiReceiver<H: MidiHostStack> {
    host: H,
    inlets: Vec<DeviceInlet>,
    on_in_write_fail: Option<InWriteFailCallback>,
}

impl<H: MidiHostStack> MidiReceiver<H> {
    pub(crate) fn new(host: H, inlets: Vec<DeviceInlet>) -> Self {
        Self {
            host,
            inlets,
            on_in_write_fail: None,
        }
    }

    /// Pull everything the host stack has buffered for `dev_addr`, in
    /// [`RX_CHUNK_SIZE`] chunks, and route each chunk to its cable.
    pub fn rx_cb(&mut self, dev_addr: DeviceAddress, num_packets: u32) {
        if dev_addr == NO_DEVICE || num_packets == 0 {
            return;
        }
        let mut buf = [0u8; RX_CHUNK_SIZE];
        while let Some((cable, n)) = self.host.stream_read(dev_addr, &mut buf) {
            // a stack reporting more than the buffer holds is capped, not trusted
            let n = n.min(buf.len());
            if n == 0 {
                break;
            }
            self.on_rx(dev_addr, cable, &buf[..n]);
        }
    }

    /// Route bytes received on `(dev_addr, cable)` to that cable's inbound FIFO.
    ///
    /// Bytes for untracked devices or cables outside the device's MIDI IN range
    /// are dropped. Overflow is reported through the in-write-fail callback.
    pub fn on_rx(&mut self, dev_addr: DeviceAddress, cable: CableNumber, bytes: &[u8]) {
        if dev_addr == NO_DEVICE {
            return;
        }
        let Some(inlet) = self
            .inlets
            .iter_mut()
            .find(|inlet| inlet.device_address() == dev_addr)
        else {
            tracing::trace!(
                dev_addr,
                len = bytes.len(),
                "dropping bytes for untracked device"
            );
            return;
        };
        inlet.write_to_in_fifo(cable, bytes, self.on_in_write_fail.as_mut());
    }

    /// Called with `(dev_addr, cable, in_overflow)` when received bytes are dropped
    /// because a cable's FIFO is full.
    pub fn set_on_midi_in_write_fail(
        &mut self,
        callback: impl FnMut(DeviceAddress, CableNumber, bool) + Send + 'static,
    ) {
        self.on_in_write_fail = Some(Box::new(callback));
    }

    pub fn unset_on_midi_in_write_fail(&mut self) {
        self.on_in_write_fail = None;
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: MidiHostStack> std::fmt::Debug for MidiReceiver<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiReceiver")
            .field("inlets", &self.inlets)
            .field("has_on_in_write_fail", &self.on_in_write_fail.is_some())
            .finish()
    }
}
