//! Boundary with the USB host stack.
//!
//! The stack owns enumeration, endpoints and transfer scheduling. This crate
//! only needs to pull received bytes, push bytes to send, and ask for a flush.
//! In the other direction the stack reports mount, unmount and receive events
//! through [`HostCallbacks`].

use crate::types::{CableNumber, DeviceAddress};

/// Byte-stream access to the USB MIDI host driver.
///
/// Each cable transport holds its own clone of the handle, so implementations
/// are expected to be cheap handles onto shared driver state (a zero-sized FFI
/// shim on target, an `Arc` in simulation). No method may block.
pub trait MidiHostStack: Clone {
    /// Pull the next chunk of received bytes for `dev_addr` into `buf`.
    ///
    /// Returns the cable the bytes arrived on and how many were written, or
    /// `None` once nothing is left.
    fn stream_read(&self, dev_addr: DeviceAddress, buf: &mut [u8]) -> Option<(CableNumber, usize)>;

    /// Queue bytes for `cable` on `dev_addr`. Returns how many were accepted.
    fn stream_write(&self, dev_addr: DeviceAddress, cable: CableNumber, bytes: &[u8]) -> usize;

    /// Whether the outbound queue for `dev_addr` has room.
    fn can_write_stream(&self, dev_addr: DeviceAddress) -> bool;

    /// Start transmitting whatever is queued for `dev_addr`. Returns bytes sent.
    fn stream_flush(&self, dev_addr: DeviceAddress) -> usize;
}

/// Events the host stack delivers. Implemented by [`Registry`](crate::Registry).
///
/// `rx_cb` may run from the stack's receive path. It must be the only producer
/// for the cables it touches while the application loop is the only consumer.
pub trait HostCallbacks {
    /// A MIDI streaming interface was mounted.
    fn mount_cb(
        &mut self,
        dev_addr: DeviceAddress,
        in_ep: u8,
        out_ep: u8,
        num_in_cables: u8,
        num_out_cables: u8,
    );

    fn umount_cb(&mut self, dev_addr: DeviceAddress);

    /// `num_packets` USB MIDI packets are waiting to be read for `dev_addr`.
    fn rx_cb(&mut self, dev_addr: DeviceAddress, num_packets: u32);
}
