//! One reusable device slot.
//!
//! A slot owns a transport/parser pair for every cable index up to
//! `max_cables`, allocated when the pool is built. Connecting configures the
//! first `max(num_in, num_out)` of them; disconnecting clears them all. Slots
//! are recycled, never freed.
//!
//! The producer halves of the slot's inbound FIFOs are handed out once, as a
//! [`DeviceInlet`], when the slot is built. The slot publishes its address and
//! MIDI IN cable count to the inlet through atomics on every connect and
//! disconnect.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use usbh_midi_parser::MessageParser;

use crate::cable::{ByteFifo, CableInterface, CableTransport, FifoProducer};
use crate::host::MidiHostStack;
use crate::types::{CableNumber, DeviceAddress, MAX_CABLES, NO_DEVICE};

/// Callback for inbound bytes that were dropped: `(dev_addr, cable, in_overflow)`.
pub type InWriteFailCallback = Box<dyn FnMut(DeviceAddress, CableNumber, bool) + Send>;

/// Routing state shared between a slot and its inlet.
#[derive(Debug, Default)]
struct SlotRoute {
    dev_addr: AtomicU8,
    num_in_cables: AtomicU8,
}

impl SlotRoute {
    fn open(&self, dev_addr: DeviceAddress, num_in_cables: u8) {
        self.num_in_cables.store(num_in_cables, Ordering::Release);
        self.dev_addr.store(dev_addr, Ordering::Release);
    }

    fn close(&self) {
        self.dev_addr.store(NO_DEVICE, Ordering::Release);
        self.num_in_cables.store(0, Ordering::Release);
    }

    fn device_address(&self) -> DeviceAddress {
        self.dev_addr.load(Ordering::Acquire)
    }

    fn num_in_cables(&self) -> u8 {
        self.num_in_cables.load(Ordering::Acquire)
    }
}

pub struct DeviceSlot<P: MessageParser, H: MidiHostStack> {
    host: H,
    route: Arc<SlotRoute>,
    dev_addr: DeviceAddress,
    num_in_cables: u8,
    num_out_cables: u8,
    max_device_address: DeviceAddress,
    interfaces: Vec<CableInterface<P, H>>,
}

impl<P: MessageParser, H: MidiHostStack> DeviceSlot<P, H> {
    /// Build a free slot with `max_cables` cables (at most [`MAX_CABLES`]), each
    /// with its own parser from `new_parser`, plus the inlet that feeds them.
    pub fn new(
        host: H,
        max_cables: usize,
        in_buffer_size: usize,
        max_device_address: DeviceAddress,
        mut new_parser: impl FnMut() -> P,
    ) -> (Self, DeviceInlet) {
        let max_cables = max_cables.min(MAX_CABLES);
        let route = Arc::new(SlotRoute::default());
        let mut fifos = Vec::with_capacity(max_cables);
        let mut interfaces = Vec::with_capacity(max_cables);
        for _ in 0..max_cables {
            let (producer, consumer) = ByteFifo::new(in_buffer_size).split();
            let transport = CableTransport::new(host.clone(), consumer);
            fifos.push(producer);
            interfaces.push(CableInterface::new(transport, new_parser()));
        }
        let slot = Self {
            host,
            route: route.clone(),
            dev_addr: NO_DEVICE,
            num_in_cables: 0,
            num_out_cables: 0,
            max_device_address,
            interfaces,
        };
        (slot, DeviceInlet { route, fifos })
    }

    /// Configure the slot for a newly mounted device.
    ///
    /// Ignored if `dev_addr` is 0 or above the configured maximum. Cable counts
    /// above the slot's cable capacity are clamped; data on those cables is dropped.
    pub fn on_connect(&mut self, dev_addr: DeviceAddress, num_in_cables: u8, num_out_cables: u8) {
        if dev_addr == NO_DEVICE || dev_addr > self.max_device_address {
            tracing::debug!(dev_addr, "ignoring connect from out-of-range address");
            return;
        }
        self.clear_transports();
        let max_cables = self.max_cables();
        self.dev_addr = dev_addr;
        self.num_in_cables = usize::from(num_in_cables).min(max_cables) as u8;
        self.num_out_cables = usize::from(num_out_cables).min(max_cables) as u8;

        let active = self.active_cables();
        for (idx, iface) in self.interfaces.iter_mut().take(active).enumerate() {
            let cable = idx as CableNumber;
            iface.transport_mut().configure(
                dev_addr,
                cable,
                cable < self.num_in_cables,
                cable < self.num_out_cables,
            );
            iface.begin();
        }
        self.route.open(dev_addr, self.num_in_cables);
    }

    /// Clear every cable regardless of `_dev_addr`; the slot becomes free.
    pub fn on_disconnect(&mut self, _dev_addr: DeviceAddress) {
        self.clear_transports();
    }

    /// Ask the host stack to send queued outbound bytes. No-op when free.
    pub fn write_flush(&mut self) {
        if self.dev_addr != NO_DEVICE {
            self.host.stream_flush(self.dev_addr);
        }
    }

    /// Drive every configured MIDI IN cable's parser one step.
    ///
    /// Bit `i` of the result is set if cable `i` dispatched a message.
    pub fn read_all(&mut self) -> u16 {
        let mut bitmap = 0u16;
        let num_in = self.num_in_cables as usize;
        for (cable, iface) in self.interfaces.iter_mut().take(num_in).enumerate() {
            if iface.read() {
                bitmap |= 1 << cable;
            }
        }
        bitmap
    }

    pub fn device_address(&self) -> DeviceAddress {
        self.dev_addr
    }

    pub fn is_connected(&self) -> bool {
        self.dev_addr != NO_DEVICE
    }

    pub fn num_in_cables(&self) -> u8 {
        self.num_in_cables
    }

    pub fn num_out_cables(&self) -> u8 {
        self.num_out_cables
    }

    /// `max(num_in_cables, num_out_cables)`.
    pub fn active_cables(&self) -> usize {
        self.num_in_cables.max(self.num_out_cables) as usize
    }

    /// Cable slots this device slot was built with.
    pub fn max_cables(&self) -> usize {
        self.interfaces.len()
    }

    /// Interface for any cable index below `max_cables`, configured or not.
    pub fn interface(&self, cable: CableNumber) -> Option<&CableInterface<P, H>> {
        self.interfaces.get(cable as usize)
    }

    pub fn interface_mut(&mut self, cable: CableNumber) -> Option<&mut CableInterface<P, H>> {
        self.interfaces.get_mut(cable as usize)
    }

    /// Interfaces of the configured cables, in cable order.
    pub fn interfaces(&self) -> impl Iterator<Item = &CableInterface<P, H>> {
        self.interfaces.iter().take(self.active_cables())
    }

    pub fn interfaces_mut(&mut self) -> impl Iterator<Item = &mut CableInterface<P, H>> {
        let active = self.active_cables();
        self.interfaces.iter_mut().take(active)
    }

    // Unpublish before clearing so the inlet stops storing into FIFOs being emptied.
    fn clear_transports(&mut self) {
        self.route.close();
        self.dev_addr = NO_DEVICE;
        self.num_in_cables = 0;
        self.num_out_cables = 0;
        for iface in &mut self.interfaces {
            iface.transport_mut().clear();
        }
    }
}

impl<P: MessageParser, H: MidiHostStack> std::fmt::Debug for DeviceSlot<P, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSlot")
            .field("dev_addr", &self.dev_addr)
            .field("num_in_cables", &self.num_in_cables)
            .field("num_out_cables", &self.num_out_cables)
            .field("max_cables", &self.interfaces.len())
            .finish()
    }
}

/// Receive-side half of a [`DeviceSlot`]: the producer end of every cable FIFO.
///
/// Owned by whatever context runs the host stack's receive callback. It never
/// touches parsers or transports, only the FIFOs and the published route.
pub struct DeviceInlet {
    route: Arc<SlotRoute>,
    fifos: Vec<FifoProducer>,
}

impl DeviceInlet {
    /// Address the slot currently serves, [`NO_DEVICE`] when free.
    pub fn device_address(&self) -> DeviceAddress {
        self.route.device_address()
    }

    /// Route received bytes to `cable`'s inbound FIFO.
    ///
    /// Data for a free slot or for cables outside the device's MIDI IN range
    /// is dropped without notice and counts as handled. Returns `false` only
    /// when the FIFO could not take every byte; `on_fail` fires in that case.
    pub fn write_to_in_fifo(
        &mut self,
        cable: CableNumber,
        bytes: &[u8],
        on_fail: Option<&mut InWriteFailCallback>,
    ) -> bool {
        let dev_addr = self.route.device_address();
        if dev_addr == NO_DEVICE || cable >= self.route.num_in_cables() {
            return true;
        }
        let Some(fifo) = self.fifos.get_mut(cable as usize) else {
            return true;
        };
        let written = fifo.write(bytes);
        if written == bytes.len() {
            return true;
        }
        tracing::trace!(
            dev_addr,
            cable,
            dropped = bytes.len() - written,
            "inbound FIFO overflow"
        );
        if let Some(callback) = on_fail {
            callback(dev_addr, cable, fifo.overflow());
        }
        false
    }
}

impl std::fmt::Debug for DeviceInlet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceInlet")
            .field("dev_addr", &self.route.device_address())
            .field("num_in_cables", &self.route.num_in_cables())
            .field("fifos", &self.fifos)
            .finish()
    }
}
