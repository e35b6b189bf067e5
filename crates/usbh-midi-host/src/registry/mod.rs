//! Session registry: the pool of device slots and the entry point for host events.
//!
//! The registry is the only object the host stack talks to. It allocates a slot
//! on mount, routes received bytes to the right cable, clears the slot on
//! unmount, and lets the application loop poll every cable with
//! [`Registry::read_all`] and push outbound data with [`Registry::write_flush_all`].
//!
//! # Single instance
//!
//! Host stack callbacks carry no context, so firmware keeps exactly one
//! registry for the lifetime of the program and forwards the stack's C
//! callbacks to its [`HostCallbacks`] methods. The registry itself is not a
//! global; where it lives is up to the caller.
//!
//! # Threading
//!
//! Every cable FIFO is a lock-free single-producer single-consumer ring. The
//! producer ends belong to a [`MidiReceiver`], the consumer ends to the
//! registry's slots. While the receiver is attached, `rx_cb` on the registry
//! forwards to it and everything runs in one context. To receive in interrupt
//! context or on the host task, detach it with [`Registry::take_receiver`]
//! and call [`MidiReceiver::rx_cb`] there; `read_all` on the registry may
//! then run concurrently with it.
//!
//! Mount and unmount stay on the registry. Each slot stops accepting bytes
//! before its FIFOs are cleared and only resumes once its cables are
//! configured, so a receive running across a reconnect can at worst leave a
//! chunk of the old session's bytes in a cable FIFO.

mod builder;
mod ready;
mod receiver;

pub use builder::RegistryBuilder;
pub use ready::{is_message_available_on_cable, ReadyMap};
pub use receiver::{MidiReceiver, RX_CHUNK_SIZE};

use usbh_midi_parser::{MessageParser, StreamParser};

use crate::cable::CableInterface;
use crate::config::HostConfig;
use crate::device::DeviceSlot;
use crate::error::Result;
use crate::host::{HostCallbacks, MidiHostStack};
use crate::types::{CableNumber, DeviceAddress, NO_DEVICE};

/// `(dev_addr, num_in_cables, num_out_cables)` of a newly tracked device.
pub type ConnectCallback = Box<dyn FnMut(DeviceAddress, u8, u8) + Send>;
pub type DisconnectCallback = Box<dyn FnMut(DeviceAddress) + Send>;

pub struct Registry<H: MidiHostStack, P: MessageParser = StreamParser> {
    host: H,
    config: HostConfig,
    slots: Vec<DeviceSlot<P, H>>,
    on_connect: Option<ConnectCallback>,
    on_disconnect: Option<DisconnectCallback>,
    receiver: Option<MidiReceiver<H>>,
}

impl<H: MidiHostStack> Registry<H, StreamParser> {
    /// Registry with one [`StreamParser`] per cable, configured from `config.parser`.
    pub fn new(host: H, config: HostConfig) -> Result<Self> {
        let settings = config.parser.clone();
        Self::with_parser(host, config, || StreamParser::new(settings.clone()))
    }
}

impl<H: MidiHostStack, P: MessageParser> Registry<H, P> {
    /// Validate `config` and allocate the whole slot pool up front.
    ///
    /// `new_parser` is called once per cable of every slot.
    pub fn with_parser(
        host: H,
        config: HostConfig,
        mut new_parser: impl FnMut() -> P,
    ) -> Result<Self> {
        config.validate()?;
        let (slots, inlets): (Vec<_>, Vec<_>) = (0..config.max_devices)
            .map(|_| {
                DeviceSlot::new(
                    host.clone(),
                    config.max_cables,
                    config.in_cable_buffer_size,
                    config.max_device_address,
                    &mut new_parser,
                )
            })
            .unzip();
        tracing::debug!(
            max_devices = config.max_devices,
            max_cables = config.max_cables,
            in_fifo_bytes = config.in_fifo_bytes(),
            "USB MIDI registry created"
        );
        Ok(Self {
            config,
            slots,
            on_connect: None,
            on_disconnect: None,
            receiver: Some(MidiReceiver::new(host.clone(), inlets)),
            host,
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    // ==================== Host events ====================

    /// Track a newly mounted device.
    ///
    /// Reuses the device's slot if the address is already tracked, otherwise
    /// takes the first free one. When the pool is full the device is left
    /// untracked and no callback fires.
    pub fn on_connect(&mut self, dev_addr: DeviceAddress, num_in_cables: u8, num_out_cables: u8) {
        if dev_addr == NO_DEVICE || dev_addr > self.config.max_device_address {
            tracing::warn!(dev_addr, "rejecting USB MIDI device with invalid address");
            return;
        }
        let index = self
            .slot_index(dev_addr)
            .or_else(|| self.slots.iter().position(|slot| !slot.is_connected()));
        let Some(index) = index else {
            tracing::warn!(
                dev_addr,
                capacity = self.slots.len(),
                "device pool exhausted, USB MIDI device not tracked"
            );
            return;
        };

        self.slots[index].on_connect(dev_addr, num_in_cables, num_out_cables);
        tracing::debug!(
            dev_addr,
            slot = index,
            num_in_cables,
            num_out_cables,
            "USB MIDI device connected"
        );
        if let Some(callback) = self.on_connect.as_mut() {
            callback(dev_addr, num_in_cables, num_out_cables);
        }
    }

    /// Clear the device's slot. Unknown addresses are ignored.
    pub fn on_disconnect(&mut self, dev_addr: DeviceAddress) {
        let Some(index) = self.slot_index(dev_addr) else {
            return;
        };
        self.slots[index].on_disconnect(dev_addr);
        tracing::debug!(dev_addr, slot = index, "USB MIDI device disconnected");
        if let Some(callback) = self.on_disconnect.as_mut() {
            callback(dev_addr);
        }
    }

    /// Route bytes received on `(dev_addr, cable)` to that cable's inbound FIFO.
    ///
    /// Bytes for untracked devices or cables outside the device's MIDI IN range
    /// are dropped. Overflow is reported through the in-write-fail callback.
    /// Does nothing once the receiver has been taken.
    pub fn on_rx(&mut self, dev_addr: DeviceAddress, cable: CableNumber, bytes: &[u8]) {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.on_rx(dev_addr, cable, bytes),
            None => tracing::trace!(dev_addr, "receiver detached, bytes not routed"),
        }
    }

    /// Detach the receive path so it can run in another context.
    ///
    /// Returns `None` if it was already taken. The in-write-fail callback
    /// moves with it.
    pub fn take_receiver(&mut self) -> Option<MidiReceiver<H>> {
        self.receiver.take()
    }

    /// Reattach a receiver previously returned by [`take_receiver`](Self::take_receiver).
    pub fn restore_receiver(&mut self, receiver: MidiReceiver<H>) {
        self.receiver = Some(receiver);
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }

    // ==================== Lookup ====================

    /// Slot tracking `dev_addr`. Address 0 is never found.
    pub fn get_dev_from_dev_addr(&self, dev_addr: DeviceAddress) -> Option<&DeviceSlot<P, H>> {
        let index = self.slot_index(dev_addr)?;
        self.slots.get(index)
    }

    pub fn get_dev_from_dev_addr_mut(
        &mut self,
        dev_addr: DeviceAddress,
    ) -> Option<&mut DeviceSlot<P, H>> {
        let index = self.slot_index(dev_addr)?;
        self.slots.get_mut(index)
    }

    pub fn is_connected(&self, dev_addr: DeviceAddress) -> bool {
        self.slot_index(dev_addr).is_some()
    }

    /// 0 when the device is not tracked.
    pub fn num_in_cables(&self, dev_addr: DeviceAddress) -> u8 {
        self.get_dev_from_dev_addr(dev_addr)
            .map_or(0, |slot| slot.num_in_cables())
    }

    /// 0 when the device is not tracked.
    pub fn num_out_cables(&self, dev_addr: DeviceAddress) -> u8 {
        self.get_dev_from_dev_addr(dev_addr)
            .map_or(0, |slot| slot.num_out_cables())
    }

    /// Interface for any cable index below `max_cables` on a tracked device.
    pub fn interface(
        &self,
        dev_addr: DeviceAddress,
        cable: CableNumber,
    ) -> Option<&CableInterface<P, H>> {
        self.get_dev_from_dev_addr(dev_addr)?.interface(cable)
    }

    pub fn interface_mut(
        &mut self,
        dev_addr: DeviceAddress,
        cable: CableNumber,
    ) -> Option<&mut CableInterface<P, H>> {
        self.get_dev_from_dev_addr_mut(dev_addr)?.interface_mut(cable)
    }

    /// Interface for a cable the device actually exposes as MIDI IN or OUT.
    ///
    /// This is where applications attach message handlers after a connect.
    pub fn interface_from_device_and_cable(
        &mut self,
        dev_addr: DeviceAddress,
        cable: CableNumber,
    ) -> Option<&mut CableInterface<P, H>> {
        let slot = self.get_dev_from_dev_addr_mut(dev_addr)?;
        if cable >= slot.num_in_cables() && cable >= slot.num_out_cables() {
            return None;
        }
        slot.interface_mut(cable)
    }

    /// Addresses of all tracked devices, in slot order.
    pub fn connected_devices(&self) -> impl Iterator<Item = DeviceAddress> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.is_connected())
            .map(|slot| slot.device_address())
    }

    /// Devices that can be tracked at once.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_connected()).count()
    }

    // ==================== Application loop ====================

    /// Drive every MIDI IN cable of every tracked device one parser step.
    pub fn read_all(&mut self) -> ReadyMap {
        let mut ready = ReadyMap::default();
        for slot in self.slots.iter_mut().filter(|slot| slot.is_connected()) {
            let cables = slot.read_all();
            ready.record(slot.device_address(), cables);
        }
        ready
    }

    /// Ask the host stack to transmit queued outbound bytes for every tracked device.
    pub fn write_flush_all(&mut self) {
        for slot in &mut self.slots {
            slot.write_flush();
        }
    }

    // ==================== Callbacks ====================

    /// Called after a device is tracked. Replaces any previous callback.
    pub fn set_on_connect(
        &mut self,
        callback: impl FnMut(DeviceAddress, u8, u8) + Send + 'static,
    ) {
        self.on_connect = Some(Box::new(callback));
    }

    pub fn unset_on_connect(&mut self) {
        self.on_connect = None;
    }

    /// Called after a tracked device's slot is cleared. Replaces any previous callback.
    pub fn set_on_disconnect(&mut self, callback: impl FnMut(DeviceAddress) + Send + 'static) {
        self.on_disconnect = Some(Box::new(callback));
    }

    pub fn unset_on_disconnect(&mut self) {
        self.on_disconnect = None;
    }

    /// Called with `(dev_addr, cable, in_overflow)` when received bytes are dropped
    /// because a cable's FIFO is full.
    ///
    /// Installed on the attached receiver. After [`take_receiver`](Self::take_receiver)
    /// set it on the [`MidiReceiver`] instead.
    pub fn set_on_midi_in_write_fail(
        &mut self,
        callback: impl FnMut(DeviceAddress, CableNumber, bool) + Send + 'static,
    ) {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.set_on_midi_in_write_fail(callback),
            None => tracing::warn!("receiver detached, in-write-fail callback not installed"),
        }
    }

    pub fn unset_on_midi_in_write_fail(&mut self) {
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.unset_on_midi_in_write_fail();
        }
    }

    fn slot_index(&self, dev_addr: DeviceAddress) -> Option<usize> {
        if dev_addr == NO_DEVICE {
            return None;
        }
        self.slots
            .iter()
            .position(|slot| slot.device_address() == dev_addr)
    }
}

impl<H: MidiHostStack, P: MessageParser> HostCallbacks for Registry<H, P> {
    fn mount_cb(
        &mut self,
        dev_addr: DeviceAddress,
        in_ep: u8,
        out_ep: u8,
        num_in_cables: u8,
        num_out_cables: u8,
    ) {
        tracing::trace!(dev_addr, in_ep, out_ep, "MIDI interface mounted");
        self.on_connect(dev_addr, num_in_cables, num_out_cables);
    }

    fn umount_cb(&mut self, dev_addr: DeviceAddress) {
        self.on_disconnect(dev_addr);
    }

    fn rx_cb(&mut self, dev_addr: DeviceAddress, num_packets: u32) {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.rx_cb(dev_addr, num_packets),
            None => tracing::trace!(dev_addr, "receiver detached, rx_cb ignored"),
        }
    }
}

impl<H: MidiHostStack, P: MessageParser> std::fmt::Debug for Registry<H, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("slots", &self.slots)
            .field("has_on_connect", &self.on_connect.is_some())
            .field("has_on_disconnect", &self.on_disconnect.is_some())
            .field("receiver", &self.receiver)
            .finish()
    }
}
