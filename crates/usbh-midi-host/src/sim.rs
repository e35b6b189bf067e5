//! In-memory host stack for tests and desktop development.
//!
//! Received bytes are queued per device with [`SimulatedHost::push_rx`] and
//! handed out by `stream_read` in arrival order. Outbound bytes collect in
//! per-cable queues until `stream_flush` moves them to the sent log.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::MidiHostStack;
use crate::types::{CableNumber, DeviceAddress};

#[derive(Debug)]
struct SimState {
    rx: HashMap<DeviceAddress, VecDeque<(CableNumber, Vec<u8>)>>,
    tx: HashMap<(DeviceAddress, CableNumber), Vec<u8>>,
    sent: HashMap<(DeviceAddress, CableNumber), Vec<u8>>,
    tx_capacity: usize,
    writable: bool,
    flush_log: Vec<DeviceAddress>,
}

impl SimState {
    fn queued_for(&self, dev_addr: DeviceAddress) -> usize {
        self.tx
            .iter()
            .filter(|((dev, _), _)| *dev == dev_addr)
            .map(|(_, bytes)| bytes.len())
            .sum()
    }
}

/// Cloneable handle onto one simulated USB MIDI host driver.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                rx: HashMap::new(),
                tx: HashMap::new(),
                sent: HashMap::new(),
                tx_capacity: usize::MAX,
                writable: true,
                flush_log: Vec::new(),
            })),
        }
    }

    /// Queue bytes as if they arrived from `dev_addr` on `cable`.
    pub fn push_rx(&self, dev_addr: DeviceAddress, cable: CableNumber, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.state
            .lock()
            .rx
            .entry(dev_addr)
            .or_default()
            .push_back((cable, bytes.to_vec()));
    }

    /// Received bytes not yet pulled by `stream_read`.
    pub fn pending_rx(&self, dev_addr: DeviceAddress) -> usize {
        self.state
            .lock()
            .rx
            .get(&dev_addr)
            .map_or(0, |queue| queue.iter().map(|(_, bytes)| bytes.len()).sum())
    }

    /// Outbound bytes queued per device before writes are refused.
    pub fn set_tx_capacity(&self, capacity: usize) {
        self.state.lock().tx_capacity = capacity;
    }

    /// When `false`, the stream reports no room and accepts nothing.
    pub fn set_writable(&self, writable: bool) {
        self.state.lock().writable = writable;
    }

    /// Bytes written to `(dev_addr, cable)` and not yet flushed.
    pub fn queued_out(&self, dev_addr: DeviceAddress, cable: CableNumber) -> Vec<u8> {
        self.state
            .lock()
            .tx
            .get(&(dev_addr, cable))
            .cloned()
            .unwrap_or_default()
    }

    /// Bytes flushed to `(dev_addr, cable)` so far.
    pub fn sent(&self, dev_addr: DeviceAddress, cable: CableNumber) -> Vec<u8> {
        self.state
            .lock()
            .sent
            .get(&(dev_addr, cable))
            .cloned()
            .unwrap_or_default()
    }

    /// Device addresses `stream_flush` was called for, in call order.
    pub fn flush_log(&self) -> Vec<DeviceAddress> {
        self.state.lock().flush_log.clone()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiHostStack for SimulatedHost {
    fn stream_read(&self, dev_addr: DeviceAddress, buf: &mut [u8]) -> Option<(CableNumber, usize)> {
        if buf.is_empty() {
            return None;
        }
        let mut state = self.state.lock();
        let queue = state.rx.get_mut(&dev_addr)?;
        let (cable, mut bytes) = queue.pop_front()?;
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        if n < bytes.len() {
            queue.push_front((cable, bytes.split_off(n)));
        }
        Some((cable, n))
    }

    fn stream_write(&self, dev_addr: DeviceAddress, cable: CableNumber, bytes: &[u8]) -> usize {
        let mut state = self.state.lock();
        if !state.writable {
            return 0;
        }
        let room = state.tx_capacity.saturating_sub(state.queued_for(dev_addr));
        let n = bytes.len().min(room);
        if n > 0 {
            state
                .tx
                .entry((dev_addr, cable))
                .or_default()
                .extend_from_slice(&bytes[..n]);
        }
        n
    }

    fn can_write_stream(&self, dev_addr: DeviceAddress) -> bool {
        let state = self.state.lock();
        state.writable && state.queued_for(dev_addr) < state.tx_capacity
    }

    fn stream_flush(&self, dev_addr: DeviceAddress) -> usize {
        let mut state = self.state.lock();
        state.flush_log.push(dev_addr);

        let keys: Vec<_> = state
            .tx
            .keys()
            .filter(|(dev, _)| *dev == dev_addr)
            .copied()
            .collect();
        let mut flushed = 0;
        for key in keys {
            if let Some(bytes) = state.tx.remove(&key) {
                flushed += bytes.len();
                state.sent.entry(key).or_default().extend(bytes);
            }
        }
        flushed
    }
}
