//! Result of one `Registry::read_all` pass.

use smallvec::SmallVec;

use crate::types::{CableBitmap, CableNumber, DeviceAddress, MAX_CABLES};

/// Bit test on a cable bitmap. Always `false` for `cable >= 16`.
#[inline]
pub fn is_message_available_on_cable(cable: CableNumber, bitmap: CableBitmap) -> bool {
    (cable as usize) < MAX_CABLES && bitmap & (1 << cable) != 0
}

/// Which cables dispatched a message during one `read_all`.
///
/// [`bitmap`](Self::bitmap) merges every device into one bit per cable index,
/// so cable 0 of two different devices sets the same bit. Use
/// [`for_device`](Self::for_device) or [`is_ready`](Self::is_ready) when more
/// than one device is connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyMap {
    bitmap: CableBitmap,
    devices: SmallVec<[(DeviceAddress, CableBitmap); 4]>,
}

impl ReadyMap {
    pub(crate) fn record(&mut self, dev_addr: DeviceAddress, cables: CableBitmap) {
        if cables == 0 {
            return;
        }
        self.bitmap |= cables;
        self.devices.push((dev_addr, cables));
    }

    /// Merged bitmap over all devices.
    pub fn bitmap(&self) -> CableBitmap {
        self.bitmap
    }

    pub fn for_device(&self, dev_addr: DeviceAddress) -> CableBitmap {
        self.devices
            .iter()
            .find(|(dev, _)| *dev == dev_addr)
            .map_or(0, |(_, cables)| *cables)
    }

    pub fn is_ready(&self, dev_addr: DeviceAddress, cable: CableNumber) -> bool {
        is_message_available_on_cable(cable, self.for_device(dev_addr))
    }

    /// Cable index had a message on any device.
    pub fn has_cable(&self, cable: CableNumber) -> bool {
        is_message_available_on_cable(cable, self.bitmap)
    }

    pub fn is_empty(&self) -> bool {
        self.bitmap == 0
    }

    /// `(dev_addr, cables)` for each device that had at least one message.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceAddress, CableBitmap)> + '_ {
        self.devices.iter().copied()
    }
}
