//! Identifiers shared by every layer of the host.

/// USB device address assigned by the host stack. `0` means "no device".
pub type DeviceAddress = u8;

/// Virtual cable number within one device, `0..=15`.
pub type CableNumber = u8;

/// One bit per cable index, as returned by `Registry::read_all().bitmap()`.
pub type CableBitmap = u16;

pub const NO_DEVICE: DeviceAddress = 0;

/// Marks a transport that is not bound to any cable.
pub const NO_CABLE: CableNumber = 16;

/// Virtual cables a USB MIDI endpoint pair can multiplex.
pub const MAX_CABLES: usize = 16;
