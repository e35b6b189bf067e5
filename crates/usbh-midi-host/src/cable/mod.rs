//! Per-cable plumbing: inbound FIFO, transport, and the parser binding.

mod fifo;
mod interface;
mod transport;

pub use fifo::{ByteFifo, FifoConsumer, FifoProducer};
pub use interface::CableInterface;
pub use transport::{CableTransport, PLACEHOLDER_BYTE};
