//! Host-simulated device substrate: buffers and ordered execution streams.
//!
//! The default backend models the accelerator on the host so that every
//! scheduling property is testable without hardware: [`DeviceBuffer`] plays
//! the role of a device allocation (host access only through an explicit,
//! stream-ordered readback) and [`DeviceStream`] plays the role of an
//! ordered execution stream (asynchronous submission, in-order execution,
//! explicit synchronization).

mod buffer;
mod stream;

pub use buffer::DeviceBuffer;
pub use stream::DeviceStream;
