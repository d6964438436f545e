//! Simulated device memory.

use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::Mutex;

use crate::{Error, Result};

use super::DeviceStream;

/// A fixed-size device allocation of POD elements.
///
/// Host code never touches the contents directly; kernels (stream jobs)
/// mutate them in place, and [`to_host`](DeviceBuffer::to_host) performs an
/// explicit, stream-ordered readback. Length is fixed at allocation time.
pub struct DeviceBuffer<T: Pod> {
    data: Arc<Mutex<Vec<T>>>,
    len: usize,
}

impl<T: Pod + Send + 'static> DeviceBuffer<T> {
    /// Allocate a zero-initialized buffer of `len` elements.
    ///
    /// Exhaustion is reported as [`Error::AllocationFailed`] rather than
    /// aborting the process.
    pub fn alloc(len: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;
        data.resize(len, T::zeroed());
        Ok(Self {
            data: Arc::new(Mutex::new(data)),
            len,
        })
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the contents to the host, ordered after all jobs previously
    /// submitted to `stream`.
    pub fn to_host(&self, stream: &DeviceStream) -> Result<Vec<T>> {
        stream.synchronize()?;
        Ok(self.data.lock().clone())
    }

    /// Shared handle to the backing storage, for enqueueing kernels.
    pub(crate) fn shared(&self) -> Arc<Mutex<Vec<T>>> {
        Arc::clone(&self.data)
    }
}

impl<T: Pod> std::fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_initialized() {
        let stream = DeviceStream::new().unwrap();
        let buf = DeviceBuffer::<f64>::alloc(64).unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.to_host(&stream).unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn readback_ordered_after_jobs() {
        let stream = DeviceStream::new().unwrap();
        let buf = DeviceBuffer::<u32>::alloc(8).unwrap();

        let data = buf.shared();
        stream
            .submit(move || {
                for (i, slot) in data.lock().iter_mut().enumerate() {
                    *slot = i as u32;
                }
            })
            .unwrap();

        let host = buf.to_host(&stream).unwrap();
        assert_eq!(host, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn empty_buffer() {
        let stream = DeviceStream::new().unwrap();
        let buf = DeviceBuffer::<u32>::alloc(0).unwrap();
        assert!(buf.is_empty());
        assert!(buf.to_host(&stream).unwrap().is_empty());
    }
}
