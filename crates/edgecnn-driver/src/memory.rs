//! Device-memory access
//!
//! The accelerator reads weights, biases and frames from DDR and writes its
//! logits back there. [`DeviceMemory`] is the host's window onto that
//! physical address space. Copies through it go via the CPU cache, so every
//! use must be paired with the matching
//! [`BufferCoherencyManager`](crate::BufferCoherencyManager) call.

use crate::error::Result;
use std::fmt::Debug;

/// Byte-addressed view of the physical memory shared with the accelerator.
pub trait DeviceMemory: Debug + Send + Sync {
    /// Copy `data` to physical address `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is not backed by a mapped window.
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()>;

    /// Fill `buffer` from physical address `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is not backed by a mapped window.
    fn read_bytes(&self, address: u64, buffer: &mut [u8]) -> Result<()>;
}

/// Copy Q8.8 words to device memory in native word order.
///
/// # Errors
///
/// Propagates errors from the backend.
pub fn write_words(memory: &dyn DeviceMemory, address: u64, words: &[i16]) -> Result<()> {
    memory.write_bytes(address, bytemuck::cast_slice::<i16, u8>(words))
}

/// Read `count` Q8.8 words from device memory.
///
/// # Errors
///
/// Propagates errors from the backend.
pub fn read_words(memory: &dyn DeviceMemory, address: u64, count: usize) -> Result<Vec<i16>> {
    let mut words = vec![0i16; count];
    memory.read_bytes(address, bytemuck::cast_slice_mut::<i16, u8>(&mut words))?;
    Ok(words)
}
