//! Cache coherency for buffers shared with the accelerator
//!
//! The accelerator's AXI masters do not snoop the CPU data cache. Two rules
//! follow, and breaking either one silently corrupts inference results:
//!
//! 1. After the host writes a buffer the device will read (weights, biases,
//!    input frame), the dirty lines must be cleaned to DDR
//!    ([`BufferCoherencyManager::flush_before_device_read`]).
//! 2. Before the host reads a buffer the device wrote (output logits), stale
//!    lines must be discarded
//!    ([`BufferCoherencyManager::invalidate_before_host_read`]).
//!
//! The driver calls these at the protocol points; callers writing device
//! memory by other means must do the same.

use std::fmt::Debug;
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

/// Cache maintenance by physical address range.
///
/// `address` is the physical address as programmed into the accelerator.
/// Backends that map memory translate it to their own virtual addresses.
pub trait CacheMaintenance: Debug + Send + Sync {
    /// Clean `[address, address + len)` so the device observes host writes.
    fn flush_range(&self, address: u64, len: usize);

    /// Discard cached copies of `[address, address + len)` so the host
    /// observes device writes.
    fn invalidate_range(&self, address: u64, len: usize);
}

/// Maintenance for cache-coherent interconnects: ordering only.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceOnly;

impl CacheMaintenance for FenceOnly {
    fn flush_range(&self, _address: u64, _len: usize) {
        fence(Ordering::Release);
    }

    fn invalidate_range(&self, _address: u64, _len: usize) {
        fence(Ordering::Acquire);
    }
}

/// Scoped flush / invalidate at the protocol points of an inference.
#[derive(Debug, Clone)]
pub struct BufferCoherencyManager {
    cache: Arc<dyn CacheMaintenance>,
}

impl BufferCoherencyManager {
    /// Wrap a cache maintenance backend.
    pub fn new(cache: Arc<dyn CacheMaintenance>) -> Self {
        Self { cache }
    }

    /// Clean a host-written buffer before the accelerator reads it.
    pub fn flush_before_device_read(&self, address: u64, len: usize) {
        if len == 0 {
            return;
        }
        tracing::trace!("flush {len} bytes at {address:#x}");
        self.cache.flush_range(address, len);
    }

    /// Invalidate a device-written buffer before the host reads it.
    pub fn invalidate_before_host_read(&self, address: u64, len: usize) {
        if len == 0 {
            return;
        }
        tracing::trace!("invalidate {len} bytes at {address:#x}");
        self.cache.invalidate_range(address, len);
    }
}

/// Data cache maintenance by virtual address on AArch64.
///
/// Linux sets `SCTLR_EL1.UCI`, so `dc cvac` and `dc civac` are legal at EL0.
/// `dc ivac` is not, so invalidation uses clean+invalidate, which is safe
/// for buffers the host has not dirtied since the last flush.
#[cfg(target_arch = "aarch64")]
pub mod arm {
    use super::CacheMaintenance;
    use std::arch::asm;

    /// Translation from a physical buffer address to the host pointer.
    pub trait AddressTranslation: std::fmt::Debug + Send + Sync {
        /// Host virtual address of `address`, if mapped.
        fn host_address(&self, address: u64) -> Option<usize>;
    }

    /// `dc cvac` / `dc civac` over every line of the range, then `dsb sy`.
    #[derive(Debug)]
    pub struct ArmDataCache<T> {
        translation: T,
        line: usize,
    }

    impl<T: AddressTranslation> ArmDataCache<T> {
        /// Build with the line size reported by `CTR_EL0`.
        pub fn new(translation: T) -> Self {
            let ctr: u64;
            // SAFETY: reading CTR_EL0 has no side effects; Linux enables EL0
            // access through SCTLR_EL1.UCT.
            unsafe { asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack)) };
            // DminLine, bits 16-19: log2 of the line size in words.
            let line = 4usize << ((ctr >> 16) & 0xF);
            Self { translation, line }
        }

        fn for_each_line(&self, address: u64, len: usize, op: impl Fn(usize)) {
            let Some(start) = self.translation.host_address(address) else {
                tracing::warn!("no host mapping for {address:#x}, cache maintenance skipped");
                return;
            };
            let mut line = start & !(self.line - 1);
            let end = start + len;
            while line < end {
                op(line);
                line += self.line;
            }
            // SAFETY: barrier only.
            unsafe { asm!("dsb sy", options(nostack)) };
        }
    }

    impl<T: AddressTranslation> CacheMaintenance for ArmDataCache<T> {
        fn flush_range(&self, address: u64, len: usize) {
            self.for_each_line(address, len, |va| {
                // SAFETY: `va` lies within a live mapping of the buffer.
                unsafe { asm!("dc cvac, {}", in(reg) va, options(nostack)) };
            });
        }

        fn invalidate_range(&self, address: u64, len: usize) {
            self.for_each_line(address, len, |va| {
                // SAFETY: `va` lies within a live mapping of the buffer.
                unsafe { asm!("dc civac, {}", in(reg) va, options(nostack)) };
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Log(Mutex<Vec<(&'static str, u64, usize)>>);

    impl CacheMaintenance for Log {
        fn flush_range(&self, address: u64, len: usize) {
            self.0.lock().unwrap().push(("flush", address, len));
        }

        fn invalidate_range(&self, address: u64, len: usize) {
            self.0.lock().unwrap().push(("invalidate", address, len));
        }
    }

    #[test]
    fn empty_ranges_are_skipped() {
        let log = Arc::new(Log::default());
        let mgr = BufferCoherencyManager::new(log.clone());

        mgr.flush_before_device_read(0x1000_0000, 0);
        mgr.invalidate_before_host_read(0x2800_0000, 0);
        mgr.flush_before_device_read(0x1000_0000, 864);
        mgr.invalidate_before_host_read(0x2800_0000, 20);

        assert_eq!(
            *log.0.lock().unwrap(),
            vec![("flush", 0x1000_0000, 864), ("invalidate", 0x2800_0000, 20)]
        );
    }
}
