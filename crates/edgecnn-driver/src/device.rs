//! Hardware capability bundle
//!
//! The controller never touches addresses directly. It is handed a
//! [`Hardware`] value carrying the three capabilities it needs, which come
//! either from mapped physical memory or from the simulator.

use crate::backends::{MappedRegion, PhysicalMemory, SimulatedAccelerator};
use crate::coherency::CacheMaintenance;
use crate::error::Result;
use crate::memory::DeviceMemory;
use crate::mmio::RegisterIo;
use crate::PlatformConfig;
use edgecnn_chip::regs;
use std::path::Path;
use std::sync::Arc;

/// Register window, device memory and cache maintenance for one accelerator.
#[derive(Debug, Clone)]
pub struct Hardware {
    /// Accelerator register window
    pub registers: Arc<dyn RegisterIo>,
    /// Shared DDR buffers
    pub memory: Arc<dyn DeviceMemory>,
    /// Cache maintenance for those buffers
    pub cache: Arc<dyn CacheMaintenance>,
}

impl Hardware {
    /// Map the accelerator and its buffers from a memory device file.
    ///
    /// On AArch64 cache maintenance cleans and invalidates by virtual
    /// address through the mapped windows; elsewhere it falls back to
    /// memory fences.
    ///
    /// # Errors
    ///
    /// Returns an error if any window fails to map.
    pub fn map_physical(path: impl AsRef<Path>, platform: &PlatformConfig) -> Result<Self> {
        let path = path.as_ref();
        let registers = Arc::new(MappedRegion::open(
            path,
            u64::from(platform.register_base),
            regs::WINDOW_SIZE,
        )?);
        let memory = Arc::new(PhysicalMemory::open(path, platform)?);

        #[cfg(target_arch = "aarch64")]
        let cache: Arc<dyn CacheMaintenance> =
            Arc::new(crate::coherency::arm::ArmDataCache::new(Arc::clone(&memory)));
        #[cfg(not(target_arch = "aarch64"))]
        let cache: Arc<dyn CacheMaintenance> = Arc::new(crate::coherency::FenceOnly);

        tracing::info!(
            "mapped accelerator at {:#x} from {}",
            platform.register_base,
            path.display()
        );
        Ok(Self {
            registers,
            memory,
            cache,
        })
    }

    /// All three capabilities served by one simulator.
    pub fn simulated(sim: &Arc<SimulatedAccelerator>) -> Self {
        Self {
            registers: Arc::clone(sim) as Arc<dyn RegisterIo>,
            memory: Arc::clone(sim) as Arc<dyn DeviceMemory>,
            cache: Arc::clone(sim) as Arc<dyn CacheMaintenance>,
        }
    }

    /// Replace the cache maintenance backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn CacheMaintenance>) -> Self {
        self.cache = cache;
        self
    }
}
