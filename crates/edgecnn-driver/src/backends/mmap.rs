//! Physical memory windows mapped through a memory device file
//!
//! On the target board the accelerator's AXI-Lite registers and the DDR
//! buffers it masters are reached through `/dev/mem` (or a UIO node exposing
//! the same ranges). Each [`MappedRegion`] maps one physical window with
//! `O_SYNC`; [`PhysicalMemory`] stitches several windows into one
//! [`DeviceMemory`] view keyed by physical address.
//!
//! The mapping itself is the only unsafe boundary; every access after it is
//! bounds checked against the window.

use crate::error::{AccelError, Result};
use crate::memory::DeviceMemory;
use crate::mmio::RegisterIo;
use crate::PlatformConfig;
use edgecnn_chip::regs;
use rustix::fs::OFlags;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// One physical window mapped into the process.
#[derive(Debug)]
pub struct MappedRegion {
    /// Start of the page-aligned mapping
    ptr: NonNull<u8>,
    /// Length of the page-aligned mapping
    map_len: usize,
    /// Offset of `base` inside the mapping
    lead: usize,
    /// Physical address of the first usable byte
    base: u64,
    /// Usable bytes from `base`
    size: usize,
    path: PathBuf,
    _file: File,
}

impl MappedRegion {
    /// Map `size` bytes of `path` starting at physical address `base`.
    ///
    /// `base` need not be page aligned; the mapping is widened to whole
    /// pages and accesses are offset accordingly.
    ///
    /// # Errors
    ///
    /// Returns an error if the device file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>, base: u64, size: usize) -> Result<Self> {
        let path = path.as_ref();
        if size == 0 {
            return Err(AccelError::mapping(format!(
                "zero-length window at {base:#x} in {}",
                path.display()
            )));
        }

        #[allow(clippy::cast_possible_wrap)]
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlags::SYNC.bits() as i32)
            .open(path)
            .map_err(|e| AccelError::mapping(format!("cannot open {}: {e}", path.display())))?;

        let page = rustix::param::page_size() as u64;
        let aligned = base & !(page - 1);
        let lead = usize::try_from(base - aligned)
            .map_err(|_| AccelError::mapping("page offset exceeds usize"))?;
        let map_len = (lead + size).next_multiple_of(page as usize);

        tracing::debug!(
            "mapping {} bytes at {base:#x} from {} (aligned {aligned:#x}, {map_len} bytes)",
            size,
            path.display()
        );

        // SAFETY: the descriptor is open for read/write and outlives the
        // mapping (kept in `_file`). `aligned` is page aligned and `map_len`
        // is a non-zero multiple of the page size. The returned pointer is
        // only dereferenced within `map_len` and unmapped in Drop.
        let raw = unsafe {
            mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                aligned,
            )
        }
        .map_err(|e| AccelError::mapping(format!("mmap {base:#x}+{size:#x} failed: {e}")))?;

        let ptr = NonNull::new(raw.cast::<u8>())
            .ok_or_else(|| AccelError::mapping("mmap returned a null pointer"))?;

        Ok(Self {
            ptr,
            map_len,
            lead,
            base,
            size,
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// Physical address of the first byte.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Window length in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Device file backing the mapping.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Window offset of `[address, address + len)`, if fully inside.
    pub fn offset_of(&self, address: u64, len: usize) -> Option<usize> {
        let offset = usize::try_from(address.checked_sub(self.base)?).ok()?;
        (offset.checked_add(len)? <= self.size).then_some(offset)
    }

    /// Host pointer for a window offset. Caller checks bounds.
    fn at(&self, offset: usize) -> *mut u8 {
        // SAFETY: callers pass `offset <= size`, so `lead + offset` stays
        // inside the `map_len` bytes of the mapping.
        unsafe { self.ptr.as_ptr().add(self.lead + offset) }
    }

    /// Copy bytes out of the window.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::OutOfBounds`] if the range leaves the window.
    pub fn read_at(&self, offset: usize, buffer: &mut [u8]) -> Result<()> {
        self.check(offset, buffer.len())?;
        // SAFETY: range checked above; the mapping and the caller's buffer
        // are distinct allocations, and u8 has no alignment requirement.
        unsafe { std::ptr::copy_nonoverlapping(self.at(offset), buffer.as_mut_ptr(), buffer.len()) };
        Ok(())
    }

    /// Copy bytes into the window.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::OutOfBounds`] if the range leaves the window.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<()> {
        self.check(offset, data.len())?;
        // SAFETY: as in `read_at`, with source and destination swapped.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), self.at(offset), data.len()) };
        Ok(())
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset.checked_add(len).is_none_or(|end| end > self.size) {
            return Err(AccelError::OutOfBounds {
                address: self.base + offset as u64,
                len,
            });
        }
        Ok(())
    }

    fn word_in_range(&self, offset: usize) -> bool {
        offset % 4 == 0
            && (self.lead + offset) % 4 == 0
            && offset.checked_add(4).is_some_and(|end| end <= self.size)
    }
}

impl RegisterIo for MappedRegion {
    fn read32(&self, offset: usize) -> u32 {
        if !self.word_in_range(offset) {
            tracing::warn!("register read at {offset:#x} outside window, returning all-ones");
            return regs::UNMAPPED_READ;
        }
        // SAFETY: aligned and in range (checked above). Volatile so every
        // read reaches the device; STATUS and IRQ_STATUS change underneath us.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.at(offset).cast::<u32>().read_volatile()
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        if !self.word_in_range(offset) {
            tracing::warn!("register write at {offset:#x} outside window dropped");
            return;
        }
        // SAFETY: aligned and in range (checked above). Volatile so the
        // write is neither elided nor reordered with other register writes.
        #[allow(clippy::cast_ptr_alignment)]
        unsafe {
            self.at(offset).cast::<u32>().write_volatile(value);
        }
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        tracing::debug!("unmapping {:#x}+{:#x}", self.base, self.size);
        // SAFETY: `ptr` and `map_len` are exactly what mmap returned and
        // was given in `open`; nothing borrows the mapping past Drop.
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr().cast(), self.map_len) } {
            tracing::error!("munmap failed during drop: {e}");
        }
    }
}

// SAFETY: the region owns its mapping exclusively and never hands out
// references into it. Moving it between threads does not affect the mapping.
unsafe impl Send for MappedRegion {}

// SAFETY: all access goes through bounds-checked volatile word accesses or
// byte copies. Concurrent register access is serialized by the bus; buffer
// ownership is governed by the single-inference-in-flight protocol.
unsafe impl Sync for MappedRegion {}

/// Several physical windows viewed as one device-memory space.
#[derive(Debug)]
pub struct PhysicalMemory {
    windows: Vec<MappedRegion>,
}

impl PhysicalMemory {
    /// Combine already mapped windows.
    pub fn new(windows: Vec<MappedRegion>) -> Self {
        Self { windows }
    }

    /// Map the four buffer regions of `platform` from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if any region fails to map.
    pub fn open(path: impl AsRef<Path>, platform: &PlatformConfig) -> Result<Self> {
        let path = path.as_ref();
        let windows = platform
            .regions
            .as_array()
            .into_iter()
            .map(|base| MappedRegion::open(path, u64::from(base), platform.region_size))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(
            "mapped {} device-memory windows of {} KiB from {}",
            windows.len(),
            platform.region_size / 1024,
            path.display()
        );
        Ok(Self::new(windows))
    }

    /// Mapped windows.
    pub fn windows(&self) -> &[MappedRegion] {
        &self.windows
    }

    fn locate(&self, address: u64, len: usize) -> Result<(&MappedRegion, usize)> {
        self.windows
            .iter()
            .find_map(|w| w.offset_of(address, len).map(|off| (w, off)))
            .ok_or(AccelError::OutOfBounds { address, len })
    }
}

impl DeviceMemory for PhysicalMemory {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        let (window, offset) = self.locate(address, data.len())?;
        window.write_at(offset, data)
    }

    fn read_bytes(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        let (window, offset) = self.locate(address, buffer.len())?;
        window.read_at(offset, buffer)
    }
}

#[cfg(target_arch = "aarch64")]
impl crate::coherency::arm::AddressTranslation for std::sync::Arc<PhysicalMemory> {
    fn host_address(&self, address: u64) -> Option<usize> {
        let (window, offset) = self.locate(address, 0).ok()?;
        Some(window.at(offset) as usize)
    }
}
