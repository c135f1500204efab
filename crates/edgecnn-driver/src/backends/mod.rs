//! Hardware backends
//!
//! Two backends provide the register, device-memory and cache capabilities:
//! - **Mapped**: physical windows through `/dev/mem` or a UIO node (target board)
//! - **Software**: in-process simulator (tests, development hosts)

pub mod mmap;
pub mod software;

pub use mmap::{MappedRegion, PhysicalMemory};
pub use software::{SimBehavior, SimEvent, SimulatedAccelerator};
