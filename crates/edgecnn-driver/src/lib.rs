//! User-space driver for the FPGA CNN accelerator.
//!
//! The accelerator is an AXI-Lite register block plus AXI masters that read
//! weights, biases and a Q8.8 input frame from DDR and write one Q8.8 logit
//! per class back. This crate drives it from Linux without a kernel module.
//!
//! # Layers
//!
//! ```text
//! AcceleratorController    state machine: configure, load, start, wait, rank
//!   ├─ RegisterInterface   typed register access (sole hardware mutation)
//!   ├─ BufferCoherencyManager   flush before device reads, invalidate before host reads
//!   └─ ranking / fixed     softmax + top-K over Q8.8 logits
//!
//! Hardware                 capabilities handed to the controller
//!   ├─ MappedRegion / PhysicalMemory   /dev/mem windows (target board)
//!   └─ SimulatedAccelerator            in-process model (tests, hosts)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use edgecnn_driver::prelude::*;
//!
//! # fn main() -> edgecnn_driver::Result<()> {
//! let platform = PlatformConfig::from_env()?;
//! let hw = Hardware::map_physical("/dev/mem", &platform)?;
//! let mut accel = AcceleratorController::open(hw, platform)?;
//!
//! accel.configure(AcceleratorConfig::default())?;
//! accel.load_weights(&vec![0i16; 432])?;
//! accel.load_biases(&vec![0i16; 16])?;
//! accel.submit_frame(&vec![0i16; 128 * 128 * 3])?;
//! accel.wait_for_completion(poll_timeout(1000))?;
//!
//! for c in accel.get_result()?.classifications {
//!     println!("class {} {:.1}%", c.class_id, c.confidence * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
pub mod coherency;
mod config;
mod controller;
mod device;
mod error;
pub mod fixed;
pub mod memory;
pub mod mmio;
pub mod ranking;
mod status;

pub use backends::{MappedRegion, PhysicalMemory, SimBehavior, SimEvent, SimulatedAccelerator};
pub use coherency::{BufferCoherencyManager, CacheMaintenance, FenceOnly};
pub use config::{parse_number, AcceleratorConfig, MemoryRegions, PlatformConfig};
pub use controller::{
    poll_timeout, AcceleratorController, AcceleratorHandle, AcceleratorState, InterruptHandler,
    DEFAULT_TOP_K, POLL_INTERVAL, RESET_HOLD,
};
pub use device::Hardware;
pub use edgecnn_chip::{Activation, PoolType};
pub use error::{AccelError, Result};
pub use memory::DeviceMemory;
pub use mmio::{Register, RegisterInterface, RegisterIo};
pub use ranking::{Classification, InferenceResult};
pub use status::DeviceStatus;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        poll_timeout, AccelError, AcceleratorConfig, AcceleratorController, AcceleratorState,
        Activation, Classification, DeviceStatus, Hardware, InferenceResult, PlatformConfig,
        PoolType, Result, SimulatedAccelerator,
    };
}
