//! Register access for the accelerator
//!
//! [`RegisterIo`] is the raw 32-bit capability a backend provides: a mapped
//! AXI-Lite window on hardware, or the simulator in tests. [`RegisterInterface`]
//! layers the accelerator's register map on top and is the only code in the
//! driver that mutates hardware state.
//!
//! Reads are not idempotent. Status and interrupt registers may change
//! between reads, and some hardware variants self-clear on read.

use crate::error::{AccelError, Result};
use edgecnn_chip::regs;
use std::fmt::Debug;
use std::sync::Arc;

/// Raw 32-bit register window.
///
/// Methods take `&self` so the same window can be serviced from an
/// interrupt handler while the controller holds it.
pub trait RegisterIo: Debug + Send + Sync {
    /// Read the word at `offset` bytes from the window base.
    fn read32(&self, offset: usize) -> u32;

    /// Write the word at `offset` bytes from the window base.
    fn write32(&self, offset: usize, value: u32);
}

/// Accelerator registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Start / stop / reset strobes
    Control,
    /// Busy, done and error nibble
    Status,
    /// Layer enables, activation, pooling
    Config,
    /// Packed input dimensions
    InputDim,
    /// Weight buffer address
    WeightAddr,
    /// Bias buffer address
    BiasAddr,
    /// Input frame address
    InputAddr,
    /// Output buffer address
    OutputAddr,
    /// Interrupt enables
    IrqEnable,
    /// Pending interrupts (write 1 to clear)
    IrqStatus,
    /// Cumulative cycles
    PerfCycles,
    /// Cumulative operations
    PerfOps,
}

impl Register {
    /// Every register, in address order.
    pub const ALL: [Self; regs::REGISTER_COUNT] = [
        Self::Control,
        Self::Status,
        Self::Config,
        Self::InputDim,
        Self::WeightAddr,
        Self::BiasAddr,
        Self::InputAddr,
        Self::OutputAddr,
        Self::IrqEnable,
        Self::IrqStatus,
        Self::PerfCycles,
        Self::PerfOps,
    ];

    /// Byte offset from the register base.
    pub const fn offset(self) -> usize {
        match self {
            Self::Control => regs::CONTROL,
            Self::Status => regs::STATUS,
            Self::Config => regs::CONFIG,
            Self::InputDim => regs::INPUT_DIM,
            Self::WeightAddr => regs::WEIGHT_ADDR,
            Self::BiasAddr => regs::BIAS_ADDR,
            Self::InputAddr => regs::INPUT_ADDR,
            Self::OutputAddr => regs::OUTPUT_ADDR,
            Self::IrqEnable => regs::IRQ_ENABLE,
            Self::IrqStatus => regs::IRQ_STATUS,
            Self::PerfCycles => regs::PERF_CYCLES,
            Self::PerfOps => regs::PERF_OPS,
        }
    }

    /// Look up the register at a raw byte offset.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is unaligned or past the register window.
    pub fn from_offset(offset: usize) -> Result<Self> {
        if offset % 4 != 0 || offset >= regs::WINDOW_SIZE {
            return Err(AccelError::OutOfBounds {
                address: offset as u64,
                len: 4,
            });
        }
        Ok(Self::ALL[offset / 4])
    }

    /// Whether writes are ignored by hardware.
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Status | Self::PerfCycles | Self::PerfOps)
    }
}

/// Typed view of the accelerator's register window.
#[derive(Debug, Clone)]
pub struct RegisterInterface {
    io: Arc<dyn RegisterIo>,
}

impl RegisterInterface {
    /// Wrap a raw register window.
    pub fn new(io: Arc<dyn RegisterIo>) -> Self {
        Self { io }
    }

    /// Read a register.
    pub fn read(&self, reg: Register) -> u32 {
        let value = self.io.read32(reg.offset());
        tracing::trace!("read {reg:?} = {value:#010x}");
        value
    }

    /// Write a register.
    pub fn write(&self, reg: Register, value: u32) {
        tracing::trace!("write {reg:?} = {value:#010x}");
        self.io.write32(reg.offset(), value);
    }

    /// Read the register at a raw byte offset.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` does not name a register.
    pub fn read_offset(&self, offset: usize) -> Result<u32> {
        Register::from_offset(offset).map(|reg| self.read(reg))
    }

    /// Write the register at a raw byte offset.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` does not name a register.
    pub fn write_offset(&self, offset: usize, value: u32) -> Result<()> {
        Register::from_offset(offset).map(|reg| self.write(reg, value))
    }

    /// Underlying raw window, shared with interrupt handlers.
    pub(crate) fn io(&self) -> &Arc<dyn RegisterIo> {
        &self.io
    }
}
