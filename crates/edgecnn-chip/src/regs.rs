//! Register map of the CNN accelerator.
//!
//! All registers are 32 bits wide, word aligned, and addressed as byte
//! offsets from the accelerator's AXI-Lite base address.
//!
//! ```text
//! 0x00  CONTROL      RW  start / stop / reset strobes
//! 0x04  STATUS       RO  busy, done, error nibble
//! 0x08  CONFIG       RW  layer enables, activation, pooling
//! 0x0C  INPUT_DIM    RW  height << 16 | width
//! 0x10  WEIGHT_ADDR  RW  DDR address of the weight buffer
//! 0x14  BIAS_ADDR    RW  DDR address of the bias buffer
//! 0x18  INPUT_ADDR   RW  DDR address of the input frame
//! 0x1C  OUTPUT_ADDR  RW  DDR address of the logit buffer
//! 0x20  IRQ_ENABLE   RW  done / error interrupt enables
//! 0x24  IRQ_STATUS   W1C pending interrupts
//! 0x28  PERF_CYCLES  RO  cumulative cycle counter
//! 0x2C  PERF_OPS     RO  cumulative operation counter
//! ```

// ── Offsets ──────────────────────────────────────────────────────────────────

/// Control register.
pub const CONTROL: usize = 0x00;
/// Status register.
pub const STATUS: usize = 0x04;
/// Layer / activation / pooling configuration.
pub const CONFIG: usize = 0x08;
/// Packed input dimensions.
pub const INPUT_DIM: usize = 0x0C;
/// Weight buffer address.
pub const WEIGHT_ADDR: usize = 0x10;
/// Bias buffer address.
pub const BIAS_ADDR: usize = 0x14;
/// Input frame address.
pub const INPUT_ADDR: usize = 0x18;
/// Output buffer address.
pub const OUTPUT_ADDR: usize = 0x1C;
/// Interrupt enable.
pub const IRQ_ENABLE: usize = 0x20;
/// Interrupt status (write 1 to clear).
pub const IRQ_STATUS: usize = 0x24;
/// Cumulative cycle counter.
pub const PERF_CYCLES: usize = 0x28;
/// Cumulative operation counter.
pub const PERF_OPS: usize = 0x2C;

/// Size of the register window in bytes.
pub const WINDOW_SIZE: usize = PERF_OPS + 4;

/// Number of 32-bit registers in the window.
pub const REGISTER_COUNT: usize = WINDOW_SIZE / 4;

/// Value read back from an unmapped or powered-down AXI slave.
pub const UNMAPPED_READ: u32 = 0xFFFF_FFFF;

// ── Control register bits ────────────────────────────────────────────────────

/// CONTROL bits
pub mod control {
    /// Start inference on the frame at `INPUT_ADDR`.
    pub const START: u32 = 0x01;
    /// Abort the running inference.
    pub const STOP: u32 = 0x02;
    /// Hold the core in reset while set.
    pub const RESET: u32 = 0x04;
}

// ── Status register bits ─────────────────────────────────────────────────────

/// STATUS bits
pub mod status {
    /// Inference in progress.
    pub const BUSY: u32 = 0x01;
    /// Last inference finished.
    pub const DONE: u32 = 0x02;
    /// Device-specific error code.
    pub const ERROR_MASK: u32 = 0xF0;
    /// Shift of the error nibble.
    pub const ERROR_SHIFT: u32 = 4;

    /// Extract the 4-bit error code from a raw status word.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn error_code(raw: u32) -> u8 {
        ((raw & ERROR_MASK) >> ERROR_SHIFT) as u8
    }
}

// ── Config register fields ───────────────────────────────────────────────────

/// CONFIG fields
pub mod config {
    /// Per-layer enable bits 0-7.
    pub const LAYER_EN_MASK: u32 = 0x0000_00FF;
    /// Activation selector, bits 8-10.
    pub const ACT_MASK: u32 = 0x0000_0700;
    /// Shift of the activation selector.
    pub const ACT_SHIFT: u32 = 8;
    /// Pooling type, bit 11 (set = average).
    pub const POOL_AVG: u32 = 0x0000_0800;
}

// ── Interrupt bits (IRQ_ENABLE and IRQ_STATUS) ───────────────────────────────

/// IRQ_ENABLE / IRQ_STATUS bits
pub mod irq {
    /// Inference finished.
    pub const DONE: u32 = 0x01;
    /// Inference failed.
    pub const ERROR: u32 = 0x02;
    /// Every interrupt source.
    pub const ALL: u32 = DONE | ERROR;
    /// Value that clears every pending bit.
    pub const CLEAR_ALL: u32 = 0xFFFF_FFFF;
}
