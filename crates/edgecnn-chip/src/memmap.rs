//! Default memory map of the ZUBoard 1CG reference design.
//!
//! ```text
//! Region            Address       Purpose
//! ───────────────── ───────────── ──────────────────────────────────────
//! Accelerator regs  0x8000_0000   AXI-Lite control / status (48 bytes)
//! Video DMA         0x8001_0000   AXI DMA feeding camera frames
//! Weights DMA       0x8002_0000   AXI DMA streaming parameters
//! Interrupt ctrl    0x8003_0000   AXI INTC, accelerator on line 0
//! Weights           0x1000_0000   DDR, 256 MB offset
//! Biases            0x1800_0000   DDR, 384 MB offset
//! Input frame       0x2000_0000   DDR, 512 MB offset
//! Output logits     0x2800_0000   DDR, 640 MB offset
//! ```
//!
//! These are defaults for one bitstream. Other designs place the IP
//! elsewhere, so the driver takes every address as a parameter.

/// Accelerator AXI-Lite base address.
pub const ACCEL_BASE: u32 = 0x8000_0000;
/// Video (frame) DMA engine base address.
pub const DMA_VIDEO_BASE: u32 = 0x8001_0000;
/// Weights DMA engine base address.
pub const DMA_WEIGHTS_BASE: u32 = 0x8002_0000;

/// DDR buffer holding Q8.8 weights.
pub const WEIGHT_MEM: u32 = 0x1000_0000;
/// DDR buffer holding Q8.8 biases.
pub const BIAS_MEM: u32 = 0x1800_0000;
/// DDR buffer holding the Q8.8 input frame.
pub const INPUT_MEM: u32 = 0x2000_0000;
/// DDR buffer receiving Q8.8 logits.
pub const OUTPUT_MEM: u32 = 0x2800_0000;

/// Spacing between the DDR buffers above.
pub const REGION_STRIDE: u32 = 0x0800_0000;

/// Bytes per element in every device buffer (Q8.8 is 16 bits).
pub const ELEMENT_BYTES: usize = 2;

/// Largest input frame in bytes: 224 × 224 × 255 channels × 2.
pub const MAX_FRAME_BYTES: usize = 224 * 224 * 255 * ELEMENT_BYTES;
