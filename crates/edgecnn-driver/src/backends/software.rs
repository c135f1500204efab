//! In-process accelerator simulator
//!
//! [`SimulatedAccelerator`] implements all three hardware capabilities
//! ([`RegisterIo`], [`DeviceMemory`], [`CacheMaintenance`]) so the complete
//! driver protocol runs without an FPGA. It is used by the test suite and by
//! `edgecnn --simulate`.
//!
//! ## Register model
//!
//! - `CONTROL` start sets busy; completion happens after a configurable
//!   number of `STATUS` reads (or [`SimulatedAccelerator::tick`] calls).
//! - `CONTROL` stop clears busy, reset clears status and pending interrupts.
//! - `IRQ_STATUS` is write-1-to-clear and latches done / error on completion.
//! - `STATUS`, `PERF_CYCLES` and `PERF_OPS` ignore writes.
//!
//! ## Compute model
//!
//! A single 3×3 convolution with [`SIM_FILTERS`] filters over a
//! [`SIM_CHANNELS`]-channel, channel-interleaved Q8.8 frame, zero padded and
//! evaluated at stride [`SIM_STRIDE`], followed by the configured activation
//! and global pooling. Class `c` reads filter `c % SIM_FILTERS`. The weight
//! buffer holds [`SIM_WEIGHT_COUNT`] words laid out `[filter][ky][kx][channel]`
//! and the bias buffer one word per filter.
//!
//! Every register write, flush and invalidate is appended to an event log so
//! tests can check protocol ordering.

use crate::coherency::CacheMaintenance;
use crate::error::{AccelError, Result};
use crate::fixed::{decode_slice, to_fixed};
use crate::memory::DeviceMemory;
use crate::mmio::{Register, RegisterIo};
use edgecnn_chip::fields::{self, MAX_CLASSES};
use edgecnn_chip::regs::{self, control, irq, status};
use edgecnn_chip::{Activation, PoolType};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Convolution filters in the simulated network.
pub const SIM_FILTERS: usize = 16;
/// Kernel edge length.
pub const SIM_KERNEL: usize = 3;
/// Input channels the simulated network expects.
pub const SIM_CHANNELS: usize = 3;
/// Convolution stride.
pub const SIM_STRIDE: usize = 2;
/// Weight words consumed per inference.
pub const SIM_WEIGHT_COUNT: usize = SIM_FILTERS * SIM_KERNEL * SIM_KERNEL * SIM_CHANNELS;
/// Default number of status polls before completion.
pub const DEFAULT_LATENCY_POLLS: u32 = 3;

/// Simulated MAC array width.
const MACS_PER_CYCLE: u64 = 64;
/// Fixed per-inference overhead in cycles.
const SETUP_CYCLES: u64 = 1024;

const PAGE_SIZE: usize = 4096;
const BUS_LIMIT: u64 = 1 << 32;

/// How the simulated core behaves once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimBehavior {
    /// Run the model and report done
    #[default]
    Normal,
    /// Stay busy forever
    Stall,
    /// Clear busy and report the given 4-bit error code
    Fault(u8),
    /// Clear busy without reporting done or an error
    Vanish,
    /// Every register read returns all-ones
    Unmapped,
}

/// Observable side effect, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// Host wrote a register
    RegisterWrite {
        /// Target register
        register: Register,
        /// Value written
        value: u32,
    },
    /// Host cleaned a range to memory
    Flush {
        /// Physical address
        address: u64,
        /// Length in bytes
        len: usize,
    },
    /// Host invalidated a range
    Invalidate {
        /// Physical address
        address: u64,
        /// Length in bytes
        len: usize,
    },
    /// Simulated core finished an inference
    Completed,
}

#[derive(Debug)]
struct SimState {
    regs: [u32; regs::REGISTER_COUNT],
    behavior: SimBehavior,
    latency: u32,
    /// Polls left while an inference is in flight
    remaining: Option<u32>,
    pages: HashMap<u64, Box<[u8; PAGE_SIZE]>>,
    events: Vec<SimEvent>,
}

/// Software model of the accelerator and its DDR.
#[derive(Debug)]
pub struct SimulatedAccelerator {
    state: Mutex<SimState>,
}

impl Default for SimulatedAccelerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAccelerator {
    /// Idle core with [`DEFAULT_LATENCY_POLLS`] latency.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                regs: [0; regs::REGISTER_COUNT],
                behavior: SimBehavior::Normal,
                latency: DEFAULT_LATENCY_POLLS,
                remaining: None,
                pages: HashMap::new(),
                events: Vec::new(),
            }),
        }
    }

    /// Set the number of status polls an inference takes.
    #[must_use]
    pub fn with_latency(self, polls: u32) -> Self {
        self.lock().latency = polls;
        self
    }

    /// Set the behaviour on start.
    #[must_use]
    pub fn with_behavior(self, behavior: SimBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    /// Change the behaviour; takes effect on the next start.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        self.lock().behavior = behavior;
    }

    /// Force the STATUS register, as a core driven by another master would.
    pub fn set_status(&self, raw: u32) {
        self.lock().regs[regs::STATUS / 4] = raw;
    }

    /// Advance the core by one poll interval without reading STATUS.
    pub fn tick(&self) {
        self.lock().step();
    }

    /// Whether the interrupt output is asserted.
    pub fn irq_line(&self) -> bool {
        let st = self.lock();
        st.regs[regs::IRQ_STATUS / 4] & st.regs[regs::IRQ_ENABLE / 4] != 0
    }

    /// Register value without read side effects.
    pub fn peek(&self, register: Register) -> u32 {
        self.lock().regs[register.offset() / 4]
    }

    /// Q8.8 words in simulated DDR, without recording an event.
    pub fn peek_words(&self, address: u64, count: usize) -> Vec<i16> {
        self.lock().read_words(address, count)
    }

    /// Snapshot of the event log.
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().events.clone()
    }

    /// Empty the event log.
    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SimState {
    fn reg(&self, offset: usize) -> u32 {
        self.regs[offset / 4]
    }

    fn set_reg(&mut self, offset: usize, value: u32) {
        self.regs[offset / 4] = value;
    }

    fn control(&mut self, value: u32) {
        if value & control::RESET != 0 {
            self.remaining = None;
            self.set_reg(regs::STATUS, 0);
            self.set_reg(regs::IRQ_STATUS, 0);
        } else if value & control::STOP != 0 {
            self.remaining = None;
            let raw = self.reg(regs::STATUS) & !status::BUSY;
            self.set_reg(regs::STATUS, raw);
        } else if value & control::START != 0 && self.remaining.is_none() {
            self.set_reg(regs::STATUS, status::BUSY);
            self.remaining = Some(self.latency);
        }
    }

    fn step(&mut self) {
        if self.behavior == SimBehavior::Stall {
            return;
        }
        match self.remaining {
            Some(n) if n > 1 => self.remaining = Some(n - 1),
            Some(_) => self.finish(),
            None => {}
        }
    }

    fn finish(&mut self) {
        self.remaining = None;
        match self.behavior {
            SimBehavior::Normal => {
                let (logits, macs) = self.run_model();
                let output = u64::from(self.reg(regs::OUTPUT_ADDR));
                self.write_mem(output, bytemuck::cast_slice(&logits));
                self.set_reg(regs::STATUS, status::DONE);
                self.raise(irq::DONE);
                self.count(macs);
            }
            SimBehavior::Fault(code) => {
                let raw = (u32::from(code) << status::ERROR_SHIFT) & status::ERROR_MASK;
                self.set_reg(regs::STATUS, raw);
                self.raise(irq::ERROR);
            }
            SimBehavior::Vanish | SimBehavior::Stall | SimBehavior::Unmapped => {
                self.set_reg(regs::STATUS, 0);
            }
        }
        self.events.push(SimEvent::Completed);
    }

    fn raise(&mut self, bits: u32) {
        let pending = self.reg(regs::IRQ_STATUS) | bits;
        self.set_reg(regs::IRQ_STATUS, pending);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn count(&mut self, macs: u64) {
        let cycles = SETUP_CYCLES + macs / MACS_PER_CYCLE;
        let ops = macs * 2;
        let c = self.reg(regs::PERF_CYCLES).wrapping_add(cycles as u32);
        let o = self.reg(regs::PERF_OPS).wrapping_add(ops as u32);
        self.set_reg(regs::PERF_CYCLES, c);
        self.set_reg(regs::PERF_OPS, o);
    }

    /// Returns the logits for every class slot and the MACs performed.
    #[allow(clippy::cast_precision_loss)]
    fn run_model(&self) -> (Vec<i16>, u64) {
        let (width, height) = fields::unpack_input_dim(self.reg(regs::INPUT_DIM));
        let (w, h) = (usize::from(width), usize::from(height));
        let (activation, pool) = fields::unpack_config(self.reg(regs::CONFIG))
            .map_or((Activation::None, PoolType::Max), |(_, a, p)| (a, p));

        let weights = decode_slice(
            &self.read_words(u64::from(self.reg(regs::WEIGHT_ADDR)), SIM_WEIGHT_COUNT),
        );
        let biases = decode_slice(&self.read_words(u64::from(self.reg(regs::BIAS_ADDR)), SIM_FILTERS));
        let frame = decode_slice(
            &self.read_words(u64::from(self.reg(regs::INPUT_ADDR)), w * h * SIM_CHANNELS),
        );

        let taps = SIM_KERNEL * SIM_KERNEL * SIM_CHANNELS;
        let mut features = [0.0f32; SIM_FILTERS];
        let mut positions = 0u64;

        for (f, feature) in features.iter_mut().enumerate() {
            let kernel = &weights[f * taps..(f + 1) * taps];
            let mut pooled: Option<f32> = None;
            let mut n = 0u32;
            for y in (0..h).step_by(SIM_STRIDE) {
                for x in (0..w).step_by(SIM_STRIDE) {
                    let mut sum = biases[f];
                    for ky in 0..SIM_KERNEL {
                        let Some(iy) = (y + ky).checked_sub(1).filter(|&iy| iy < h) else {
                            continue;
                        };
                        for kx in 0..SIM_KERNEL {
                            let Some(ix) = (x + kx).checked_sub(1).filter(|&ix| ix < w) else {
                                continue;
                            };
                            let tap = (ky * SIM_KERNEL + kx) * SIM_CHANNELS;
                            let pixel = (iy * w + ix) * SIM_CHANNELS;
                            for c in 0..SIM_CHANNELS {
                                sum += kernel[tap + c] * frame[pixel + c];
                            }
                        }
                    }
                    let v = activate(activation, sum);
                    pooled = Some(match (pool, pooled) {
                        (_, None) => v,
                        (PoolType::Max, Some(acc)) => acc.max(v),
                        (PoolType::Avg, Some(acc)) => acc + v,
                    });
                    n += 1;
                }
            }
            *feature = match (pool, pooled) {
                (_, None) => 0.0,
                (PoolType::Max, Some(v)) => v,
                (PoolType::Avg, Some(v)) => v / n as f32,
            };
            positions = u64::from(n);
        }

        let logits = (0..usize::from(MAX_CLASSES))
            .map(|c| to_fixed(features[c % SIM_FILTERS]))
            .collect();
        (logits, positions * (SIM_FILTERS * taps) as u64)
    }

    fn write_mem(&mut self, address: u64, data: &[u8]) {
        let mut addr = address;
        let mut rest = data;
        while !rest.is_empty() {
            let page = addr / PAGE_SIZE as u64;
            let off = offset_in_page(addr);
            let n = rest.len().min(PAGE_SIZE - off);
            let bytes = self
                .pages
                .entry(page)
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            bytes[off..off + n].copy_from_slice(&rest[..n]);
            addr += n as u64;
            rest = &rest[n..];
        }
    }

    fn read_mem(&self, address: u64, buffer: &mut [u8]) {
        let mut addr = address;
        let mut rest = buffer;
        while !rest.is_empty() {
            let page = addr / PAGE_SIZE as u64;
            let off = offset_in_page(addr);
            let n = rest.len().min(PAGE_SIZE - off);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(n);
            match self.pages.get(&page) {
                Some(bytes) => head.copy_from_slice(&bytes[off..off + n]),
                None => head.fill(0),
            }
            addr += n as u64;
            rest = tail;
        }
    }

    fn read_words(&self, address: u64, count: usize) -> Vec<i16> {
        let mut words = vec![0i16; count];
        self.read_mem(address, bytemuck::cast_slice_mut(&mut words));
        words
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn offset_in_page(address: u64) -> usize {
    (address % PAGE_SIZE as u64) as usize
}

fn activate(activation: Activation, x: f32) -> f32 {
    let sigmoid = |v: f32| 1.0 / (1.0 + (-v).exp());
    match activation {
        Activation::None => x,
        Activation::Relu => x.max(0.0),
        Activation::Relu6 => x.clamp(0.0, 6.0),
        Activation::LeakyRelu => {
            if x < 0.0 {
                0.125 * x
            } else {
                x
            }
        }
        Activation::Sigmoid => sigmoid(x),
        Activation::Tanh => x.tanh(),
        Activation::Swish => x * sigmoid(x),
    }
}

fn check_bus(address: u64, len: usize) -> Result<()> {
    let end = address.checked_add(len as u64);
    if end.is_none_or(|end| end > BUS_LIMIT) {
        return Err(AccelError::OutOfBounds { address, len });
    }
    Ok(())
}

impl RegisterIo for SimulatedAccelerator {
    fn read32(&self, offset: usize) -> u32 {
        let mut st = self.lock();
        if st.behavior == SimBehavior::Unmapped {
            return regs::UNMAPPED_READ;
        }
        if offset == regs::STATUS {
            st.step();
        }
        st.regs.get(offset / 4).copied().unwrap_or(regs::UNMAPPED_READ)
    }

    fn write32(&self, offset: usize, value: u32) {
        let Ok(register) = Register::from_offset(offset) else {
            return;
        };
        let mut st = self.lock();
        st.events.push(SimEvent::RegisterWrite { register, value });
        match register {
            Register::Control => {
                st.set_reg(offset, value);
                st.control(value);
            }
            Register::IrqStatus => {
                let pending = st.reg(offset) & !value;
                st.set_reg(offset, pending);
            }
            r if r.is_read_only() => {}
            _ => st.set_reg(offset, value),
        }
    }
}

impl DeviceMemory for SimulatedAccelerator {
    fn write_bytes(&self, address: u64, data: &[u8]) -> Result<()> {
        check_bus(address, data.len())?;
        self.lock().write_mem(address, data);
        Ok(())
    }

    fn read_bytes(&self, address: u64, buffer: &mut [u8]) -> Result<()> {
        check_bus(address, buffer.len())?;
        self.lock().read_mem(address, buffer);
        Ok(())
    }
}

impl CacheMaintenance for SimulatedAccelerator {
    fn flush_range(&self, address: u64, len: usize) {
        self.lock().events.push(SimEvent::Flush { address, len });
    }

    fn invalidate_range(&self, address: u64, len: usize) {
        self.lock().events.push(SimEvent::Invalidate { address, len });
    }
}
