//! Accelerator state machine
//!
//! ```text
//!            configure            start_inference         completion
//!   Idle ──────────────► Configured ──────────────► Running ──────────► Done
//!    ▲                        ▲                        │                 │
//!    │ stop / reset           └──── configure ─────────┼─────────────────┤
//!    │                                                 │ timeout / error │
//!    └──────────────────────────────────────────────── Error ◄───────────┘
//! ```
//!
//! One controller drives one accelerator with at most one inference in
//! flight. A start while the device reports busy is rejected, never queued.
//! Stop and reset return to idle but keep the programmed configuration, so
//! a start from idle is accepted once [`AcceleratorController::configure`]
//! has succeeded.
//!
//! Completion is observed either by polling ([`AcceleratorController::wait_for_completion`],
//! [`AcceleratorController::is_complete`]) or by an [`InterruptHandler`]
//! serviced from an IRQ thread. The two meet at a single atomic completion
//! flag; nothing else is shared.

use crate::coherency::BufferCoherencyManager;
use crate::config::{AcceleratorConfig, MemoryRegions, PlatformConfig};
use crate::device::Hardware;
use crate::error::{AccelError, Result};
use crate::memory::{self, DeviceMemory};
use crate::mmio::{Register, RegisterInterface, RegisterIo};
use crate::ranking::{self, InferenceResult};
use crate::status::DeviceStatus;
use edgecnn_chip::regs::{self, control, irq, status};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Status poll interval.
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long the reset strobe is held.
pub const RESET_HOLD: Duration = Duration::from_micros(10);

/// Classes returned by [`AcceleratorController::get_result`].
pub const DEFAULT_TOP_K: usize = 5;

/// Timeout argument for a millisecond count, where 0 waits forever.
pub const fn poll_timeout(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorState {
    /// Reset, awaiting configuration
    Idle,
    /// Registers programmed, ready to start
    Configured,
    /// Inference in flight
    Running,
    /// Completion observed, results readable
    Done,
    /// Last operation failed; reset to recover
    Error,
    /// Reset strobe asserted
    Reset,
}

impl fmt::Display for AcceleratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Per-accelerator bookkeeping: addresses, configuration, completion flag.
#[derive(Debug, Clone)]
pub struct AcceleratorHandle {
    platform: PlatformConfig,
    config: AcceleratorConfig,
    configured: bool,
    completion: Arc<AtomicBool>,
}

impl AcceleratorHandle {
    fn new(platform: PlatformConfig) -> Self {
        Self {
            platform,
            config: AcceleratorConfig::default(),
            configured: false,
            completion: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Accelerator register base address.
    pub const fn register_base(&self) -> u32 {
        self.platform.register_base
    }

    /// Video DMA engine base address.
    pub const fn dma_video_base(&self) -> u32 {
        self.platform.dma_video_base
    }

    /// Weights DMA engine base address.
    pub const fn dma_weights_base(&self) -> u32 {
        self.platform.dma_weights_base
    }

    /// Device-memory buffers.
    pub const fn regions(&self) -> &MemoryRegions {
        &self.platform.regions
    }

    /// Board addresses.
    pub const fn platform(&self) -> &PlatformConfig {
        &self.platform
    }

    /// Active network configuration.
    pub const fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    /// Whether a configuration has been programmed since init.
    ///
    /// Survives [`AcceleratorController::stop`] and
    /// [`AcceleratorController::reset`]; the core keeps its configuration
    /// registers across both.
    pub const fn is_configured(&self) -> bool {
        self.configured
    }

    /// Whether completion of the last inference has been observed.
    pub fn completion_observed(&self) -> bool {
        self.completion.load(Ordering::Acquire)
    }
}

/// Interrupt service routine for one accelerator.
///
/// Reads IRQ_STATUS, sets the completion flag on done and writes the
/// pending bits back to clear them. Performs two or three register accesses
/// and one atomic store: no allocation, no locking, no logging.
#[derive(Debug, Clone)]
pub struct InterruptHandler {
    io: Arc<dyn RegisterIo>,
    completion: Arc<AtomicBool>,
}

impl InterruptHandler {
    /// Service the interrupt. Returns whether done was pending.
    pub fn handle(&self) -> bool {
        let pending = self.io.read32(regs::IRQ_STATUS);
        let done = pending & irq::DONE != 0;
        if done {
            self.completion.store(true, Ordering::Release);
        }
        if pending != 0 {
            self.io.write32(regs::IRQ_STATUS, pending);
        }
        done
    }
}

/// Drives one accelerator through configure, load, start, wait and read.
#[derive(Debug)]
pub struct AcceleratorController {
    regs: RegisterInterface,
    memory: Arc<dyn DeviceMemory>,
    coherency: BufferCoherencyManager,
    handle: AcceleratorHandle,
    state: AcceleratorState,
}

impl AcceleratorController {
    /// Wrap hardware without touching it. Call [`init`](Self::init) next.
    pub fn new(hardware: Hardware, platform: PlatformConfig) -> Self {
        Self {
            regs: RegisterInterface::new(hardware.registers),
            memory: hardware.memory,
            coherency: BufferCoherencyManager::new(hardware.cache),
            handle: AcceleratorHandle::new(platform),
            state: AcceleratorState::Idle,
        }
    }

    /// [`new`](Self::new) followed by [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::HardwareUnresponsive`] if nothing answers at
    /// the register base.
    pub fn open(hardware: Hardware, platform: PlatformConfig) -> Result<Self> {
        let mut ctrl = Self::new(hardware, platform);
        ctrl.init()?;
        Ok(ctrl)
    }

    /// Restore defaults, reset the core and check that it responds.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::HardwareUnresponsive`] if STATUS reads all-ones.
    /// The controller is left in [`AcceleratorState::Error`]; no retry is
    /// attempted.
    pub fn init(&mut self) -> Result<()> {
        self.handle.config = AcceleratorConfig::default();
        self.handle.configured = false;
        self.reset();

        let raw = self.regs.read(Register::Status);
        if raw == regs::UNMAPPED_READ {
            warn!(
                "no accelerator at {:#x}: status reads {raw:#010x}",
                self.handle.register_base()
            );
            self.transition(AcceleratorState::Error);
            return Err(AccelError::HardwareUnresponsive { status: raw });
        }

        info!(
            "accelerator at {:#x} initialized (status {raw:#010x})",
            self.handle.register_base()
        );
        Ok(())
    }

    /// Validate and program a network configuration.
    ///
    /// Writes CONFIG, INPUT_DIM and all four buffer address registers.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::InvalidConfig`] before any register write if
    /// the configuration is out of range, or [`AccelError::InvalidState`]
    /// while an inference is running. The state is unchanged on error.
    pub fn configure(&mut self, config: AcceleratorConfig) -> Result<()> {
        self.ensure_not_running("configure")?;
        config.validate()?;

        self.handle.config = config;
        self.handle.configured = true;
        self.regs.write(Register::Config, config.config_register());
        self.regs.write(Register::InputDim, config.input_dim_register());

        let regions = *self.handle.regions();
        self.regs.write(Register::WeightAddr, regions.weights);
        self.regs.write(Register::BiasAddr, regions.biases);
        self.regs.write(Register::InputAddr, regions.input);
        self.regs.write(Register::OutputAddr, regions.output);

        info!(
            "configured {}x{}x{}, {} classes, {:?}/{:?}, layers {:#04x}",
            config.input_width,
            config.input_height,
            config.input_channels,
            config.num_classes,
            config.activation,
            config.pool_type,
            config.layer_enable
        );
        self.transition(AcceleratorState::Configured);
        Ok(())
    }

    /// Copy Q8.8 weights into the weight buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::InvalidBuffer`] for empty or oversized data.
    pub fn load_weights(&mut self, weights: &[i16]) -> Result<()> {
        let address = self.handle.regions().weights;
        self.load_parameters("weights", Register::WeightAddr, address, weights)
    }

    /// Copy Q8.8 biases into the bias buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::InvalidBuffer`] for empty or oversized data.
    pub fn load_biases(&mut self, biases: &[i16]) -> Result<()> {
        let address = self.handle.regions().biases;
        self.load_parameters("biases", Register::BiasAddr, address, biases)
    }

    fn load_parameters(
        &mut self,
        what: &str,
        register: Register,
        address: u32,
        data: &[i16],
    ) -> Result<()> {
        self.ensure_not_running(what)?;
        if data.is_empty() {
            return Err(AccelError::invalid_buffer(format!("{what} buffer is empty")));
        }
        let bytes = std::mem::size_of_val(data);
        if bytes > self.handle.platform.region_size {
            return Err(AccelError::invalid_buffer(format!(
                "{bytes} bytes of {what} exceed the {}-byte region",
                self.handle.platform.region_size
            )));
        }

        memory::write_words(self.memory.as_ref(), u64::from(address), data)?;
        self.coherency
            .flush_before_device_read(u64::from(address), bytes);
        // Re-latch the address in case the buffer moved.
        self.regs.write(register, address);

        info!("loaded {} {what} words at {address:#x}", data.len());
        Ok(())
    }

    /// Copy one Q8.8 frame into the input buffer.
    ///
    /// The frame must hold exactly width × height × channels elements of the
    /// active configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::InvalidBuffer`] on a length mismatch.
    pub fn write_frame(&mut self, frame: &[i16]) -> Result<()> {
        self.ensure_not_running("write frame")?;
        let expected = self.handle.config.frame_elements();
        if frame.len() != expected {
            return Err(AccelError::invalid_buffer(format!(
                "frame has {} elements, configuration expects {expected}",
                frame.len()
            )));
        }
        let address = self.handle.regions().input;
        memory::write_words(self.memory.as_ref(), u64::from(address), frame)?;
        debug!("wrote {expected}-element frame at {address:#x}");
        Ok(())
    }

    /// [`write_frame`](Self::write_frame) then start on the input buffer.
    ///
    /// # Errors
    ///
    /// See [`write_frame`](Self::write_frame) and
    /// [`start_inference`](Self::start_inference).
    pub fn submit_frame(&mut self, frame: &[i16]) -> Result<()> {
        self.write_frame(frame)?;
        self.start_inference(self.handle.regions().input)
    }

    /// Start inference on the frame at `frame_address`.
    ///
    /// Flushes width × height × channels × 2 bytes at `frame_address` before
    /// the start strobe. Allowed from idle once a configuration has been
    /// programmed, so a start may be retried after [`stop`](Self::stop) or
    /// [`reset`](Self::reset) without reconfiguring.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::Busy`] without writing CONTROL if the device
    /// reports busy, including a second start while one is in flight.
    /// Returns [`AccelError::InvalidState`] if never configured, after an
    /// error that needs a reset, or while a finished inference has not
    /// been collected.
    pub fn start_inference(&mut self, frame_address: u32) -> Result<()> {
        let raw = self.regs.read(Register::Status);
        if raw & status::BUSY != 0 {
            warn!("start rejected: accelerator busy (status {raw:#010x})");
            return Err(AccelError::Busy);
        }

        let ready = match self.state {
            AcceleratorState::Configured | AcceleratorState::Done => true,
            AcceleratorState::Idle => self.handle.configured,
            AcceleratorState::Running | AcceleratorState::Error | AcceleratorState::Reset => false,
        };
        if !ready {
            let reason = if self.handle.configured {
                format!("cannot start inference while {}", self.state)
            } else {
                "cannot start inference before configure".to_string()
            };
            return Err(AccelError::invalid_state(reason));
        }

        self.regs.write(Register::InputAddr, frame_address);
        self.coherency.flush_before_device_read(
            u64::from(frame_address),
            self.handle.config.frame_bytes(),
        );
        self.handle.completion.store(false, Ordering::Release);
        self.regs.write(Register::Control, control::START);

        debug!("inference started on frame at {frame_address:#x}");
        self.transition(AcceleratorState::Running);
        Ok(())
    }

    /// Poll STATUS every [`POLL_INTERVAL`] until the inference finishes.
    ///
    /// `None` waits without bound. A completion already recorded by an
    /// interrupt handler returns immediately. If busy clears without done,
    /// STATUS is read once more before deciding.
    ///
    /// # Errors
    ///
    /// - [`AccelError::Timeout`] once `timeout` has elapsed, never earlier
    /// - [`AccelError::DeviceError`] when the error nibble is set
    /// - [`AccelError::AmbiguousCompletion`] when busy cleared with neither
    ///   done nor an error code
    ///
    /// All three leave the controller in [`AcceleratorState::Error`].
    pub fn wait_for_completion(&mut self, timeout: Option<Duration>) -> Result<()> {
        match self.state {
            AcceleratorState::Running => {}
            AcceleratorState::Done if self.handle.completion_observed() => return Ok(()),
            AcceleratorState::Done => {}
            other => {
                return Err(AccelError::invalid_state(format!(
                    "no inference to wait for while {other}"
                )))
            }
        }

        let started = Instant::now();
        let mut polls = 0u64;
        loop {
            if self.handle.completion_observed() {
                self.transition(AcceleratorState::Done);
                return Ok(());
            }

            let raw = self.regs.read(Register::Status);
            polls += 1;
            if raw & status::DONE != 0 {
                debug!("completion after {polls} polls, {:?}", started.elapsed());
                self.mark_complete();
                return Ok(());
            }

            if raw & status::BUSY == 0 {
                return self.settle(raw);
            }

            if let Some(limit) = timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                    warn!("inference timed out after {duration_ms}ms ({polls} polls)");
                    self.transition(AcceleratorState::Error);
                    return Err(AccelError::Timeout { duration_ms });
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Busy cleared without done: error code, late done, or ambiguous.
    fn settle(&mut self, raw: u32) -> Result<()> {
        let code = status::error_code(raw);
        if code != 0 {
            warn!("device reported error code {code:#x}");
            self.transition(AcceleratorState::Error);
            return Err(AccelError::DeviceError { code });
        }

        let again = self.regs.read(Register::Status);
        if again & status::DONE != 0 {
            debug!("done observed on re-check");
            self.mark_complete();
            return Ok(());
        }
        let code = status::error_code(again);
        if code != 0 {
            warn!("device reported error code {code:#x} on re-check");
            self.transition(AcceleratorState::Error);
            return Err(AccelError::DeviceError { code });
        }

        warn!("busy cleared without done or error (status {again:#010x})");
        self.transition(AcceleratorState::Error);
        Err(AccelError::AmbiguousCompletion { status: again })
    }

    /// Non-blocking completion check.
    ///
    /// True if completion was already observed; otherwise, while running,
    /// reads STATUS once and records done if set.
    pub fn is_complete(&mut self) -> bool {
        if self.handle.completion_observed() {
            if self.state == AcceleratorState::Running {
                self.transition(AcceleratorState::Done);
            }
            return true;
        }
        if self.state != AcceleratorState::Running {
            return false;
        }
        if self.regs.read(Register::Status) & status::DONE != 0 {
            self.mark_complete();
            return true;
        }
        false
    }

    fn mark_complete(&mut self) {
        self.handle.completion.store(true, Ordering::Release);
        self.transition(AcceleratorState::Done);
    }

    /// Rank the top `min(5, classes)` classes of the last inference.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::NotComplete`] if completion was not observed.
    pub fn get_result(&self) -> Result<InferenceResult> {
        let k = DEFAULT_TOP_K.min(usize::from(self.handle.config.num_classes));
        self.get_top_k(k)
    }

    /// Rank the top `k` classes of the last inference.
    ///
    /// Invalidates the output buffer, reads one Q8.8 logit per class and
    /// runs softmax and top-K. Repeated calls re-read the same buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AccelError::NotComplete`] if completion was not observed.
    pub fn get_top_k(&self, k: usize) -> Result<InferenceResult> {
        if !self.handle.completion_observed() {
            return Err(AccelError::NotComplete);
        }

        let classes = usize::from(self.handle.config.num_classes);
        let address = u64::from(self.handle.regions().output);
        self.coherency
            .invalidate_before_host_read(address, self.handle.config.output_bytes());
        let logits = memory::read_words(self.memory.as_ref(), address, classes)?;

        let result = ranking::rank(&logits, k);
        if let Some(best) = result.best() {
            debug!(
                "top class {} ({:.1}%)",
                best.class_id,
                best.confidence * 100.0
            );
        }
        Ok(result)
    }

    /// Request a stop. Best effort: the core may finish the current layer.
    pub fn stop(&mut self) {
        self.regs.write(Register::Control, control::STOP);
        self.handle.completion.store(false, Ordering::Release);
        info!("accelerator stopped");
        self.transition(AcceleratorState::Idle);
    }

    /// Pulse reset, clear pending interrupts and the completion flag.
    pub fn reset(&mut self) {
        self.transition(AcceleratorState::Reset);
        self.regs.write(Register::Control, control::RESET);
        std::thread::sleep(RESET_HOLD);
        self.regs.write(Register::Control, 0);
        self.regs.write(Register::IrqStatus, irq::CLEAR_ALL);
        self.handle.completion.store(false, Ordering::Release);
        debug!("accelerator reset");
        self.transition(AcceleratorState::Idle);
    }

    /// Fresh read of STATUS and the performance counters.
    pub fn get_status(&self) -> DeviceStatus {
        let raw = self.regs.read(Register::Status);
        let cycles = self.regs.read(Register::PerfCycles);
        let operations = self.regs.read(Register::PerfOps);
        DeviceStatus::from_raw(raw, cycles, operations)
    }

    /// Enable or disable the done and error interrupts.
    pub fn enable_interrupts(&mut self, enable: bool) {
        let mask = if enable { irq::ALL } else { 0 };
        self.regs.write(Register::IrqEnable, mask);
        debug!("interrupts {}", if enable { "enabled" } else { "disabled" });
    }

    /// Acknowledge every pending interrupt. Returns the bits that were set.
    pub fn clear_interrupts(&mut self) -> u32 {
        let pending = self.regs.read(Register::IrqStatus);
        self.regs.write(Register::IrqStatus, pending);
        pending
    }

    /// Handler sharing this controller's register window and completion flag.
    pub fn interrupt_handler(&self) -> InterruptHandler {
        InterruptHandler {
            io: Arc::clone(self.regs.io()),
            completion: Arc::clone(&self.handle.completion),
        }
    }

    /// Current state.
    pub const fn state(&self) -> AcceleratorState {
        self.state
    }

    /// Addresses, configuration and completion flag.
    pub const fn handle(&self) -> &AcceleratorHandle {
        &self.handle
    }

    /// Active network configuration.
    pub const fn config(&self) -> &AcceleratorConfig {
        &self.handle.config
    }

    /// Typed register access.
    pub const fn registers(&self) -> &RegisterInterface {
        &self.regs
    }

    fn ensure_not_running(&self, operation: &str) -> Result<()> {
        if self.state == AcceleratorState::Running {
            return Err(AccelError::invalid_state(format!(
                "cannot {operation} while running"
            )));
        }
        Ok(())
    }

    fn transition(&mut self, next: AcceleratorState) {
        if self.state != next {
            debug!("state {} -> {next}", self.state);
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{SimBehavior, SimulatedAccelerator};

    fn controller() -> (Arc<SimulatedAccelerator>, AcceleratorController) {
        let sim = Arc::new(SimulatedAccelerator::new());
        let ctrl =
            AcceleratorController::open(Hardware::simulated(&sim), PlatformConfig::default())
                .unwrap();
        (sim, ctrl)
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        assert_eq!(poll_timeout(0), None);
        assert_eq!(poll_timeout(50), Some(Duration::from_millis(50)));
    }

    #[test]
    fn init_lands_in_idle_with_defaults() {
        let (_sim, ctrl) = controller();
        assert_eq!(ctrl.state(), AcceleratorState::Idle);
        assert_eq!(*ctrl.config(), AcceleratorConfig::default());
        assert!(!ctrl.handle().completion_observed());
        assert_eq!(ctrl.handle().register_base(), 0x8000_0000);
        assert_eq!(ctrl.handle().dma_weights_base(), 0x8002_0000);
    }

    #[test]
    fn start_requires_configuration() {
        let (_sim, mut ctrl) = controller();
        assert!(!ctrl.handle().is_configured());
        assert!(matches!(
            ctrl.start_inference(0x2000_0000),
            Err(AccelError::InvalidState { .. })
        ));
        assert_eq!(ctrl.state(), AcceleratorState::Idle);
    }

    #[test]
    fn configuration_survives_stop_and_reset_but_not_init() {
        let (_sim, mut ctrl) = controller();
        ctrl.configure(AcceleratorConfig::default()).unwrap();
        ctrl.stop();
        assert!(ctrl.handle().is_configured());
        ctrl.reset();
        assert!(ctrl.handle().is_configured());
        ctrl.init().unwrap();
        assert!(!ctrl.handle().is_configured());
    }

    #[test]
    fn start_after_error_needs_reset() {
        let sim = Arc::new(SimulatedAccelerator::new().with_behavior(SimBehavior::Vanish));
        let mut ctrl =
            AcceleratorController::open(Hardware::simulated(&sim), PlatformConfig::default())
                .unwrap();
        ctrl.configure(AcceleratorConfig::default()).unwrap();
        ctrl.start_inference(0x2000_0000).unwrap();
        assert!(ctrl.wait_for_completion(None).is_err());
        assert_eq!(ctrl.state(), AcceleratorState::Error);
        assert!(matches!(
            ctrl.start_inference(0x2000_0000),
            Err(AccelError::InvalidState { .. })
        ));
        ctrl.reset();
        assert!(ctrl.start_inference(0x2000_0000).is_ok());
    }

    #[test]
    fn failed_configure_keeps_state() {
        let (_sim, mut ctrl) = controller();
        ctrl.configure(AcceleratorConfig::default()).unwrap();
        let bad = AcceleratorConfig::default().with_classes(0);
        assert!(ctrl.configure(bad).is_err());
        assert_eq!(ctrl.state(), AcceleratorState::Configured);
        assert_eq!(ctrl.config().num_classes, 10);
    }

    #[test]
    fn reconfigure_not_allowed_while_running() {
        let (_sim, mut ctrl) = controller();
        ctrl.configure(AcceleratorConfig::default()).unwrap();
        ctrl.start_inference(0x2000_0000).unwrap();
        assert!(ctrl.configure(AcceleratorConfig::default()).is_err());
        assert!(ctrl.load_weights(&[1]).is_err());
        ctrl.stop();
        assert_eq!(ctrl.state(), AcceleratorState::Idle);
        assert!(ctrl.configure(AcceleratorConfig::default()).is_ok());
    }

    #[test]
    fn wrong_frame_length_is_rejected() {
        let (_sim, mut ctrl) = controller();
        ctrl.configure(AcceleratorConfig::default().with_input(4, 4, 3))
            .unwrap();
        assert!(matches!(
            ctrl.write_frame(&[0; 47]),
            Err(AccelError::InvalidBuffer { .. })
        ));
        assert!(ctrl.write_frame(&[0; 48]).is_ok());
    }

    #[test]
    fn state_names() {
        assert_eq!(AcceleratorState::Running.to_string(), "running");
        assert_eq!(AcceleratorState::Error.to_string(), "error");
    }
}
