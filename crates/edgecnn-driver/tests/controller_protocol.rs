//! Controller protocol tests against the simulated accelerator
//!
//! Every test drives the public controller API and checks both the returned
//! values and the register / cache traffic the simulator recorded.

use edgecnn_chip::regs::{control, irq};
use edgecnn_driver::backends::software::{SIM_FILTERS, SIM_WEIGHT_COUNT};
use edgecnn_driver::fixed::to_fixed;
use edgecnn_driver::{
    poll_timeout, AccelError, AcceleratorConfig, AcceleratorController, AcceleratorState,
    Hardware, PlatformConfig, Register, SimBehavior, SimEvent, SimulatedAccelerator,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn open(sim: SimulatedAccelerator) -> (Arc<SimulatedAccelerator>, AcceleratorController) {
    let sim = Arc::new(sim);
    let ctrl = AcceleratorController::open(Hardware::simulated(&sim), PlatformConfig::default())
        .expect("simulated accelerator responds");
    (sim, ctrl)
}

fn start_writes(sim: &SimulatedAccelerator) -> usize {
    sim.events()
        .iter()
        .filter(|e| {
            matches!(e, SimEvent::RegisterWrite { register: Register::Control, value }
                if value & control::START != 0)
        })
        .count()
}

fn weights() -> Vec<i16> {
    (0..SIM_WEIGHT_COUNT)
        .map(|i| to_fixed(((i * 37 % 101) as f32 - 50.0) / 100.0))
        .collect()
}

fn biases() -> Vec<i16> {
    (0..SIM_FILTERS)
        .map(|i| to_fixed(i as f32 / 64.0 - 0.125))
        .collect()
}

fn gradient(cfg: &AcceleratorConfig) -> Vec<i16> {
    let n = cfg.frame_elements();
    (0..n).map(|i| to_fixed(i as f32 / n as f32)).collect()
}

#[test]
fn configure_validates_dimensions() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new());
    sim.clear_events();

    let zero_width = AcceleratorConfig::default().with_input(0, 128, 3);
    assert!(matches!(
        ctrl.configure(zero_width),
        Err(AccelError::InvalidConfig { .. })
    ));
    let tall = AcceleratorConfig::default().with_input(128, 225, 3);
    assert!(matches!(
        ctrl.configure(tall),
        Err(AccelError::InvalidConfig { .. })
    ));
    assert!(sim.events().is_empty(), "rejected configs must not touch registers");
    assert_eq!(ctrl.state(), AcceleratorState::Idle);

    ctrl.configure(AcceleratorConfig::default().with_input(128, 128, 3))
        .expect("128x128 is valid");
    assert_eq!(ctrl.state(), AcceleratorState::Configured);
    assert_eq!(sim.peek(Register::InputDim), (128 << 16) | 128);
    assert_eq!(sim.peek(Register::Config), 0x1FF);
    assert_eq!(sim.peek(Register::OutputAddr), 0x2800_0000);
}

#[test]
fn start_while_busy_is_rejected_without_start_strobe() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new());
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    sim.clear_events();
    sim.set_status(0x1);

    assert!(matches!(
        ctrl.start_inference(0x2000_0000),
        Err(AccelError::Busy)
    ));
    assert_eq!(start_writes(&sim), 0);
    assert_eq!(ctrl.state(), AcceleratorState::Configured);
}

#[test]
fn second_start_while_in_flight_is_busy() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_behavior(SimBehavior::Stall));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    sim.clear_events();

    assert!(matches!(
        ctrl.start_inference(0x2000_4000),
        Err(AccelError::Busy)
    ));
    assert_eq!(start_writes(&sim), 0);
    assert_eq!(ctrl.state(), AcceleratorState::Running);
}

#[test]
fn start_can_be_retried_after_stop() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_behavior(SimBehavior::Stall));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    ctrl.stop();
    assert_eq!(ctrl.state(), AcceleratorState::Idle);

    sim.clear_events();
    ctrl.start_inference(0x2000_0000).expect("retry after stop");
    assert_eq!(start_writes(&sim), 1);
    assert_eq!(ctrl.state(), AcceleratorState::Running);
}

#[test]
fn timeout_recovers_through_reset_and_retry() {
    let (sim, mut ctrl) = open(
        SimulatedAccelerator::new()
            .with_latency(1)
            .with_behavior(SimBehavior::Stall),
    );
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    assert!(matches!(
        ctrl.wait_for_completion(poll_timeout(5)),
        Err(AccelError::Timeout { .. })
    ));
    assert!(matches!(
        ctrl.start_inference(0x2000_0000),
        Err(AccelError::Busy)
    ));

    ctrl.reset();
    sim.set_behavior(SimBehavior::Normal);
    ctrl.start_inference(0x2000_0000).expect("retry after reset");
    ctrl.wait_for_completion(poll_timeout(100)).unwrap();
    assert_eq!(ctrl.state(), AcceleratorState::Done);
}

#[test]
fn stop_discards_observed_completion() {
    let (_sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(1));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    ctrl.wait_for_completion(None).unwrap();
    assert!(ctrl.get_result().is_ok());

    ctrl.stop();
    assert!(!ctrl.handle().completion_observed());
    assert!(matches!(ctrl.get_result(), Err(AccelError::NotComplete)));
}

#[test]
fn polled_timeout_is_never_early() {
    let (_sim, mut ctrl) = open(SimulatedAccelerator::new().with_behavior(SimBehavior::Stall));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();

    let started = Instant::now();
    let err = ctrl
        .wait_for_completion(poll_timeout(50))
        .expect_err("stalled core must time out");
    let elapsed = started.elapsed();

    assert!(matches!(err, AccelError::Timeout { duration_ms } if duration_ms >= 50));
    assert!(elapsed >= Duration::from_millis(50), "returned after {elapsed:?}");
    assert_eq!(ctrl.state(), AcceleratorState::Error);
    assert!(err.is_recoverable());

    ctrl.reset();
    assert_eq!(ctrl.state(), AcceleratorState::Idle);
}

#[test]
fn result_before_completion_is_rejected() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new());
    assert!(matches!(ctrl.get_result(), Err(AccelError::NotComplete)));

    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    sim.clear_events();
    assert!(matches!(ctrl.get_top_k(3), Err(AccelError::NotComplete)));
    assert!(sim.events().is_empty(), "premature result access has side effects");
}

#[test]
fn end_to_end_classification() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(4));
    let cfg = AcceleratorConfig::default()
        .with_input(128, 128, 3)
        .with_classes(10);
    ctrl.configure(cfg).unwrap();
    ctrl.load_weights(&weights()).unwrap();
    ctrl.load_biases(&biases()).unwrap();
    assert_eq!(sim.peek_words(0x1000_0000, SIM_WEIGHT_COUNT), weights());

    ctrl.submit_frame(&gradient(&cfg)).unwrap();
    assert_eq!(ctrl.state(), AcceleratorState::Running);
    ctrl.wait_for_completion(poll_timeout(1000)).unwrap();
    assert_eq!(ctrl.state(), AcceleratorState::Done);

    let result = ctrl.get_result().unwrap();
    assert_eq!(result.len(), 5);
    assert!(result.classifications.iter().all(|c| c.class_id < 10));
    for pair in result.classifications.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    assert_eq!(result.probabilities.len(), 10);
    let total: f32 = result.probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-5, "sum = {total}");

    // Same logits on a second read, no state change.
    let again = ctrl.get_result().unwrap();
    assert_eq!(again.classifications, result.classifications);
    assert_eq!(ctrl.state(), AcceleratorState::Done);

    let status = ctrl.get_status();
    assert!(status.done);
    assert!(!status.busy);
    assert!(status.operations > 0);
}

#[test]
fn input_is_flushed_before_start_and_output_invalidated_before_read() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(1));
    let cfg = AcceleratorConfig::default().with_input(32, 16, 3);
    ctrl.configure(cfg).unwrap();
    sim.clear_events();

    ctrl.start_inference(0x2000_4000).unwrap();
    ctrl.wait_for_completion(None).unwrap();
    ctrl.get_result().unwrap();

    let events = sim.events();
    let pos = |want: &SimEvent| events.iter().position(|e| e == want);
    let addr = pos(&SimEvent::RegisterWrite {
        register: Register::InputAddr,
        value: 0x2000_4000,
    })
    .expect("frame address written");
    let flush = pos(&SimEvent::Flush {
        address: 0x2000_4000,
        len: 32 * 16 * 3 * 2,
    })
    .expect("input flushed");
    let start = pos(&SimEvent::RegisterWrite {
        register: Register::Control,
        value: control::START,
    })
    .expect("start written");
    let invalidate = pos(&SimEvent::Invalidate {
        address: 0x2800_0000,
        len: 20,
    })
    .expect("output invalidated");
    let done = pos(&SimEvent::Completed).expect("core completed");

    assert!(addr < flush && flush < start && start < done && done < invalidate);
}

#[test]
fn parameter_loads_flush_and_relatch_address() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new());
    sim.clear_events();
    ctrl.load_biases(&biases()).unwrap();
    assert_eq!(
        sim.events(),
        vec![
            SimEvent::Flush {
                address: 0x1800_0000,
                len: SIM_FILTERS * 2,
            },
            SimEvent::RegisterWrite {
                register: Register::BiasAddr,
                value: 0x1800_0000,
            },
        ]
    );
    assert!(matches!(
        ctrl.load_weights(&[]),
        Err(AccelError::InvalidBuffer { .. })
    ));
}

#[test]
fn interrupt_handler_records_completion() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(2));
    let handler = ctrl.interrupt_handler();
    ctrl.enable_interrupts(true);
    assert_eq!(sim.peek(Register::IrqEnable), irq::ALL);
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.load_weights(&weights()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();

    let isr = std::thread::spawn({
        let sim = Arc::clone(&sim);
        move || {
            while !sim.irq_line() {
                sim.tick();
            }
            handler.handle()
        }
    });
    assert!(isr.join().unwrap(), "handler saw done");
    assert!(!sim.irq_line(), "pending bits cleared");
    assert!(ctrl.handle().completion_observed());

    assert!(ctrl.is_complete());
    assert_eq!(ctrl.state(), AcceleratorState::Done);
    assert_eq!(ctrl.get_result().unwrap().len(), 5);
}

#[test]
fn is_complete_polls_once() {
    let (_sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(3));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    assert!(!ctrl.is_complete());
    ctrl.start_inference(0x2000_0000).unwrap();
    assert!(!ctrl.is_complete());
    assert!(!ctrl.is_complete());
    assert!(ctrl.is_complete());
    assert_eq!(ctrl.state(), AcceleratorState::Done);
}

#[test]
fn device_error_code_is_surfaced() {
    let (_sim, mut ctrl) = open(
        SimulatedAccelerator::new()
            .with_latency(2)
            .with_behavior(SimBehavior::Fault(0x9)),
    );
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    assert!(matches!(
        ctrl.wait_for_completion(poll_timeout(100)),
        Err(AccelError::DeviceError { code: 0x9 })
    ));
    assert_eq!(ctrl.state(), AcceleratorState::Error);
    assert_eq!(ctrl.get_status().error_code, 0x9);
}

#[test]
fn vanished_completion_is_ambiguous_not_success() {
    let (_sim, mut ctrl) = open(
        SimulatedAccelerator::new()
            .with_latency(1)
            .with_behavior(SimBehavior::Vanish),
    );
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    assert!(matches!(
        ctrl.wait_for_completion(None),
        Err(AccelError::AmbiguousCompletion { status: 0 })
    ));
    assert!(matches!(ctrl.get_result(), Err(AccelError::NotComplete)));
}

#[test]
fn unmapped_device_fails_init() {
    let sim = Arc::new(SimulatedAccelerator::new().with_behavior(SimBehavior::Unmapped));
    let mut ctrl = AcceleratorController::new(Hardware::simulated(&sim), PlatformConfig::default());
    let err = ctrl.init().expect_err("all-ones status");
    assert!(matches!(
        err,
        AccelError::HardwareUnresponsive { status: 0xFFFF_FFFF }
    ));
    assert!(!err.is_recoverable());
    assert_eq!(ctrl.state(), AcceleratorState::Error);
}

#[test]
fn reset_recovers_and_clears_interrupts() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(1));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    ctrl.wait_for_completion(None).unwrap();
    assert_eq!(sim.peek(Register::IrqStatus), irq::DONE);

    ctrl.reset();
    assert_eq!(ctrl.state(), AcceleratorState::Idle);
    assert_eq!(sim.peek(Register::IrqStatus), 0);
    assert!(!ctrl.handle().completion_observed());
    assert!(matches!(ctrl.get_result(), Err(AccelError::NotComplete)));

    // Configuration registers survive reset; start again without reconfiguring.
    ctrl.start_inference(0x2000_0000).unwrap();
    ctrl.wait_for_completion(None).unwrap();
    assert_eq!(ctrl.get_result().unwrap().probabilities.len(), 10);
}

#[test]
fn clear_interrupts_acknowledges_pending_bits() {
    let (sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(1));
    ctrl.configure(AcceleratorConfig::default()).unwrap();
    ctrl.start_inference(0x2000_0000).unwrap();
    ctrl.wait_for_completion(None).unwrap();
    assert_eq!(ctrl.clear_interrupts(), irq::DONE);
    assert_eq!(sim.peek(Register::IrqStatus), 0);
    assert_eq!(ctrl.clear_interrupts(), 0);
}

#[test]
fn back_to_back_inferences_from_done() {
    let (_sim, mut ctrl) = open(SimulatedAccelerator::new().with_latency(1));
    let cfg = AcceleratorConfig::default().with_input(8, 8, 3);
    ctrl.configure(cfg).unwrap();
    ctrl.load_weights(&weights()).unwrap();
    for _ in 0..3 {
        ctrl.submit_frame(&gradient(&cfg)).unwrap();
        ctrl.wait_for_completion(poll_timeout(100)).unwrap();
        assert_eq!(ctrl.get_top_k(10).unwrap().len(), 10);
    }
    assert!(ctrl.get_status().cycles > 0);
}
