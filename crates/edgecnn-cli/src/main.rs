//! `edgecnn`: command-line interface for the edge CNN accelerator.
//!
//! ```text
//! USAGE:
//!   edgecnn status                 Print status and performance counters
//!   edgecnn run                    Configure, load, run one frame, print top classes
//!   edgecnn bench                  Repeated inference with cycle-based FPS estimate
//!   edgecnn stream                 Continuous inference cycling test patterns
//!   edgecnn irq                    One inference completed by the interrupt handler
//!
//!   --simulate                     Use the in-process simulator instead of /dev/mem
//! ```
//!
//! Platform addresses default to the ZUBoard layout and can be overridden
//! with `EDGECNN_*` environment variables.

mod demo;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use demo::{Pattern, Xoshiro};
use edgecnn_driver::{
    parse_number, poll_timeout, AccelError, AcceleratorConfig, AcceleratorController, Activation,
    DeviceStatus, Hardware, InferenceResult, PlatformConfig, PoolType, SimulatedAccelerator,
};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edgecnn", about = "Edge CNN accelerator CLI", version)]
struct Cli {
    /// Run against the in-process simulator.
    #[arg(long, global = true)]
    simulate: bool,

    /// Memory device exposing the accelerator and its DDR buffers.
    #[arg(long, global = true, default_value = "/dev/mem")]
    mem_device: PathBuf,

    /// Accelerator register base (overrides EDGECNN_REG_BASE).
    #[arg(long, global = true, value_parser = parse_address)]
    reg_base: Option<u32>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print status and performance counters.
    Status,
    /// Run one inference and print the top classes.
    Run {
        #[command(flatten)]
        net: NetArgs,
        /// Test pattern to classify.
        #[arg(long, value_enum, default_value_t = Pattern::Gradient)]
        pattern: Pattern,
        /// Classes to print.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Run repeated inferences and report throughput.
    Bench {
        #[command(flatten)]
        net: NetArgs,
        /// Number of inferences.
        #[arg(long, default_value_t = 100)]
        iterations: u32,
        /// Accelerator clock for the frame time estimate.
        #[arg(long, default_value_t = 100.0)]
        clock_mhz: f64,
    },
    /// Classify test patterns continuously.
    Stream {
        #[command(flatten)]
        net: NetArgs,
        /// Frames to process, 0 for no limit.
        #[arg(long, default_value_t = 0)]
        frames: u64,
        /// Delay between frames.
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
    /// Run one inference completed by the interrupt handler.
    Irq {
        #[command(flatten)]
        net: NetArgs,
        /// UIO node delivering the accelerator interrupt (hardware only).
        #[arg(long, default_value = "/dev/uio0")]
        uio: PathBuf,
    },
}

#[derive(Args, Clone)]
struct NetArgs {
    /// Input width in pixels.
    #[arg(long, default_value_t = 128)]
    width: u16,
    /// Input height in pixels.
    #[arg(long, default_value_t = 128)]
    height: u16,
    /// Input channels.
    #[arg(long, default_value_t = 3)]
    channels: u8,
    /// Output classes.
    #[arg(long, default_value_t = 10)]
    classes: u8,
    /// Layer enable mask.
    #[arg(long, default_value = "0xFF", value_parser = parse_mask)]
    layers: u8,
    /// Activation function.
    #[arg(long, value_enum, default_value_t = ActivationArg::Relu)]
    activation: ActivationArg,
    /// Pooling type.
    #[arg(long, value_enum, default_value_t = PoolArg::Max)]
    pool: PoolArg,
    /// Completion timeout per inference, 0 waits forever.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    /// Seed for synthetic weights and noise frames.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActivationArg {
    #[value(name = "none")]
    Linear,
    Relu,
    Relu6,
    LeakyRelu,
    Sigmoid,
    Tanh,
    Swish,
}

impl From<ActivationArg> for Activation {
    fn from(a: ActivationArg) -> Self {
        match a {
            ActivationArg::Linear => Self::None,
            ActivationArg::Relu => Self::Relu,
            ActivationArg::Relu6 => Self::Relu6,
            ActivationArg::LeakyRelu => Self::LeakyRelu,
            ActivationArg::Sigmoid => Self::Sigmoid,
            ActivationArg::Tanh => Self::Tanh,
            ActivationArg::Swish => Self::Swish,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolArg {
    Max,
    Avg,
}

impl From<PoolArg> for PoolType {
    fn from(p: PoolArg) -> Self {
        match p {
            PoolArg::Max => Self::Max,
            PoolArg::Avg => Self::Avg,
        }
    }
}

impl NetArgs {
    fn config(&self) -> AcceleratorConfig {
        AcceleratorConfig::default()
            .with_input(self.width, self.height, self.channels)
            .with_classes(self.classes)
            .with_layers(self.layers)
            .with_activation(self.activation.into())
            .with_pooling(self.pool.into())
    }

    fn timeout(&self) -> Option<Duration> {
        poll_timeout(self.timeout_ms)
    }
}

fn parse_address(raw: &str) -> Result<u32, String> {
    parse_number(raw)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("not a 32-bit address: {raw}"))
}

fn parse_mask(raw: &str) -> Result<u8, String> {
    parse_number(raw)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| format!("not an 8-bit mask: {raw}"))
}

/// Opened accelerator plus the simulator behind it, if any.
struct Session {
    accel: AcceleratorController,
    sim: Option<Arc<SimulatedAccelerator>>,
    rng: Xoshiro,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .init();

    match &cli.command {
        Cmd::Status => cmd_status(&cli)?,
        Cmd::Run { net, pattern, top_k } => cmd_run(&cli, net, *pattern, *top_k)?,
        Cmd::Bench {
            net,
            iterations,
            clock_mhz,
        } => cmd_bench(&cli, net, *iterations, *clock_mhz)?,
        Cmd::Stream {
            net,
            frames,
            interval_ms,
        } => cmd_stream(&cli, net, *frames, *interval_ms)?,
        Cmd::Irq { net, uio } => cmd_irq(&cli, net, uio)?,
    }

    Ok(())
}

fn open(cli: &Cli, seed: u64) -> Result<Session> {
    let mut platform = PlatformConfig::from_env().context("reading EDGECNN_* overrides")?;
    if let Some(base) = cli.reg_base {
        platform.register_base = base;
    }

    let (hardware, sim) = if cli.simulate {
        let sim = Arc::new(SimulatedAccelerator::new());
        (Hardware::simulated(&sim), Some(sim))
    } else {
        let hw = Hardware::map_physical(&cli.mem_device, &platform).with_context(|| {
            format!(
                "mapping accelerator from {} (root, or try --simulate)",
                cli.mem_device.display()
            )
        })?;
        (hw, None)
    };

    println!("Initializing accelerator at {:#010x}...", platform.register_base);
    let accel = AcceleratorController::open(hardware, platform)?;
    Ok(Session {
        accel,
        sim,
        rng: Xoshiro::new(seed),
    })
}

/// Configure, then load synthetic weights and biases.
fn prepare(session: &mut Session, net: &NetArgs) -> Result<AcceleratorConfig> {
    let cfg = net.config();
    session.accel.configure(cfg)?;
    println!(
        "Configured {}x{}x{}, {} classes, {:?}, {:?} pooling",
        cfg.input_width,
        cfg.input_height,
        cfg.input_channels,
        cfg.num_classes,
        cfg.activation,
        cfg.pool_type
    );

    let weights = demo::synthetic_weights(&mut session.rng, demo::DEMO_WEIGHTS);
    let biases = demo::synthetic_biases(&mut session.rng, demo::DEMO_BIASES);
    session.accel.load_weights(&weights)?;
    session.accel.load_biases(&biases)?;
    println!(
        "Loaded {} weights and {} biases",
        weights.len(),
        biases.len()
    );
    Ok(cfg)
}

fn frame(session: &mut Session, cfg: &AcceleratorConfig, pattern: Pattern) -> Vec<i16> {
    demo::generate_frame(
        pattern,
        usize::from(cfg.input_width),
        usize::from(cfg.input_height),
        usize::from(cfg.input_channels),
        &mut session.rng,
    )
}

fn print_status(status: &DeviceStatus) {
    println!("Accelerator status:");
    println!("  Busy       : {}", if status.busy { "yes" } else { "no" });
    println!("  Done       : {}", if status.done { "yes" } else { "no" });
    println!("  Error code : {:#x}", status.error_code);
    println!("  Cycles     : {}", status.cycles);
    println!("  Operations : {}", status.operations);
    if let Some(ratio) = status.ops_per_cycle() {
        println!("  Ops/cycle  : {ratio:.2}");
    }
}

fn print_result(result: &InferenceResult) {
    println!();
    println!("=== Classification ===");
    for (rank, c) in result.classifications.iter().enumerate() {
        println!(
            "  {}. {:<12} {:6.2}%",
            rank + 1,
            demo::label(c.class_id),
            c.confidence * 100.0
        );
    }
}

fn cmd_status(cli: &Cli) -> Result<()> {
    let session = open(cli, 0)?;
    print_status(&session.accel.get_status());
    Ok(())
}

fn cmd_run(cli: &Cli, net: &NetArgs, pattern: Pattern, top_k: usize) -> Result<()> {
    let mut session = open(cli, net.seed)?;
    let cfg = prepare(&mut session, net)?;

    let input = frame(&mut session, &cfg, pattern);
    println!("Running inference on {pattern} frame...");
    let started = Instant::now();
    session.accel.submit_frame(&input)?;
    session.accel.wait_for_completion(net.timeout())?;
    let elapsed = started.elapsed();

    let result = session.accel.get_top_k(top_k)?;
    print_result(&result);
    println!();
    println!("Host wall time: {:.3} ms", elapsed.as_secs_f64() * 1e3);
    print_status(&session.accel.get_status());
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn cmd_bench(cli: &Cli, net: &NetArgs, iterations: u32, clock_mhz: f64) -> Result<()> {
    if iterations == 0 {
        bail!("--iterations must be at least 1");
    }
    let mut session = open(cli, net.seed)?;
    let cfg = prepare(&mut session, net)?;
    let input = frame(&mut session, &cfg, Pattern::Gradient);

    println!("Running {iterations} iterations...");
    let mut cycles = 0u64;
    let mut ops = 0u64;
    let mut completed = 0u32;
    let mut wall = Duration::ZERO;

    for i in 0..iterations {
        let before = session.accel.get_status();
        let started = Instant::now();
        session.accel.submit_frame(&input)?;
        match session.accel.wait_for_completion(net.timeout()) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                tracing::warn!("inference {i} failed: {e}; resetting");
                session.accel.reset();
                session.accel.configure(cfg)?;
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        wall += started.elapsed();
        let after = session.accel.get_status();
        cycles += u64::from(after.cycles.wrapping_sub(before.cycles));
        ops += u64::from(after.operations.wrapping_sub(before.operations));
        completed += 1;

        if (i + 1) % 10 == 0 {
            println!("  completed {} iterations", i + 1);
        }
    }

    println!();
    println!("Benchmark summary:");
    println!("  Iterations      : {completed}/{iterations}");
    println!("  Total cycles    : {cycles}");
    println!("  Total operations: {ops}");
    if completed > 0 {
        let n = f64::from(completed);
        let avg_cycles = cycles as f64 / n;
        let frame_ms = avg_cycles / (clock_mhz * 1e3);
        println!("  Avg cycles/frame: {avg_cycles:.0}");
        println!("  Avg ops/frame   : {:.0}", ops as f64 / n);
        println!("  Est. frame time : {frame_ms:.3} ms @ {clock_mhz} MHz");
        if frame_ms > 0.0 {
            println!("  Est. FPS        : {:.1}", 1e3 / frame_ms);
        }
        println!(
            "  Host wall time  : {:.3} ms/frame",
            wall.as_secs_f64() * 1e3 / n
        );
    }
    Ok(())
}

fn cmd_stream(cli: &Cli, net: &NetArgs, frames: u64, interval_ms: u64) -> Result<()> {
    let mut session = open(cli, net.seed)?;
    let cfg = prepare(&mut session, net)?;
    println!("Streaming{}...", if frames == 0 { " (Ctrl+C to stop)" } else { "" });

    let mut n = 0u64;
    while frames == 0 || n < frames {
        let pattern = Pattern::ALL[(n % 4) as usize];
        let input = frame(&mut session, &cfg, pattern);
        session.accel.submit_frame(&input)?;
        match session.accel.wait_for_completion(net.timeout()) {
            Ok(()) => {
                let result = session.accel.get_result()?;
                if let Some(best) = result.best() {
                    println!(
                        "Frame {n} ({pattern}): {} ({:.1}%)",
                        demo::label(best.class_id),
                        best.confidence * 100.0
                    );
                }
            }
            Err(e @ (AccelError::Timeout { .. } | AccelError::AmbiguousCompletion { .. })) => {
                tracing::warn!("frame {n}: {e}; resetting");
                session.accel.reset();
                session.accel.configure(cfg)?;
            }
            Err(e) => return Err(e.into()),
        }
        n += 1;
        std::thread::sleep(Duration::from_millis(interval_ms));
    }
    Ok(())
}

fn cmd_irq(cli: &Cli, net: &NetArgs, uio: &Path) -> Result<()> {
    let mut session = open(cli, net.seed)?;
    let cfg = prepare(&mut session, net)?;
    let handler = session.accel.interrupt_handler();
    session.accel.enable_interrupts(true);

    // Interrupt thread: wait for the line, then run the handler.
    let stop = Arc::new(AtomicBool::new(false));
    let isr = match session.sim.clone() {
        Some(sim) => {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    if sim.irq_line() && handler.handle() {
                        return;
                    }
                    sim.tick();
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
        }
        None => {
            let mut dev = File::options()
                .read(true)
                .write(true)
                .open(uio)
                .with_context(|| format!("opening {}", uio.display()))?;
            // Unmask before the first wait.
            dev.write_all(&1u32.to_ne_bytes())?;
            std::thread::spawn(move || {
                let mut count = [0u8; 4];
                while dev.read_exact(&mut count).is_ok() {
                    let done = handler.handle();
                    if dev.write_all(&1u32.to_ne_bytes()).is_err() || done {
                        return;
                    }
                }
            })
        }
    };

    let input = frame(&mut session, &cfg, Pattern::Gradient);
    session.accel.submit_frame(&input)?;
    println!("Inference started, waiting for interrupt...");

    let started = Instant::now();
    let limit = net.timeout();
    while !session.accel.handle().completion_observed() {
        if limit.is_some_and(|l| started.elapsed() >= l) {
            stop.store(true, Ordering::Release);
            session.accel.reset();
            bail!("no completion interrupt within {} ms", net.timeout_ms);
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    stop.store(true, Ordering::Release);
    if isr.join().is_err() {
        bail!("interrupt thread panicked");
    }
    session.accel.is_complete();

    println!(
        "Completion observed after {:.3} ms",
        started.elapsed().as_secs_f64() * 1e3
    );
    print_result(&session.accel.get_result()?);
    session.accel.enable_interrupts(false);
    Ok(())
}
