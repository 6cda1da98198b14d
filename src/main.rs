//! True Entropy CLI
//!
//! Runs the extraction pipeline against the mock camera and writes
//! validated blocks to disk.

use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use true_entropy::{
    capture::{Camera, MockCamera},
    collector::{lock_collector, spawn_worker, Collector, CollectorEvent},
    config::{AlgorithmKind, FileConfig},
    extraction::Extractor,
    sink::{EntropySink, FileSink},
};

#[derive(Parser)]
#[command(name = "true-entropy", version)]
#[command(about = "Extract random bytes from camera sensor noise")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many frames (0 = no limit)
    #[arg(long)]
    frames: Option<u64>,

    /// Blocks to deliver before stopping
    #[arg(short, long)]
    blocks: Option<u32>,

    /// Bytes per block
    #[arg(long)]
    block_size: Option<usize>,

    /// Extraction algorithm: von-neumann or gf8-abc
    #[arg(short, long)]
    algorithm: Option<AlgorithmKind>,

    /// Von Neumann bits per value (1-8)
    #[arg(long)]
    bits: Option<u8>,

    /// Chi-square limit for delivered blocks (0 disables the gate)
    #[arg(long)]
    chi_limit: Option<f64>,

    /// Directory receiving block files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write a CSV histogram companion next to each block
    #[arg(long)]
    csv: bool,

    /// Run until interrupted
    #[arg(long)]
    continuous: bool,

    /// Metrics server port (0 disables; needs the `metrics` feature)
    #[arg(long)]
    metrics_port: Option<u16>,
}

impl Args {
    /// Applies command-line overrides on top of the file configuration.
    fn apply(&self, mut config: FileConfig) -> FileConfig {
        if let Some(frames) = self.frames {
            config.output.frame_limit = frames;
        }
        if let Some(blocks) = self.blocks {
            config.output.block_count = blocks;
        }
        if let Some(size) = self.block_size {
            config.collector.block_size_bytes = size;
        }
        if let Some(algorithm) = self.algorithm {
            config.extractor.algorithm = algorithm;
        }
        if let Some(bits) = self.bits {
            config.extractor.bits_per_value = bits;
        }
        if let Some(limit) = self.chi_limit {
            config.extractor.chi_square_limit = limit;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(port) = self.metrics_port {
            config.output.metrics_port = port;
        }
        config.output.write_csv |= self.csv;
        config.output.continuous |= self.continuous;
        config.clamped()
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("True Entropy v{}", true_entropy::VERSION);

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let config = args.apply(file_config);

    let mut camera = MockCamera::new();
    camera.open(&config.capture)?;

    let mut sink = FileSink::new(&config.output.directory, config.output.write_csv)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let extractor = Extractor::new(config.extractor.clone());
    let collector = Arc::new(Mutex::new(Collector::new(config.collector.clone(), extractor)));

    #[cfg(feature = "metrics")]
    let metrics = start_metrics_server(config.output.metrics_port);
    #[cfg(not(feature = "metrics"))]
    {
        if config.output.metrics_port != 0 {
            debug!("Built without the metrics feature, no metrics server");
        }
    }

    let (frame_tx, frame_rx) = mpsc::sync_channel(4);
    let (event_tx, event_rx) = mpsc::channel();
    let worker = spawn_worker(Arc::clone(&collector), frame_rx, event_tx)?;

    let capture = {
        let running = Arc::clone(&running);
        let frame_limit = config.output.frame_limit;
        let interval = Duration::from_secs_f64(1.0 / f64::from(config.capture.fps));

        thread::Builder::new().name("capture".into()).spawn(move || {
            let (mut captured, mut dropped) = (0u64, 0u64);
            let mut next = Instant::now();

            while running.load(Ordering::SeqCst) && (frame_limit == 0 || captured < frame_limit) {
                let frame = match camera.capture() {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Frame capture failed: {}", e);
                        break;
                    }
                };
                captured += 1;

                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        debug!(captured, dropped, "Collector busy, frame dropped");
                    }
                    Err(TrySendError::Disconnected(_)) => break,
                }

                next += interval;
                if let Some(wait) = next.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }

            camera.close();
            (captured, dropped)
        })?
    };

    info!(
        algorithm = ?config.extractor.algorithm,
        block_size = config.collector.block_size_bytes,
        blocks = config.output.block_count,
        continuous = config.output.continuous,
        "Collecting entropy"
    );

    let mut delivered = 0u32;
    let mut rejected = 0u32;
    loop {
        match event_rx.recv_timeout(Duration::from_millis(500)) {
            Ok(CollectorEvent::Block(block)) => {
                sink.deliver(&block)?;
                delivered += 1;
                if !config.output.continuous && delivered >= config.output.block_count {
                    break;
                }
            }
            Ok(CollectorEvent::Rejected {
                violation,
                chi_square,
            }) => {
                rejected += 1;
                match violation {
                    Some(v) => warn!("Block discarded: {}", v),
                    None => warn!(chi_square, "Block discarded"),
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    info!("Interrupted");
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }

        #[cfg(feature = "metrics")]
        {
            if let Some(state) = &metrics {
                let status = lock_collector(&collector).status();
                state.blocking_write().update(&status);
            }
        }
    }

    // Stop capture; the worker exits once the frame channel closes
    running.store(false, Ordering::SeqCst);
    drop(event_rx);
    let (captured, dropped) = capture.join().map_err(|_| "capture thread panicked")?;
    worker.join().map_err(|_| "collector thread panicked")?;

    let status = lock_collector(&collector).status();
    info!(
        captured,
        dropped,
        rejected_samples = status.rejected_samples,
        "Capture finished"
    );
    println!(
        "Delivered {} blocks ({} bytes), {} rejected, last chi-square {:.2}",
        delivered, status.bytes_generated, rejected, status.last_chi_square
    );
    println!("Output directory: {}", sink.directory().display());

    Ok(())
}

#[cfg(feature = "metrics")]
fn start_metrics_server(
    port: u16,
) -> Option<Arc<tokio::sync::RwLock<true_entropy::metrics::MetricsState>>> {
    use true_entropy::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    let spawned = thread::Builder::new().name("metrics".into()).spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Metrics runtime failed to start: {}", e);
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!("Metrics server stopped: {}", e);
        }
    });

    match spawned {
        Ok(_) => Some(state),
        Err(e) => {
            warn!("Metrics thread failed to start: {}", e);
            None
        }
    }
}
