//! True Entropy Library
//!
//! Extracts random bytes from the sensor noise of a camera pointed at a
//! static scene. Consecutive frames are differenced to cancel the scene,
//! the remaining noise is decorrelated in space and time, and a bias-removal
//! extractor turns it into packed bytes that pass an online chi-square gate.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → extraction (diff, Sample) → collector (window, batches)
//!     → extraction (Von Neumann / GF(8)-ABC, bit buffer) → analysis (chi-square) → sink
//! ```
//!
//! # Design Principles
//!
//! - **Fail-closed**: blocks failing the chi-square gate are discarded, never delivered
//! - **Motion-aware**: samples with a non-zero mean are treated as camera motion and dropped
//! - **Artifact removal**: long zero runs (saturated or dead regions) are excised
//! - **No cryptographic claims**: statistical tests are sanity checks, not proofs
//!
//! # Example
//!
//! ```no_run
//! use true_entropy::{
//!     capture::{Camera, CaptureConfig, MockCamera},
//!     collector::Collector,
//!     config::{CollectorConfig, ExtractorConfig},
//!     extraction::Extractor,
//! };
//!
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//!
//! let extractor = Extractor::new(ExtractorConfig::default());
//! let mut collector = Collector::new(CollectorConfig::default(), extractor);
//!
//! while !collector.block_ready() {
//!     let frame = camera.capture().unwrap();
//!     if let Err(e) = collector.collect(frame) {
//!         eprintln!("skipped frame: {}", e);
//!     }
//! }
//!
//! let block = collector.get_entropy();
//! println!("{} bytes", block.len());
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod collector;
pub mod config;
pub mod extraction;
pub mod gf8;
pub mod metrics;
pub mod sink;

// Re-export commonly used types at crate root
pub use analysis::{QualityThresholds, ThresholdViolation};
pub use capture::{Camera, CaptureConfig, Frame, MockCamera};
pub use collector::{Collector, CollectorEvent, CollectorStatus, SharedCollector};
pub use config::{AlgorithmKind, CollectorConfig, ExtractorConfig, FileConfig};
pub use extraction::{EntropyBlock, ExtractAlgorithm, ExtractionError, Extractor, Sample};
pub use sink::{EntropySink, FileSink, MemorySink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
