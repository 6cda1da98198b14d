//! Collector worker thread.
//!
//! Capture and extraction run on separate threads. Frames arrive over a
//! channel; the worker owns the only hot path into the collector and
//! reports finished or rejected blocks over a second channel.

use super::Collector;
use crate::analysis::ThresholdViolation;
use crate::capture::Frame;
use crate::extraction::{EntropyBlock, ExtractionError};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Collector behind one coarse lock, shared with status readers.
pub type SharedCollector = Arc<Mutex<Collector>>;

/// Locks the collector, recovering the guard if a holder panicked.
///
/// Collector state stays consistent between frames, so a poisoned lock
/// is still safe to read.
pub fn lock_collector(collector: &SharedCollector) -> MutexGuard<'_, Collector> {
    collector
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Outcome of draining one block.
#[derive(Debug, Clone)]
pub enum CollectorEvent {
    /// A block passed validation.
    Block(EntropyBlock),
    /// A block failed validation and was discarded.
    Rejected {
        violation: Option<ThresholdViolation>,
        chi_square: f64,
    },
}

/// Starts the worker thread.
///
/// The worker runs until the frame channel closes or the event receiver
/// hangs up, and returns the number of blocks it delivered. Sequence
/// numbers start at 1 and count delivered blocks only.
pub fn spawn_worker(
    collector: SharedCollector,
    frames: Receiver<Frame>,
    events: Sender<CollectorEvent>,
) -> std::io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("entropy-collector".into())
        .spawn(move || {
            let mut sequence = 0u64;

            for frame in frames {
                let mut guard = lock_collector(&collector);

                match guard.collect(frame) {
                    Ok(()) => {}
                    Err(e @ ExtractionError::IncompatibleFrames { .. }) => {
                        tracing::warn!(error = %e, "Frame pair skipped");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Frame processing failed");
                        continue;
                    }
                }

                while guard.block_ready() {
                    let data = guard.get_entropy();
                    let chi_square = guard.status().last_chi_square;

                    let event = if data.is_empty() {
                        CollectorEvent::Rejected {
                            violation: guard.extractor().last_violation().cloned(),
                            chi_square,
                        }
                    } else {
                        sequence += 1;
                        CollectorEvent::Block(EntropyBlock::from_bytes(data, sequence, chi_square))
                    };

                    if events.send(event).is_err() {
                        tracing::info!(
                            delivered = sequence,
                            "Event receiver closed, worker stopping"
                        );
                        return sequence;
                    }
                }
            }

            tracing::info!(delivered = sequence, "Frame channel closed, worker stopping");
            sequence
        })
}
