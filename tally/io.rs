// ========================================================================================
//
//                                  The line producer
//
// ========================================================================================
//
// ### Purpose ###
//
// Reads the document sequentially and hands each raw line to the filter workers
// through the bounded line queue. The queue's capacity is the only buffering between
// the disk and the workers, so memory stays flat no matter how large the document is:
// when the workers fall behind, `send` blocks and the producer stops reading.
//
// The producer owns the only `Sender` for the line queue. Returning from
// `producer_thread` drops it, which is the one and only close of that queue.

use crate::pipeline::{CancelToken, PipelineError};
use crate::shared::files::TextSource;
use crate::types::ProducerStats;
use crossbeam_channel::Sender;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// The number of lines to read locally before updating the global byte counter.
/// A power of 2 is often efficient.
const PROGRESS_UPDATE_BATCH_SIZE: u64 = 1024;

/// The entry point for the producer thread.
///
/// # Arguments
/// * `source`: The document, positioned at its first line.
/// * `line_tx`: The write end of the line queue. Consumed, so the queue closes when
///   this function returns.
/// * `cancel`: Checked before every read; set by this function on a fatal error so the
///   workers stop promptly instead of draining a document that will be discarded.
/// * `bytes_read_count`: Shared counter polled by the progress bar.
pub fn producer_thread(
    mut source: Box<dyn TextSource>,
    line_tx: Sender<String>,
    cancel: &CancelToken,
    bytes_read_count: &AtomicU64,
) -> Result<ProducerStats, PipelineError> {
    let mut stats = ProducerStats::default();
    let mut local_bytes_read: u64 = 0;
    let mut lines_since_update: u64 = 0;

    while !cancel.is_cancelled() {
        let line = match source.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                cancel.cancel();
                bytes_read_count.fetch_add(local_bytes_read, Ordering::Relaxed);
                return Err(e);
            }
        };

        let line_len = line.len() as u64;
        if line_tx.send(line).is_err() {
            // Every worker has gone away. This only happens after a cancellation,
            // which the orchestrator reports on its own.
            debug!("Line queue disconnected before end of {}.", source.name());
            break;
        }

        stats.lines_read += 1;
        stats.bytes_read += line_len;
        local_bytes_read += line_len;
        lines_since_update += 1;
        if lines_since_update == PROGRESS_UPDATE_BATCH_SIZE {
            bytes_read_count.fetch_add(local_bytes_read, Ordering::Relaxed);
            local_bytes_read = 0;
            lines_since_update = 0;
        }
    }

    if local_bytes_read > 0 {
        bytes_read_count.fetch_add(local_bytes_read, Ordering::Relaxed);
    }

    debug!(
        "Producer finished {}: {} lines, {} bytes.",
        source.name(),
        stats.lines_read,
        stats.bytes_read
    );
    Ok(stats)
}
