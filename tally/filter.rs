//! # Filter workers
//!
//! N of these run side by side. Each pulls raw lines from the shared line queue,
//! normalizes and tokenizes them, and forwards only the tokens that are members of the
//! dictionary. Nothing here is locked: the dictionary is read-only for the lifetime of
//! the pipeline and the two queues are the only shared mutable state.

use crate::normalize;
use crate::pipeline::CancelToken;
use crate::types::{Dictionary, FilterStats};
use crossbeam_channel::{Receiver, Sender};
use std::thread;

/// Trips the shared cancel token if the owning worker unwinds, so the producer stops
/// reading and the remaining stages wind down instead of blocking on a dead peer.
struct CancelOnPanic<'a> {
    cancel: &'a CancelToken,
}

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.cancel.cancel();
        }
    }
}

/// Runs one filter worker to completion.
///
/// The loop ends when the line queue is closed and drained, or early when the pipeline
/// is cancelled. Matching tokens are sent as `&str` borrowed from `dictionary`, so a
/// match costs a hash lookup and a channel send but no allocation.
///
/// Dropping `token_tx` on return is this worker's contribution to closing the token
/// queue; the queue only closes once every worker has returned.
pub fn filter_worker<'d>(
    dictionary: &'d Dictionary,
    line_rx: Receiver<String>,
    token_tx: Sender<&'d str>,
    cancel: &CancelToken,
) -> FilterStats {
    let guard = CancelOnPanic { cancel };
    let mut stats = FilterStats::default();
    let mut normalized = String::new();

    for line in line_rx.iter() {
        if guard.cancel.is_cancelled() {
            break;
        }
        stats.lines += 1;

        normalize::normalize_into(&line, &mut normalized);
        for token in normalize::tokenize(&normalized) {
            stats.tokens_scanned += 1;
            let Some(word) = dictionary.get(token) else {
                continue;
            };
            if token_tx.send(word).is_err() {
                // The aggregator is gone; nothing sent from here on could be counted.
                guard.cancel.cancel();
                return stats;
            }
            stats.tokens_matched += 1;
        }
    }

    stats
}
