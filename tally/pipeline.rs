// ========================================================================================
//
//                              The pipeline orchestrator
//
// ========================================================================================
//
// Wires the stages together and owns their lifecycle:
//
//     document -> line producer -> [line queue] -> N filter workers
//              -> [token queue] -> aggregator -> frequency map
//
// Ordering guarantees, all enforced structurally rather than with extra locks:
//
// - The dictionary is fully built before `run` is called, and is only ever borrowed
//   immutably by the workers.
// - The producer holds the only line sender. Its return is the single close of the
//   line queue.
// - Every worker holds a clone of the token sender and the orchestrator drops its own
//   before waiting. The token queue therefore closes exactly once, after the last
//   worker returns, which is the barrier that keeps the aggregator from finishing
//   early and truncating counts.
// - The aggregator's join handle is the single-value hand-off of the final map.

use crate::aggregate;
use crate::dictionary;
use crate::filter;
use crate::io;
use crate::shared::files::{TextSource, is_stdin_path, open_text_source};
use crate::types::{Dictionary, FilterStats, FrequencyMap, PipelineStats, SearchSummary};
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

// --- Pipeline Tuning Parameters ---

/// The maximum number of raw lines buffered between the producer and the workers.
/// Provides backpressure against a fast producer.
pub const DEFAULT_LINE_QUEUE_CAPACITY: usize = 1000;
/// The maximum number of matched tokens buffered ahead of the aggregator.
pub const DEFAULT_TOKEN_QUEUE_CAPACITY: usize = 1000;
/// How often the progress updater thread redraws.
const PROGRESS_REFRESH_INTERVAL: Duration = Duration::from_millis(200);

// ========================================================================================
//                          Public API, context & error handling
// ========================================================================================

/// Every way a search can fail. There is no partial-result mode: any of these aborts
/// the run and no frequency map is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("I/O error reading {source_name} at line {line}: {source}")]
    Read {
        source_name: String,
        line: u64,
        source: std::io::Error,
    },
    #[error("Line {line} of {source_name} is not valid UTF-8 text.")]
    Encoding { source_name: String, line: u64 },
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    #[error("The {stage} thread panicked.")]
    StagePanicked { stage: &'static str },
    #[error("The search was cancelled before it completed.")]
    Cancelled,
}

impl PipelineError {
    /// The source could not be opened at all.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// The source opened but failed part-way through.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Encoding { .. })
    }
}

/// A cooperative stop signal shared by every stage of one run.
///
/// Stages poll it between lines; nothing is interrupted mid-operation. Once set it
/// stays set, and a run that observes it returns an error rather than a map.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tuning knobs for one run. The defaults suit almost every input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of filter workers. Defaults to the number of logical CPUs.
    pub workers: usize,
    pub line_queue_capacity: usize,
    pub token_queue_capacity: usize,
    /// Draw a progress bar on stderr when it is a terminal.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            line_queue_capacity: DEFAULT_LINE_QUEUE_CAPACITY,
            token_queue_capacity: DEFAULT_TOKEN_QUEUE_CAPACITY,
            show_progress: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacities(mut self, line_queue: usize, token_queue: usize) -> Self {
        self.line_queue_capacity = line_queue;
        self.token_queue_capacity = token_queue;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "at least one filter worker is required".to_string(),
            ));
        }
        if self.line_queue_capacity == 0 || self.token_queue_capacity == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "queue capacities must be at least 1 (line queue {}, token queue {})",
                self.line_queue_capacity, self.token_queue_capacity
            )));
        }
        Ok(())
    }
}

/// Owns the read-only inputs shared by every stage of a run.
pub struct PipelineContext {
    pub dictionary: Dictionary,
    pub config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(dictionary: Dictionary, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { dictionary, config })
    }
}

/// Counts, for the document at `document_path`, every word of the dictionary at
/// `dictionary_path`, using the default configuration.
pub fn search(dictionary_path: &Path, document_path: &Path) -> Result<FrequencyMap, PipelineError> {
    search_with_config(dictionary_path, document_path, &PipelineConfig::default())
        .map(|summary| summary.frequencies)
}

/// Like [`search`], with explicit tuning and run statistics.
pub fn search_with_config(
    dictionary_path: &Path,
    document_path: &Path,
    config: &PipelineConfig,
) -> Result<SearchSummary, PipelineError> {
    config.validate()?;
    if is_stdin_path(dictionary_path) && is_stdin_path(document_path) {
        return Err(PipelineError::InvalidConfig(
            "the dictionary and the document cannot both be read from standard input"
                .to_string(),
        ));
    }

    let dictionary = dictionary::load_dictionary(dictionary_path)?;
    let document = open_text_source(document_path)?;
    let context = PipelineContext::new(dictionary, config.clone())?;
    run(&context, document)
}

/// Executes the concurrent pipeline over `document`.
///
/// This is synchronous: it returns once the aggregator has delivered the final map,
/// or with the first fatal error any stage hit.
pub fn run(
    context: &PipelineContext,
    document: Box<dyn TextSource>,
) -> Result<SearchSummary, PipelineError> {
    run_cancellable(context, document, &CancelToken::new())
}

/// [`run`], with a caller-owned cancel token that may be tripped from another thread.
pub fn run_cancellable(
    context: &PipelineContext,
    document: Box<dyn TextSource>,
    cancel: &CancelToken,
) -> Result<SearchSummary, PipelineError> {
    let config = &context.config;
    config.validate()?;
    let dictionary = &context.dictionary;
    let start_time = Instant::now();

    if dictionary.is_empty() {
        warn!("The dictionary is empty; no token can be counted.");
    }
    info!(
        "Scanning {} with {} filter worker(s) (line queue {}, token queue {}).",
        document.name(),
        config.workers,
        config.line_queue_capacity,
        config.token_queue_capacity
    );

    // --- 1. Setup: queues, shared counters and the progress bar ---
    let (line_tx, line_rx) = bounded::<String>(config.line_queue_capacity);
    let (token_tx, token_rx) = bounded::<&str>(config.token_queue_capacity);
    let bytes_read_count = AtomicU64::new(0);
    let producer_finished = AtomicBool::new(false);
    let pb = create_progress_bar(document.len(), config.show_progress, document.name());

    // --- 2. Orchestration: scoped threads so the workers can borrow the dictionary ---
    let (producer_result, worker_results, aggregator_result, updater_result) = thread::scope(|s| {
        let bytes_read_count = &bytes_read_count;
        let producer_finished = &producer_finished;

        // The UI updater polls the producer's byte counter. It is only spawned when
        // the bar is actually drawn.
        let updater = (!pb.is_hidden()).then(|| {
            let updater_pb = pb.clone();
            s.spawn(move || {
                while !producer_finished.load(Ordering::Acquire) {
                    updater_pb.set_position(bytes_read_count.load(Ordering::Relaxed));
                    thread::sleep(PROGRESS_REFRESH_INTERVAL);
                }
                updater_pb.set_position(bytes_read_count.load(Ordering::Relaxed));
            })
        });

        let aggregator = s.spawn(move || aggregate::aggregate(token_rx, dictionary.len()));

        let workers: Vec<_> = (0..config.workers)
            .map(|_| {
                let line_rx = line_rx.clone();
                let token_tx = token_tx.clone();
                s.spawn(move || filter::filter_worker(dictionary, line_rx, token_tx, cancel))
            })
            .collect();

        // The orchestrator keeps no queue ends of its own. Holding `token_tx` here
        // would keep the token queue open forever and the aggregator would never return.
        drop(line_rx);
        drop(token_tx);

        let producer =
            s.spawn(move || io::producer_thread(document, line_tx, cancel, bytes_read_count));

        // --- 3. Completion barrier: producer, then every worker, then the aggregator ---
        let producer_result = producer.join();
        producer_finished.store(true, Ordering::Release);
        let worker_results: Vec<_> = workers.into_iter().map(|worker| worker.join()).collect();
        let aggregator_result = aggregator.join();
        let updater_result = updater.map_or(Ok(()), |updater| updater.join());
        (producer_result, worker_results, aggregator_result, updater_result)
    });
    pb.finish_and_clear();

    // --- 4. Resolve the outcome. A root-cause I/O error wins over its side effects. ---
    let producer_stats = joined(producer_result, "line producer")??;

    let mut filter_stats = FilterStats::default();
    for result in worker_results {
        filter_stats.merge(joined(result, "filter worker")?);
    }

    let counts = joined(aggregator_result, "aggregator")?;
    joined(updater_result, "progress updater")?;

    if cancel.is_cancelled() {
        warn!(
            "Search cancelled after {} lines; discarding partial counts.",
            producer_stats.lines_read
        );
        return Err(PipelineError::Cancelled);
    }

    // --- 5. Conservation checks ---
    let total_counted: u64 = counts.values().sum();
    debug!(
        "Workers consumed {} lines, scanned {} tokens, forwarded {}; aggregator counted {} across {} words.",
        filter_stats.lines,
        filter_stats.tokens_scanned,
        filter_stats.tokens_matched,
        total_counted,
        counts.len()
    );
    debug_assert_eq!(
        filter_stats.lines, producer_stats.lines_read,
        "every produced line must be consumed exactly once"
    );
    debug_assert_eq!(
        total_counted, filter_stats.tokens_matched,
        "every forwarded token must be counted exactly once"
    );

    let frequencies = aggregate::into_frequency_map(counts);
    let stats = PipelineStats {
        lines_read: producer_stats.lines_read,
        bytes_read: producer_stats.bytes_read,
        tokens_scanned: filter_stats.tokens_scanned,
        tokens_matched: filter_stats.tokens_matched,
        workers: config.workers,
    };
    info!(
        "Scan complete in {:.2?}: {} lines, {} tokens, {} matches across {} distinct words.",
        start_time.elapsed(),
        stats.lines_read,
        stats.tokens_scanned,
        stats.tokens_matched,
        frequencies.len()
    );

    Ok(SearchSummary { frequencies, stats })
}

/// Converts a stage's join outcome, turning a panic into [`PipelineError::StagePanicked`].
fn joined<T>(result: thread::Result<T>, stage: &'static str) -> Result<T, PipelineError> {
    result.map_err(|_| PipelineError::StagePanicked { stage })
}

fn create_progress_bar(total_bytes: Option<u64>, enabled: bool, name: &str) -> ProgressBar {
    let draw_target = if enabled && std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(total_bytes, draw_target);
    let template = if total_bytes.is_some() {
        "> [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}"
    } else {
        "> [{elapsed_precise}] {spinner} {bytes} {msg}"
    };
    match ProgressStyle::with_template(template) {
        Ok(style) => pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  ")),
        Err(e) => debug!("Falling back to the default progress style: {e}"),
    }
    pb.set_message(format!("Scanning {name}"));

    pb
}
