// ========================================================================================
//
//                      The command-line front end: wordtally
//
// ========================================================================================
//
// Parses the two required source paths and the optional tuning flags, runs the search,
// and prints the resulting frequency map. All counting happens in the library; this
// binary only decides the exit code and the output format.

#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Parser, ValueEnum};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use wordtally::pipeline::{DEFAULT_LINE_QUEUE_CAPACITY, DEFAULT_TOKEN_QUEUE_CAPACITY};
use wordtally::{FrequencyMap, PipelineConfig, search_with_config};

// ========================================================================================
//                              Command-line interface definition
// ========================================================================================

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortOrder {
    /// Alphabetical by word.
    Word,
    /// Highest count first, ties broken alphabetically.
    Count,
}

#[derive(Parser, Debug)]
#[clap(
    name = "wordtally",
    version,
    about = "Counts how often each dictionary word occurs in a document."
)]
struct Args {
    /// Dictionary of words to count, one per line (`-` for stdin, `.gz` accepted).
    #[clap(long, value_name = "PATH")]
    dict: PathBuf,

    /// Document to search (`-` for stdin, `.gz` accepted).
    #[clap(long, value_name = "PATH")]
    doc: PathBuf,

    /// Number of filter workers. Defaults to the number of logical CPUs.
    #[clap(long, value_name = "N")]
    workers: Option<usize>,

    /// Capacity of the queue between the reader and the filter workers.
    #[clap(long, value_name = "N", default_value_t = DEFAULT_LINE_QUEUE_CAPACITY)]
    line_queue: usize,

    /// Capacity of the queue between the filter workers and the counter.
    #[clap(long, value_name = "N", default_value_t = DEFAULT_TOKEN_QUEUE_CAPACITY)]
    token_queue: usize,

    /// Output ordering.
    #[clap(long, value_enum, default_value_t = SortOrder::Word)]
    sort: SortOrder,

    /// Never draw the progress bar.
    #[clap(long)]
    no_progress: bool,
}

// ========================================================================================
//                              The main orchestration logic
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    // Missing flags are a usage error with exit code 1; `--help` and `--version` exit 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let start_time = Instant::now();
    let mut config = PipelineConfig::default()
        .with_queue_capacities(args.line_queue, args.token_queue)
        .with_progress(!args.no_progress);
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    log::info!(
        "Dictionary: {}, document: {}",
        args.dict.display(),
        args.doc.display()
    );
    let summary = match search_with_config(&args.dict, &args.doc, &config) {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = write_frequencies(io::stdout().lock(), &summary.frequencies, args.sort) {
        // A closed pipe downstream (e.g. `| head`) is not worth an error message.
        if e.kind() != io::ErrorKind::BrokenPipe {
            log::error!("Error writing results: {e}");
            process::exit(1);
        }
    }

    log::info!(
        "Success! Total execution time: {:.2?}",
        start_time.elapsed()
    );
}

// ========================================================================================
//                                  Helper functions
// ========================================================================================

/// Writes one `word<TAB>count` line per entry.
fn write_frequencies<W: Write>(
    out: W,
    frequencies: &FrequencyMap,
    order: SortOrder,
) -> io::Result<()> {
    let mut entries: Vec<(&str, u64)> = frequencies
        .iter()
        .map(|(word, &count)| (word.as_str(), count))
        .collect();
    match order {
        SortOrder::Word => entries.sort_unstable_by(|a, b| a.0.cmp(b.0)),
        SortOrder::Count => {
            entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        }
    }

    let mut writer = BufWriter::new(out);
    for (word, count) in entries {
        writeln!(writer, "{word}\t{count}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrequencyMap {
        [("dog", 1), ("cat", 2), ("ant", 2), ("yak", 5)]
            .into_iter()
            .map(|(word, count)| (word.to_string(), count))
            .collect()
    }

    fn render(order: SortOrder) -> String {
        let mut out = Vec::new();
        write_frequencies(&mut out, &sample(), order).expect("writing to a Vec cannot fail");
        String::from_utf8(out).expect("output is UTF-8")
    }

    #[test]
    fn sorts_alphabetically_by_default() {
        assert_eq!(render(SortOrder::Word), "ant\t2\ncat\t2\ndog\t1\nyak\t5\n");
    }

    #[test]
    fn count_order_breaks_ties_by_word() {
        assert_eq!(render(SortOrder::Count), "yak\t5\nant\t2\ncat\t2\ndog\t1\n");
    }

    #[test]
    fn both_paths_are_required() {
        assert!(Args::try_parse_from(["wordtally", "--dict", "words.txt"]).is_err());
        assert!(Args::try_parse_from(["wordtally", "--doc", "book.txt"]).is_err());
        assert!(Args::try_parse_from(["wordtally", "--dict", "w", "--doc", "d"]).is_ok());
    }
}
