//! # Aggregator
//!
//! The single consumer of the token queue and the only code that ever writes to the
//! frequency map. Because there is exactly one of it, counting needs no atomics and
//! no locks.

use crate::types::FrequencyMap;
use ahash::AHashMap;
use crossbeam_channel::Receiver;

/// Upper bound on the up-front map allocation, however large the dictionary is.
const MAX_INITIAL_CAPACITY: usize = 1 << 16;

/// Counts borrowed tokens until the token queue is closed and drained.
pub type TokenCounts<'d> = AHashMap<&'d str, u64>;

/// Drains `token_rx`, incrementing a count per token. Returns once, after the last
/// worker has dropped its sender and every queued token has been consumed.
///
/// `distinct_hint` is the dictionary size, an upper bound on the number of keys.
pub fn aggregate<'d>(token_rx: Receiver<&'d str>, distinct_hint: usize) -> TokenCounts<'d> {
    let mut counts = TokenCounts::with_capacity(distinct_hint.min(MAX_INITIAL_CAPACITY));
    for token in token_rx {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Detaches the counts from the dictionary's lifetime for hand-off to the caller.
pub fn into_frequency_map(counts: TokenCounts<'_>) -> FrequencyMap {
    counts
        .into_iter()
        .map(|(token, count)| (token.to_owned(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    #[test]
    fn counts_each_occurrence_once() {
        let (token_tx, token_rx) = unbounded();
        for token in ["go", "stop", "go", "go"] {
            token_tx.send(token).expect("token queue open");
        }
        drop(token_tx);

        let frequencies = into_frequency_map(aggregate(token_rx, 2));
        assert_eq!(frequencies.len(), 2);
        assert_eq!(frequencies.get("go"), Some(&3));
        assert_eq!(frequencies.get("stop"), Some(&1));
    }

    #[test]
    fn an_empty_queue_yields_an_empty_map() {
        let (token_tx, token_rx) = unbounded::<&str>();
        drop(token_tx);
        assert!(aggregate(token_rx, 0).is_empty());
    }

    #[test]
    fn returns_only_after_every_sender_is_dropped() {
        let (token_tx, token_rx) = unbounded();
        let counts = thread::scope(|s| {
            let aggregator = s.spawn(move || aggregate(token_rx, 1));
            let senders: Vec<_> = (0..4)
                .map(|_| {
                    let tx = token_tx.clone();
                    s.spawn(move || {
                        for _ in 0..250 {
                            tx.send("word").expect("token queue open");
                        }
                    })
                })
                .collect();
            drop(token_tx);
            for sender in senders {
                sender.join().expect("sender panicked");
            }
            aggregator.join().expect("aggregator panicked")
        });
        assert_eq!(counts.get("word"), Some(&1000));
    }
}
