//! # Normalization
//!
//! The single canonical transform applied to both dictionary entries and document
//! lines. Lookups are exact string comparisons, so both sides MUST go through the
//! same function or matches are silently lost.
//!
//! The steps are fixed and ordered:
//!
//! 1. strip one trailing `\n`,
//! 2. delete every character in [`PUNCTUATION`] (deletion, not replacement, so
//!    `end.Start` becomes `endStart`),
//! 3. trim surrounding whitespace,
//! 4. lowercase.
//!
//! Tokenization then splits the normalized text on runs of whitespace.

/// Characters removed from every line before tokenization.
pub const PUNCTUATION: [char; 10] = [',', ':', ';', '.', '!', '"', ']', '[', '}', '{'];

#[inline]
fn is_stripped_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

/// Normalizes `raw` into `out`, reusing its allocation.
///
/// Lowercasing is applied while copying. Lowercase mappings never produce or consume
/// whitespace, so lowercasing before the trim yields the same text as trimming first.
pub fn normalize_into(raw: &str, out: &mut String) {
    out.clear();
    let line = raw.strip_suffix('\n').unwrap_or(raw);

    for c in line.chars().filter(|&c| !is_stripped_punctuation(c)) {
        if c.is_ascii() {
            out.push(c.to_ascii_lowercase());
        } else {
            out.extend(c.to_lowercase());
        }
    }

    let end = out.trim_end().len();
    out.truncate(end);
    let start = out.len() - out.trim_start().len();
    out.drain(..start);
}

/// Returns the normalized form of `raw`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    normalize_into(raw, &mut out);
    out
}

/// Splits normalized text into tokens on runs of whitespace.
#[inline]
pub fn tokenize(normalized: &str) -> std::str::SplitWhitespace<'_> {
    normalized.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_a_single_trailing_newline() {
        assert_eq!(normalize("word\n"), "word");
        assert_eq!(normalize("word\n\n"), "word");
        assert_eq!(normalize("word"), "word");
    }

    #[test]
    fn deletes_punctuation_without_inserting_space() {
        assert_eq!(normalize("end.Start"), "endstart");
        assert_eq!(normalize("{a}[b]\"c\""), "abc");
        assert_eq!(normalize("go, go!"), "go go");
    }

    #[test]
    fn keeps_characters_outside_the_fixed_set() {
        assert_eq!(normalize("don't stop?"), "don't stop?");
        assert_eq!(normalize("(well)-done"), "(well)-done");
    }

    #[test]
    fn trims_and_lowercases() {
        assert_eq!(normalize("  The CAT sat.  \r\n"), "the cat sat");
        assert_eq!(normalize("\t\u{00C9}T\u{00C9}\n"), "\u{00E9}t\u{00E9}");
    }

    #[test]
    fn punctuation_only_lines_become_empty() {
        assert_eq!(normalize("...!!!\n"), "");
        assert_eq!(normalize(" , ; : "), "");
        assert_eq!(tokenize(&normalize(" , ; : ")).count(), 0);
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "",
            "\n",
            "The cat sat on the cat. A dog ran.\n",
            "go, go!",
            "GO.",
            "end.Start",
            "  mixed\tWHITE   space \r\n",
            "\u{0130}stanbul \u{03A3}\u{039F}\u{03A6}\u{039F}\u{03A3}",
            "{[\"nested\"]}:;",
        ];
        for sample in samples {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalizing {sample:?} twice changed the result");
        }
    }

    #[test]
    fn tokenize_splits_on_whitespace_runs() {
        let normalized = normalize("The  cat\tsat\n");
        let tokens: Vec<&str> = tokenize(&normalized).collect();
        assert_eq!(tokens, vec!["the", "cat", "sat"]);
    }

    #[test]
    fn normalize_into_reuses_the_buffer() {
        let mut buffer = String::from("stale contents");
        normalize_into("Fresh!", &mut buffer);
        assert_eq!(buffer, "fresh");
    }
}
