// ========================================================================================
//
//                               The dictionary loader
//
// ========================================================================================
//
// Builds the read-only word set that the filter workers consult. The whole source is
// consumed before the set is returned; nothing is streamed, so a dictionary that fails
// halfway never reaches a worker.

use crate::normalize;
use crate::pipeline::PipelineError;
use crate::shared::files::{TextSource, open_text_source};
use crate::types::Dictionary;
use log::{debug, info, warn};
use std::path::Path;

/// Opens `path` and loads it as a dictionary, one candidate word per line.
pub fn load_dictionary(path: &Path) -> Result<Dictionary, PipelineError> {
    let mut source = open_text_source(path)?;
    load(source.as_mut())
}

/// Loads a dictionary from an already-open source.
///
/// Each line is normalized exactly as document lines are. Duplicates collapse, lines
/// that normalize to nothing are skipped, and any read or encoding failure aborts the
/// load.
pub fn load(source: &mut dyn TextSource) -> Result<Dictionary, PipelineError> {
    let mut dictionary = Dictionary::default();
    let mut lines = 0u64;
    let mut duplicates = 0u64;
    let mut unmatchable = 0u64;

    while let Some(line) = source.next_line()? {
        lines += 1;
        let word = normalize::normalize(&line);
        if word.is_empty() {
            continue;
        }
        // Tokens never contain whitespace, so such an entry can never be counted.
        if word.split_whitespace().nth(1).is_some() {
            unmatchable += 1;
        }
        if !dictionary.insert_normalized(word) {
            duplicates += 1;
        }
    }

    if unmatchable > 0 {
        warn!(
            "{unmatchable} dictionary entr{} in {} contain internal whitespace and can never match a token.",
            if unmatchable == 1 { "y" } else { "ies" },
            source.name()
        );
    }
    debug!("Dictionary {}: {lines} lines, {duplicates} duplicates.", source.name());
    info!(
        "Loaded {} unique words from {}.",
        dictionary.len(),
        source.name()
    );

    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::files::LineReader;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn load_str(text: &str) -> Result<Dictionary, PipelineError> {
        let mut source = LineReader::new("memory", Cursor::new(text.to_string()));
        load(&mut source)
    }

    #[test]
    fn entries_are_normalized_on_load() -> Result<(), PipelineError> {
        let dictionary = load_str("Cat\nDOG.\n  \"Bird\"  \nend.Start\n")?;
        let mut words: Vec<&str> = dictionary.iter().collect();
        words.sort_unstable();
        assert_eq!(words, vec!["bird", "cat", "dog", "endstart"]);
        Ok(())
    }

    #[test]
    fn duplicates_and_blank_lines_collapse() -> Result<(), PipelineError> {
        let dictionary = load_str("go\nGo\nGO!\n\n...\n")?;
        assert_eq!(dictionary.len(), 1);
        assert!(dictionary.contains("go"));
        Ok(())
    }

    #[test]
    fn final_line_without_newline_is_kept() -> Result<(), PipelineError> {
        let dictionary = load_str("alpha\nomega")?;
        assert!(dictionary.contains("omega"));
        Ok(())
    }

    #[test]
    fn multi_word_entries_are_kept_verbatim() -> Result<(), PipelineError> {
        let dictionary = load_str("ice cream\n")?;
        assert!(dictionary.contains("ice cream"));
        assert!(!dictionary.contains("ice"));
        Ok(())
    }

    #[test]
    fn invalid_encoding_aborts_the_load() {
        let mut source = LineReader::new("memory", Cursor::new(b"ok\n\xc3\x28\n".to_vec()));
        match load(&mut source) {
            Err(PipelineError::Encoding { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected an encoding error, got {other:?}"),
        }
    }

    #[test]
    fn loads_from_a_file_on_disk() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "cat")?;
        writeln!(file, "dog")?;
        file.flush()?;

        let dictionary = load_dictionary(file.path())?;
        assert_eq!(dictionary.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_dictionary_is_an_open_failure() {
        let err = load_dictionary(Path::new("/definitely/not/a/real/dictionary.txt"))
            .expect_err("a missing dictionary must fail");
        assert!(err.is_open_failure(), "unexpected error: {err:?}");
    }
}
