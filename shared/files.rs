use crate::pipeline::PipelineError;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// The path that selects standard input instead of a file.
pub const STDIN_PATH: &str = "-";

/// Buffer size for file-backed readers. Large enough to amortize syscalls on
/// multi-gigabyte documents without holding more than a few pages in memory.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Lines shorter than this still get this much capacity up front.
const MIN_LINE_CAPACITY: usize = 80;

/// A trait that abstracts sequential, line-oriented access to text data such as
/// word lists and documents, regardless of where the bytes come from.
pub trait TextSource: Send {
    /// A human-readable name used in error messages.
    fn name(&self) -> &str;

    /// Total size in bytes, when it is known without reading the source.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns the next raw line, including its trailing `\n` if it had one.
    /// `Ok(None)` is the clean end-of-stream signal; anything else is fatal.
    fn next_line(&mut self) -> Result<Option<String>, PipelineError>;
}

/// A [`TextSource`] over any buffered reader.
///
/// Each call allocates a fresh `String` sized from the previous line, because the line
/// is handed off by value into the line queue and never comes back.
pub struct LineReader<R> {
    reader: R,
    name: String,
    len: Option<u64>,
    line_number: u64,
    capacity_hint: usize,
}

impl<R: BufRead + Send> LineReader<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            reader,
            name: name.into(),
            len: None,
            line_number: 0,
            capacity_hint: MIN_LINE_CAPACITY,
        }
    }

    /// Records the total byte length of the source for progress reporting.
    pub fn with_len(mut self, len: u64) -> Self {
        self.len = Some(len);
        self
    }
}

impl<R: BufRead + Send> TextSource for LineReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> Option<u64> {
        self.len
    }

    fn next_line(&mut self) -> Result<Option<String>, PipelineError> {
        let mut bytes = Vec::with_capacity(self.capacity_hint);
        let bytes_read =
            self.reader
                .read_until(b'\n', &mut bytes)
                .map_err(|source| PipelineError::Read {
                    source_name: self.name.clone(),
                    line: self.line_number + 1,
                    source,
                })?;

        if bytes_read == 0 {
            return Ok(None);
        }

        self.line_number += 1;
        self.capacity_hint = bytes.len().max(MIN_LINE_CAPACITY);

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| PipelineError::Encoding {
                source_name: self.name.clone(),
                line: self.line_number,
            })
    }
}

pub fn is_stdin_path(path: &Path) -> bool {
    path.as_os_str() == STDIN_PATH
}

fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Opens a line-oriented source by path.
///
/// `-` reads standard input, a `.gz` extension is decompressed on the fly (multi-member
/// archives included), and anything else is read as a plain file.
pub fn open_text_source(path: &Path) -> Result<Box<dyn TextSource>, PipelineError> {
    if is_stdin_path(path) {
        return Ok(Box::new(LineReader::new(
            "<stdin>",
            BufReader::new(io::stdin()),
        )));
    }

    let open_error = |source: io::Error| PipelineError::Open {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(open_error)?;
    let metadata = file.metadata().map_err(open_error)?;
    if metadata.is_dir() {
        return Err(open_error(io::Error::new(
            io::ErrorKind::IsADirectory,
            "expected a text file but found a directory",
        )));
    }

    let display = path.display().to_string();
    if is_gzip_path(path) {
        let decoder = MultiGzDecoder::new(file);
        Ok(Box::new(LineReader::new(
            display,
            BufReader::with_capacity(READ_BUFFER_SIZE, decoder),
        )))
    } else {
        Ok(Box::new(
            LineReader::new(display, BufReader::with_capacity(READ_BUFFER_SIZE, file))
                .with_len(metadata.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Read, Write};
    use tempfile::{NamedTempFile, tempdir};

    fn drain(source: &mut dyn TextSource) -> Result<Vec<String>, PipelineError> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Yields `data` and then fails every subsequent read.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::other("device went away"));
            }
            Ok(n)
        }
    }

    #[test]
    fn lines_keep_their_trailing_newline() -> Result<(), PipelineError> {
        let mut source = LineReader::new("memory", Cursor::new("alpha\nbeta\ngamma"));
        let lines = drain(&mut source)?;
        assert_eq!(lines, vec!["alpha\n", "beta\n", "gamma"]);
        assert_eq!(source.next_line()?, None);
        Ok(())
    }

    #[test]
    fn empty_input_is_immediately_exhausted() -> Result<(), PipelineError> {
        let mut source = LineReader::new("memory", Cursor::new(""));
        assert_eq!(source.next_line()?, None);
        Ok(())
    }

    #[test]
    fn invalid_utf8_reports_the_offending_line() {
        let mut source = LineReader::new("memory", Cursor::new(b"ok\n\xff\xfe\n".to_vec()));
        assert_eq!(source.next_line().ok().flatten().as_deref(), Some("ok\n"));
        match source.next_line() {
            Err(PipelineError::Encoding { source_name, line }) => {
                assert_eq!(source_name, "memory");
                assert_eq!(line, 2);
            }
            other => panic!("Expected an encoding error, got {other:?}"),
        }
    }

    #[test]
    fn reader_failures_are_read_errors() {
        let reader = BufReader::new(FailingReader {
            data: Cursor::new(b"first\nsecond".to_vec()),
        });
        let mut source = LineReader::new("flaky", reader);
        let err = drain(&mut source).unwrap_err();
        assert!(err.is_read_failure(), "unexpected error: {err:?}");
        match err {
            PipelineError::Read { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected a read error, got {other:?}"),
        }
    }

    #[test]
    fn plain_files_report_their_length() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        write!(file, "one\ntwo\n")?;
        file.flush()?;

        let mut source = open_text_source(file.path())?;
        assert_eq!(source.len(), Some(8));
        assert_eq!(drain(source.as_mut())?, vec!["one\n", "two\n"]);
        Ok(())
    }

    #[test]
    fn gzip_files_are_decompressed() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("words.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        encoder.write_all(b"Cat\nDog\n")?;
        encoder.finish()?;

        let mut source = open_text_source(&path)?;
        assert_eq!(source.len(), None);
        assert_eq!(drain(source.as_mut())?, vec!["Cat\n", "Dog\n"]);
        Ok(())
    }

    #[test]
    fn missing_files_are_open_failures() {
        let dir = tempdir().expect("temporary directory");
        let err = open_text_source(&dir.path().join("absent.txt"))
            .err()
            .expect("opening a missing file must fail");
        assert!(err.is_open_failure(), "unexpected error: {err:?}");
    }

    #[test]
    fn directories_are_open_failures() {
        let dir = tempdir().expect("temporary directory");
        let err = open_text_source(dir.path())
            .err()
            .expect("opening a directory must fail");
        assert!(err.is_open_failure(), "unexpected error: {err:?}");
    }

    #[test]
    fn dash_selects_standard_input() {
        assert!(is_stdin_path(Path::new("-")));
        assert!(!is_stdin_path(Path::new("-words.txt")));
    }
}
