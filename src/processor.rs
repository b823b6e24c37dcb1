/// Per-file processing: read a log line by line, classify, aggregate, and
/// stream out finalized session records.
///
/// The processor is an iterator so a file's records can be consumed as its
/// sessions close — memory is bounded by one open record, not file size.
/// Lines are decoded tolerantly (invalid UTF-8 is replaced, the way the
/// component logs themselves are read back by support tooling); only failing
/// to open or read the file at all makes the file unreadable.
use crate::classify::{self, Component};
use crate::session::{SessionAggregator, SessionRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors that make a whole file unprocessable. Reported per file; the run
/// continues with the remaining files.
#[derive(Debug)]
pub enum ProcessError {
    UnreadableFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::UnreadableFile { path, source } => {
                write!(f, "cannot read log file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::UnreadableFile { source, .. } => Some(source),
        }
    }
}

/// Streams finalized `SessionRecord`s out of one log file.
#[derive(Debug)]
pub struct FileProcessor {
    path: PathBuf,
    reader: BufReader<File>,
    aggregator: SessionAggregator,
    component: Component,
    line_no: usize,
    malformed: u64,
    read_error: Option<std::io::Error>,
    done: bool,
}

impl FileProcessor {
    /// Open a log file for processing. The component type is inferred from
    /// the file name and only tunes pattern priority.
    pub fn open(path: &Path, time_window_secs: u64) -> Result<Self, ProcessError> {
        let file = File::open(path).map_err(|source| ProcessError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        let component = Component::infer(path);
        debug!(path = %path.display(), ?component, "processing log file");
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            aggregator: SessionAggregator::new(path, time_window_secs),
            component,
            line_no: 0,
            malformed: 0,
            read_error: None,
            done: false,
        })
    }

    /// Fragments skipped because a matched value failed validation.
    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    /// Set when reading stopped early on an I/O error. Records produced
    /// before the error were already yielded and remain valid.
    pub fn read_error(&self) -> Option<&std::io::Error> {
        self.read_error.as_ref()
    }
}

impl Iterator for FileProcessor {
    type Item = SessionRecord;

    fn next(&mut self) -> Option<SessionRecord> {
        if self.done {
            return None;
        }

        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.done = true;
                    return self.aggregator.finish();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %self.path.display(),
                        line = self.line_no + 1,
                        "read failed, abandoning rest of file"
                    );
                    self.read_error = Some(e);
                    self.done = true;
                    return self.aggregator.finish();
                }
            }

            self.line_no += 1;
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim_end_matches(['\n', '\r']);

            match classify::classify(line, self.line_no, self.component) {
                Ok(Some(event)) => {
                    if let Some(record) = self.aggregator.observe(event) {
                        return Some(record);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    self.malformed += 1;
                    warn!(
                        error = %e,
                        path = %self.path.display(),
                        line = self.line_no,
                        "skipping malformed metric value"
                    );
                }
            }
        }
    }
}
