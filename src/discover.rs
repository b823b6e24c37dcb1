/// Log file discovery: resolve the input path to an ordered list of log
/// files. A file input is taken as-is; a directory is walked recursively for
/// entries matching the configured pattern (default `*.log`), sorted
/// lexicographically so report ordering is deterministic.
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug)]
pub enum DiscoverError {
    /// The input resolved to zero log files — nothing to report on.
    NoInputFound { path: PathBuf },
    /// The configured file pattern produced an invalid glob.
    BadPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl std::fmt::Display for DiscoverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoverError::NoInputFound { path } => {
                write!(f, "no log files found under {}", path.display())
            }
            DiscoverError::BadPattern { pattern, source } => {
                write!(f, "invalid log file pattern {pattern:?}: {source}")
            }
        }
    }
}

impl std::error::Error for DiscoverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiscoverError::NoInputFound { .. } => None,
            DiscoverError::BadPattern { source, .. } => Some(source),
        }
    }
}

/// Resolve `input` to the ordered list of log files to process.
pub fn discover_logs(input: &Path, file_pattern: &str) -> Result<Vec<PathBuf>, DiscoverError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let pattern = input.join("**").join(file_pattern);
    let pattern = pattern.to_string_lossy().into_owned();
    let entries = glob(&pattern).map_err(|source| DiscoverError::BadPattern {
        pattern: pattern.clone(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            // Directories named like logs are excluded; anything else (a
            // dangling symlink included) flows on to per-file error handling.
            Ok(path) if !path.is_dir() => Some(path),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "unreadable entry during log discovery");
                None
            }
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DiscoverError::NoInputFound {
            path: input.to_path_buf(),
        });
    }
    Ok(files)
}
