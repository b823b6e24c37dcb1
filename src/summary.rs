/// Run summary: what a scan processed and what it had to skip. Per-file and
/// per-line failures are recovered locally; the summary is where they stay
/// visible to the user.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Log files discovery resolved.
    pub files_found: usize,
    /// Files read to the end.
    pub files_parsed: usize,
    /// Files skipped because they could not be opened or read.
    pub files_skipped: usize,
    /// Rows in the written report.
    pub rows_written: usize,
    /// Metric values skipped because they failed validation.
    pub malformed_values: u64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} files parsed ({} skipped), {} rows, {} malformed values skipped",
            self.files_parsed,
            self.files_found,
            self.files_skipped,
            self.rows_written,
            self.malformed_values
        )
    }
}
