/// Handle `netperf-scan scan`: discover log files, run each through the
/// processor, and write the CSV report.
///
/// Partial-failure semantics: one bad file degrades the report, it never
/// aborts the run. Only discovering zero input files is fatal.
use crate::config::NetperfConfig;
use crate::discover::{discover_logs, DiscoverError};
use crate::processor::FileProcessor;
use crate::report::{report_file_name, ReportBuilder, ReportError};
use crate::summary::RunSummary;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug)]
pub enum ScanError {
    Discover(DiscoverError),
    Report(ReportError),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Discover(e) => write!(f, "{e}"),
            ScanError::Report(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::Discover(e) => Some(e),
            ScanError::Report(e) => Some(e),
        }
    }
}

impl From<DiscoverError> for ScanError {
    fn from(e: DiscoverError) -> Self {
        ScanError::Discover(e)
    }
}

impl From<ReportError> for ScanError {
    fn from(e: ReportError) -> Self {
        ScanError::Report(e)
    }
}

/// Run the full scan pipeline. Returns the run summary; the report file is
/// written before returning.
pub fn handle_scan(
    input: &Path,
    out: Option<&Path>,
    config: &NetperfConfig,
) -> Result<RunSummary, ScanError> {
    let files = discover_logs(input, &config.scan.log_pattern)?;
    let mut summary = RunSummary {
        files_found: files.len(),
        ..Default::default()
    };

    let mut builder = ReportBuilder::new();
    for path in &files {
        let mut processor = match FileProcessor::open(path, config.session.time_window_secs) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "skipping unreadable log file");
                summary.files_skipped += 1;
                continue;
            }
        };

        for record in processor.by_ref() {
            builder.push(record);
        }

        summary.malformed_values += processor.malformed_count();
        if processor.read_error().is_some() {
            summary.files_skipped += 1;
        } else {
            summary.files_parsed += 1;
        }
    }

    let report = builder.finish();
    summary.rows_written = report.len();

    let out_path = resolve_out_path(input, out, config);
    report.write_to(&out_path)?;
    info!(
        rows = report.len(),
        path = %out_path.display(),
        "report written"
    );
    println!("{} rows written to {}", report.len(), out_path.display());

    Ok(summary)
}

/// Explicit `--out` wins; otherwise the report is auto-named after the
/// scanned folder (or file stem) in the configured output directory.
fn resolve_out_path(input: &Path, out: Option<&Path>, config: &NetperfConfig) -> PathBuf {
    match out {
        Some(path) => path.to_path_buf(),
        None => config.scan.output_dir.join(report_file_name(input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn config_with_output(dir: &Path) -> NetperfConfig {
        let mut config = NetperfConfig::default();
        config.scan.output_dir = dir.to_path_buf();
        config
    }

    fn write_log(dir: &Path, name: &str, lines: &[&str]) {
        let mut f = File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }

    #[test]
    fn scan_writes_report_with_expected_rows() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(
            logs.path(),
            "vbr.log",
            &[
                "Job started #42",
                "Transferred: 2.50 GB in 00:02:05",
                "Bottleneck: Network 17%",
                "Job finished #42",
            ],
        );

        let out_file = out.path().join("report.csv");
        let summary = handle_scan(
            logs.path(),
            Some(&out_file),
            &config_with_output(out.path()),
        )
        .unwrap();

        assert_eq!(summary.files_found, 1);
        assert_eq!(summary.files_parsed, 1);
        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.malformed_values, 0);

        let text = std::fs::read_to_string(&out_file).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Session,TransferSize(bytes),TransferDuration(s),NetworkBottleneckPct,WanCacheHitPct,RetryCount"
        );
        assert_eq!(lines.next().unwrap(), "42,2684354560,125,17,,");
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn auto_named_report_lands_in_output_dir() {
        let parent = TempDir::new().unwrap();
        let logs = parent.path().join("march_logs");
        std::fs::create_dir(&logs).unwrap();
        write_log(&logs, "vbr.log", &["retries: 1"]);
        let out = TempDir::new().unwrap();

        handle_scan(&logs, None, &config_with_output(out.path())).unwrap();

        assert!(out.path().join("MARCH_LOGS.CSV").is_file());
    }

    #[test]
    fn rerun_is_byte_identical() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(
            logs.path(),
            "a.log",
            &["Job started #1", "retries: 5", "Job finished #1"],
        );
        write_log(
            logs.path(),
            "b.log",
            &["WAN Accelerator cache hit: 82.5%"],
        );

        let config = config_with_output(out.path());
        let first_path = out.path().join("first.csv");
        let second_path = out.path().join("second.csv");
        handle_scan(logs.path(), Some(&first_path), &config).unwrap();
        handle_scan(logs.path(), Some(&second_path), &config).unwrap();

        let first = std::fs::read(&first_path).unwrap();
        let second = std::fs::read(&second_path).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn rows_follow_file_enumeration_order() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(logs.path(), "b.log", &["retries: 2"]);
        write_log(logs.path(), "a.log", &["retries: 1"]);

        let out_file = out.path().join("report.csv");
        handle_scan(logs.path(), Some(&out_file), &config_with_output(out.path())).unwrap();

        let text = std::fs::read_to_string(&out_file).unwrap();
        let rows: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("a.log"), "row: {}", rows[0]);
        assert!(rows[1].contains("b.log"), "row: {}", rows[1]);
    }

    #[test]
    fn empty_input_dir_is_fatal() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let err = handle_scan(logs.path(), None, &config_with_output(out.path())).unwrap_err();
        assert!(matches!(err, ScanError::Discover(DiscoverError::NoInputFound { .. })));
    }

    #[test]
    fn empty_log_file_contributes_no_rows() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(logs.path(), "empty.log", &[]);

        let out_file = out.path().join("report.csv");
        let summary = handle_scan(
            logs.path(),
            Some(&out_file),
            &config_with_output(out.path()),
        )
        .unwrap();

        assert_eq!(summary.rows_written, 0);
        // Header-only report is still written.
        let text = std::fs::read_to_string(&out_file).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_skipped_run_succeeds() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(logs.path(), "good.log", &["retries: 6"]);
        // Dangling symlink: discovered, but unreadable when opened.
        std::os::unix::fs::symlink(
            logs.path().join("gone-target"),
            logs.path().join("dead.log"),
        )
        .unwrap();

        let out_file = out.path().join("report.csv");
        let summary = handle_scan(
            logs.path(),
            Some(&out_file),
            &config_with_output(out.path()),
        )
        .unwrap();

        assert_eq!(summary.files_found, 2);
        assert_eq!(summary.files_parsed, 1);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.rows_written, 1);

        let text = std::fs::read_to_string(&out_file).unwrap();
        assert!(text.contains("good.log"));
    }

    #[test]
    fn malformed_values_are_counted_across_files() {
        let logs = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_log(
            logs.path(),
            "vbr.log",
            &["Bottleneck: Network: 300%", "retries: 4"],
        );

        let out_file = out.path().join("report.csv");
        let summary = handle_scan(
            logs.path(),
            Some(&out_file),
            &config_with_output(out.path()),
        )
        .unwrap();

        assert_eq!(summary.malformed_values, 1);
        assert_eq!(summary.rows_written, 1);
    }
}
