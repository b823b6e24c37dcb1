/// Report assembly: flatten finalized session records into fixed-schema rows
/// and serialize them as CSV.
///
/// A missing metric renders as an empty field, never a substituted zero.
/// Row order is arrival order, so deterministic file enumeration gives a
/// byte-identical report on re-runs.
use crate::patterns::{MetricKind, MetricValue};
use crate::session::SessionRecord;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 6] = [
    "Session",
    "TransferSize(bytes)",
    "TransferDuration(s)",
    "NetworkBottleneckPct",
    "WanCacheHitPct",
    "RetryCount",
];

/// A flattened, file-scoped view of one finalized session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub session: String,
    /// One slot per `MetricKind`, in `MetricKind::ALL` order.
    pub values: [Option<MetricValue>; 5],
}

impl ReportRow {
    pub fn from_record(record: SessionRecord) -> Self {
        let mut values = [None; 5];
        for (slot, kind) in values.iter_mut().zip(MetricKind::ALL) {
            *slot = record.value(kind).map(|fragment| fragment.value);
        }
        Self {
            session: record.session_key,
            values,
        }
    }

    fn csv_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(6);
        fields.push(self.session.clone());
        for value in &self.values {
            fields.push(value.map(|v| v.to_string()).unwrap_or_default());
        }
        fields
    }
}

/// Ordered collection of report rows, ready for serialization.
#[derive(Debug, Default)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Serialize header + rows as CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for row in &self.rows {
            wtr.write_record(row.csv_fields())?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_csv(file).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Accumulates rows across files, in arrival order.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SessionRecord) {
        self.report.rows.push(ReportRow::from_record(record));
    }

    pub fn finish(self) -> Report {
        self.report
    }
}

/// Errors writing the report file.
#[derive(Debug)]
pub enum ReportError {
    Create {
        path: PathBuf,
        source: io::Error,
    },
    Write {
        path: PathBuf,
        source: csv::Error,
    },
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Create { path, source } => {
                write!(f, "cannot create report {}: {}", path.display(), source)
            }
            ReportError::Write { path, source } => {
                write!(f, "cannot write report {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Create { source, .. } => Some(source),
            ReportError::Write { source, .. } => Some(source),
        }
    }
}

/// Report file name for a scanned input: the folder name (or file stem),
/// uppercased, with a `.CSV` extension.
pub fn report_file_name(input: &Path) -> String {
    let base = if input.is_dir() {
        input.file_name()
    } else {
        input.file_stem()
    };
    let base = base
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| "REPORT".to_string());
    format!("{base}.CSV")
}
