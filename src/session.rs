/// Session aggregation: correlate metric fragments scattered across the
/// lines of one log file into per-job records.
///
/// One aggregator instance is scoped to one file. Fragments between a
/// `Job started`/`Job finished` pair belong to that job, keyed by its id.
/// Fragments outside any marker fall into an implicit unscoped session keyed
/// by the file path; within an unscoped session, a timestamp gap larger than
/// the configured window closes the record and starts a fresh one.
use crate::classify::{BoundaryEdge, LineEvent, MetricFragment};
use crate::patterns::MetricKind;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Aggregate of fragments believed to belong to one backup job. Mutable only
/// inside the aggregator; handed out by value once finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session_key: String,
    pub fragments: HashMap<MetricKind, MetricFragment>,
    pub file_origin: PathBuf,
}

impl SessionRecord {
    fn new(session_key: String, file_origin: PathBuf) -> Self {
        Self {
            session_key,
            fragments: HashMap::new(),
            file_origin,
        }
    }

    pub fn value(&self, kind: MetricKind) -> Option<&MetricFragment> {
        self.fragments.get(&kind)
    }
}

#[derive(Debug)]
struct OpenSession {
    record: SessionRecord,
    /// Opened by an explicit boundary marker (vs the unscoped fallback).
    scoped: bool,
    last_seen: Option<NaiveDateTime>,
}

/// Per-file aggregation state.
#[derive(Debug)]
pub struct SessionAggregator {
    file_origin: PathBuf,
    time_window_secs: u64,
    open: Option<OpenSession>,
}

impl SessionAggregator {
    pub fn new(file_origin: &Path, time_window_secs: u64) -> Self {
        Self {
            file_origin: file_origin.to_path_buf(),
            time_window_secs,
            open: None,
        }
    }

    /// Feed one classified line event. Returns a finalized record when the
    /// event closed one (boundary marker or temporal gap).
    pub fn observe(&mut self, event: LineEvent) -> Option<SessionRecord> {
        match event {
            LineEvent::Boundary(boundary) => match boundary.edge {
                BoundaryEdge::Start => {
                    let closed = self.take_open();
                    let key = boundary.job_id.unwrap_or_else(|| self.unscoped_key());
                    self.open = Some(OpenSession {
                        record: SessionRecord::new(key, self.file_origin.clone()),
                        scoped: true,
                        last_seen: None,
                    });
                    closed
                }
                BoundaryEdge::Finish => self.take_open(),
            },
            LineEvent::Fragments(fragments) => self.absorb(fragments),
        }
    }

    /// End of file: flush whatever is still open.
    pub fn finish(&mut self) -> Option<SessionRecord> {
        self.take_open()
    }

    fn absorb(&mut self, fragments: Vec<MetricFragment>) -> Option<SessionRecord> {
        // Temporal-proximity fallback, unscoped sessions only: a gap wider
        // than the window means a new logical operation.
        let gap_exceeded = match &self.open {
            Some(open) if !open.scoped => {
                match (open.last_seen, first_timestamp(&fragments)) {
                    (Some(last), Some(next)) => {
                        (next - last).num_seconds() > self.time_window_secs as i64
                    }
                    _ => false,
                }
            }
            _ => false,
        };
        let closed = if gap_exceeded { self.take_open() } else { None };

        let open = self.open.get_or_insert_with(|| OpenSession {
            record: SessionRecord::new(
                self.file_origin.display().to_string(),
                self.file_origin.clone(),
            ),
            scoped: false,
            last_seen: None,
        });

        for fragment in fragments {
            if let Some(ts) = fragment.timestamp {
                open.last_seen = Some(ts);
            }
            // Last-seen-wins: logs may restate or correct earlier entries.
            open.record.fragments.insert(fragment.kind, fragment);
        }

        closed
    }

    /// Close the open session. Records that never accumulated a fragment are
    /// dropped rather than reported.
    fn take_open(&mut self) -> Option<SessionRecord> {
        let open = self.open.take()?;
        if open.record.fragments.is_empty() {
            return None;
        }
        Some(open.record)
    }

    fn unscoped_key(&self) -> String {
        self.file_origin.display().to_string()
    }
}

fn first_timestamp(fragments: &[MetricFragment]) -> Option<NaiveDateTime> {
    fragments.iter().find_map(|f| f.timestamp)
}
