/// Line classification: one raw log line in, at most one recognized event out.
///
/// A line is either a session boundary marker (`Job started #42`), a metric
/// match yielding one or two fragments, or — the expected majority — nothing.
/// Classification is a pure function of the line and the file's component
/// type; the component only rotates pattern priority, it never excludes a
/// pattern, since any metric can in principle show up in any component's log.
use crate::patterns::{self, MalformedMetric, MetricKind, MetricValue, PatternId};
use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// One extracted metric value, tied to the line it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricFragment {
    pub kind: MetricKind,
    pub value: MetricValue,
    pub source_line: usize,
    pub timestamp: Option<NaiveDateTime>,
}

/// Which end of a session a boundary marker announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryEdge {
    Start,
    Finish,
}

/// A recognized session boundary marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBoundary {
    pub edge: BoundaryEdge,
    /// Job id following the marker (`#42`), when the log format carries one.
    pub job_id: Option<String>,
}

/// A classified line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Fragments(Vec<MetricFragment>),
    Boundary(SessionBoundary),
}

/// Backup component whose log is being read, inferred from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    BackupServer,
    Proxy,
    Repository,
    WanAccelerator,
    Unknown,
}

impl Component {
    /// Guess the component from the file name. Unknown is fine — it only
    /// costs the priority rotation, never a missed pattern.
    pub fn infer(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.contains("wan") {
            Component::WanAccelerator
        } else if name.contains("proxy") {
            Component::Proxy
        } else if name.contains("repo") {
            Component::Repository
        } else if name.contains("vbr") || name.contains("backup") || name.contains("job") {
            Component::BackupServer
        } else {
            Component::Unknown
        }
    }

    /// Pattern order for this component: its home pattern first, the rest in
    /// registry order. Every pattern is always tried.
    pub fn priority(self) -> [PatternId; 4] {
        match self {
            Component::WanAccelerator => [
                PatternId::WanCacheHit,
                PatternId::Transfer,
                PatternId::NetworkBottleneck,
                PatternId::Retries,
            ],
            Component::Repository => [
                PatternId::Transfer,
                PatternId::Retries,
                PatternId::NetworkBottleneck,
                PatternId::WanCacheHit,
            ],
            Component::Proxy => [
                PatternId::Transfer,
                PatternId::NetworkBottleneck,
                PatternId::Retries,
                PatternId::WanCacheHit,
            ],
            Component::BackupServer | Component::Unknown => patterns::DEFAULT_PRIORITY,
        }
    }
}

/// Timestamp prefix: 19-26 chars of digits and date/time punctuation,
/// followed by whitespace. Covers `2024-03-01 10:15:42.123` and the
/// dotted `01.03.2024 10:15:42` form.
static TS_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<ts>[0-9:.\-\s]{19,26})\s+").unwrap());

static BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bjob(?:\s+session)?\s+(?P<edge>started|finished)\b(?:\s*#(?P<id>[A-Za-z0-9_.-]+))?")
        .unwrap()
});

const TS_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S",
];

/// Split an optional timestamp prefix off a raw line. Returns the parsed
/// timestamp (None when absent or unparseable) and the message remainder.
pub fn strip_timestamp(raw: &str) -> (Option<NaiveDateTime>, &str) {
    let Some(m) = TS_PREFIX.find(raw) else {
        return (None, raw);
    };
    let ts_text = raw[..m.end()].trim();
    let ts = TS_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(ts_text, fmt).ok());
    (ts, &raw[m.end()..])
}

/// Classify one raw line (no trailing newline).
///
/// First matching pattern wins. A pattern that matches but fails validation
/// stops classification for the line and surfaces `MalformedMetric`, keeping
/// behavior deterministic for lines that would match more than one pattern.
pub fn classify(
    raw: &str,
    source_line: usize,
    component: Component,
) -> Result<Option<LineEvent>, MalformedMetric> {
    let (timestamp, msg) = strip_timestamp(raw);

    if let Some(caps) = BOUNDARY.captures(msg) {
        let edge = if caps["edge"].eq_ignore_ascii_case("started") {
            BoundaryEdge::Start
        } else {
            BoundaryEdge::Finish
        };
        let job_id = caps.name("id").map(|m| m.as_str().to_string());
        return Ok(Some(LineEvent::Boundary(SessionBoundary { edge, job_id })));
    }

    for pattern in component.priority() {
        if let Some(values) = pattern.try_extract(msg)? {
            let fragments = values
                .into_iter()
                .map(|(kind, value)| MetricFragment {
                    kind,
                    value,
                    source_line,
                    timestamp,
                })
                .collect();
            return Ok(Some(LineEvent::Fragments(fragments)));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn strips_iso_timestamp_prefix() {
        let (ts, msg) = strip_timestamp("2024-03-01 10:15:42 Transferred: 1.0 GB in 00:01:00");
        assert_eq!(ts, Some(at(10, 15, 42)));
        assert_eq!(msg, "Transferred: 1.0 GB in 00:01:00");
    }

    #[test]
    fn strips_fractional_and_dotted_timestamps() {
        let (ts, msg) = strip_timestamp("2024-03-01 10:15:42.123 Bottleneck: Network: 5%");
        assert_eq!(
            ts,
            Some(at(10, 15, 42) + chrono::Duration::milliseconds(123))
        );
        assert_eq!(msg, "Bottleneck: Network: 5%");

        let (ts, _) = strip_timestamp("01.03.2024 10:15:42 retries: 2");
        assert_eq!(ts, Some(at(10, 15, 42)));
    }

    #[test]
    fn line_without_prefix_passes_through() {
        let (ts, msg) = strip_timestamp("Job started #42");
        assert_eq!(ts, None);
        assert_eq!(msg, "Job started #42");
    }

    #[test]
    fn boundary_start_with_id() {
        let event = classify("Job started #42", 1, Component::Unknown).unwrap();
        assert_eq!(
            event,
            Some(LineEvent::Boundary(SessionBoundary {
                edge: BoundaryEdge::Start,
                job_id: Some("42".to_string()),
            }))
        );
    }

    #[test]
    fn boundary_finish_and_case_insensitive() {
        let event = classify("JOB FINISHED #backup-nightly", 9, Component::Unknown).unwrap();
        assert_eq!(
            event,
            Some(LineEvent::Boundary(SessionBoundary {
                edge: BoundaryEdge::Finish,
                job_id: Some("backup-nightly".to_string()),
            }))
        );
    }

    #[test]
    fn boundary_without_id() {
        let event = classify("Job session started", 3, Component::Unknown).unwrap();
        assert_eq!(
            event,
            Some(LineEvent::Boundary(SessionBoundary {
                edge: BoundaryEdge::Start,
                job_id: None,
            }))
        );
    }

    #[test]
    fn fragments_carry_line_and_timestamp() {
        let event = classify(
            "2024-03-01 10:15:42 Transferred: 2.50 GB in 00:02:05",
            17,
            Component::Unknown,
        )
        .unwrap();
        let Some(LineEvent::Fragments(frags)) = event else {
            panic!("expected fragments, got {event:?}");
        };
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].kind, MetricKind::TransferSize);
        assert_eq!(frags[0].value, MetricValue::Bytes(2_684_354_560));
        assert_eq!(frags[0].source_line, 17);
        assert_eq!(frags[0].timestamp, Some(at(10, 15, 42)));
        assert_eq!(frags[1].kind, MetricKind::TransferDuration);
        assert_eq!(frags[1].value, MetricValue::Seconds(125));
    }

    #[test]
    fn unrecognized_line_yields_nothing() {
        let event = classify("VM processing started", 5, Component::Unknown).unwrap();
        assert_eq!(event, None);
    }

    #[test]
    fn malformed_value_surfaces_per_line() {
        let err = classify("Bottleneck: Network: 250%", 8, Component::Unknown).unwrap_err();
        assert_eq!(err.pattern, "network bottleneck");
    }

    #[test]
    fn component_rotation_changes_tie_break() {
        // A contrived line matching both the WAN hit and retries patterns.
        let line = "WAN Accelerator cache hit: 90% after retries: 2";

        let unknown = classify(line, 1, Component::Unknown).unwrap().unwrap();
        let LineEvent::Fragments(frags) = unknown else {
            panic!("expected fragments");
        };
        assert_eq!(frags[0].kind, MetricKind::WanCacheHitPct);

        let repo = classify(line, 1, Component::Repository).unwrap().unwrap();
        let LineEvent::Fragments(frags) = repo else {
            panic!("expected fragments");
        };
        assert_eq!(frags[0].kind, MetricKind::RetryCount);
    }

    #[test]
    fn component_inference_from_file_names() {
        let cases = [
            ("Agent.WanAccelerator.log", Component::WanAccelerator),
            ("vbr-proxy-01.log", Component::Proxy),
            ("repository_task.log", Component::Repository),
            ("Backup.Job.Nightly.log", Component::BackupServer),
            ("svc.log", Component::Unknown),
        ];
        for (name, expected) in cases {
            assert_eq!(Component::infer(Path::new(name)), expected, "name: {name}");
        }
    }

    #[test]
    fn every_component_priority_covers_all_patterns() {
        for component in [
            Component::BackupServer,
            Component::Proxy,
            Component::Repository,
            Component::WanAccelerator,
            Component::Unknown,
        ] {
            let priority = component.priority();
            for id in patterns::DEFAULT_PRIORITY {
                assert!(priority.contains(&id), "{component:?} missing {id:?}");
            }
        }
    }
}
