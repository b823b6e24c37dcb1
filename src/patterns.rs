/// Metric pattern registry: the fixed set of metric shapes this tool can
/// recognize in backup component logs.
///
/// Each pattern pairs a compiled regex with an extractor that produces typed,
/// normalized values:
/// - `Transfer` — byte count + duration (`Transferred: 2.50 GB in 00:02:05`,
///   or the long job-summary form with `Duration: 00:02:05`)
/// - `NetworkBottleneck` — `Bottleneck: Network: 17%`
/// - `WanCacheHit` — `WAN Accelerator ... cache hit: 82%`
/// - `Retries` — `retries: 3`
///
/// Label matching is case-insensitive and whitespace-tolerant. Unit suffixes
/// are normalized to uppercase before lookup, so `gb` is accepted and treated
/// as `GB`. Lines matching no pattern are the expected majority and produce
/// nothing.
use regex::Regex;
use std::sync::LazyLock;

/// Closed set of metric kinds. Extending it means adding a pattern and a kind
/// together — the extractors below are the only producers of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    TransferSize,
    TransferDuration,
    NetworkBottleneckPct,
    WanCacheHitPct,
    RetryCount,
}

impl MetricKind {
    /// All kinds, in report column order.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::TransferSize,
        MetricKind::TransferDuration,
        MetricKind::NetworkBottleneckPct,
        MetricKind::WanCacheHitPct,
        MetricKind::RetryCount,
    ];

    /// CSV column header for this kind.
    pub fn column(self) -> &'static str {
        match self {
            MetricKind::TransferSize => "TransferSize(bytes)",
            MetricKind::TransferDuration => "TransferDuration(s)",
            MetricKind::NetworkBottleneckPct => "NetworkBottleneckPct",
            MetricKind::WanCacheHitPct => "WanCacheHitPct",
            MetricKind::RetryCount => "RetryCount",
        }
    }
}

/// A normalized metric value. The variant is fixed by the kind that produced
/// it: sizes are bytes, durations are seconds, ratios are percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Bytes(u64),
    Seconds(u64),
    Percent(f64),
    Count(u64),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Bytes(b) => write!(f, "{b}"),
            MetricValue::Seconds(s) => write!(f, "{s}"),
            // f64 Display is the shortest string that parses back to the
            // same value, so `17` round-trips as 17.0 and `82.5` as 82.5.
            MetricValue::Percent(p) => write!(f, "{p}"),
            MetricValue::Count(c) => write!(f, "{c}"),
        }
    }
}

/// A matched pattern's captured value failed numeric or range validation.
/// Scoped to one line: the caller skips the fragment and keeps scanning.
#[derive(Debug)]
pub struct MalformedMetric {
    pub pattern: &'static str,
    pub detail: String,
}

impl std::fmt::Display for MalformedMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed {} value: {}", self.pattern, self.detail)
    }
}

impl std::error::Error for MalformedMetric {}

static TRANSFER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)transfer(?:red)?:\s*(?P<num>\d+(?:\.\d+)?)\s*(?P<unit>[KMGT]B)\b.*?(?:\bin\b|duration:)\s*(?P<dur>\d{2}:\d{2}:\d{2})",
    )
    .unwrap()
});

static BOTTLENECK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bottleneck:\s*network\b:?\s*(?P<pct>\d{1,3}(?:\.\d+)?)\s*%").unwrap()
});

static WAN_HIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)wan\s+accelerator.*?(?:cache\s+)?hit(?:\s+ratio)?\s*[:=]?\s*(?P<pct>\d{1,3}(?:\.\d+)?)\s*%",
    )
    .unwrap()
});

static RETRIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bretr(?:y|ies)(?:\s+(?:count|attempts))?\s*[:=]?\s*(?P<n>-?\d+)\b").unwrap()
});

/// Identity of a pattern in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Transfer,
    NetworkBottleneck,
    WanCacheHit,
    Retries,
}

/// Default pattern priority. Classification tries patterns in a fixed order
/// and stops at the first match, so a line matching several patterns still
/// classifies deterministically.
pub const DEFAULT_PRIORITY: [PatternId; 4] = [
    PatternId::Transfer,
    PatternId::NetworkBottleneck,
    PatternId::WanCacheHit,
    PatternId::Retries,
];

impl PatternId {
    pub fn name(self) -> &'static str {
        match self {
            PatternId::Transfer => "transfer",
            PatternId::NetworkBottleneck => "network bottleneck",
            PatternId::WanCacheHit => "WAN cache hit",
            PatternId::Retries => "retries",
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            PatternId::Transfer => &TRANSFER,
            PatternId::NetworkBottleneck => &BOTTLENECK,
            PatternId::WanCacheHit => &WAN_HIT,
            PatternId::Retries => &RETRIES,
        }
    }

    /// Try this pattern against a line (timestamp prefix already stripped).
    ///
    /// `Ok(None)` — no match. `Ok(Some(values))` — matched; the transfer
    /// pattern is the one case that yields two values (size + duration) from
    /// a single line. `Err` — matched, but the captured value failed
    /// validation; the line is skipped, not the file.
    pub fn try_extract(
        self,
        msg: &str,
    ) -> Result<Option<Vec<(MetricKind, MetricValue)>>, MalformedMetric> {
        let Some(caps) = self.regex().captures(msg) else {
            return Ok(None);
        };

        match self {
            PatternId::Transfer => {
                let num: f64 = caps["num"].parse().map_err(|_| self.malformed(&caps["num"]))?;
                let bytes = size_to_bytes(num, &caps["unit"])
                    .ok_or_else(|| self.malformed(&caps["num"]))?;
                let secs = duration_secs(&caps["dur"]);
                Ok(Some(vec![
                    (MetricKind::TransferSize, MetricValue::Bytes(bytes)),
                    (MetricKind::TransferDuration, MetricValue::Seconds(secs)),
                ]))
            }
            PatternId::NetworkBottleneck => {
                let pct = self.percent(&caps["pct"])?;
                Ok(Some(vec![(
                    MetricKind::NetworkBottleneckPct,
                    MetricValue::Percent(pct),
                )]))
            }
            PatternId::WanCacheHit => {
                let pct = self.percent(&caps["pct"])?;
                Ok(Some(vec![(
                    MetricKind::WanCacheHitPct,
                    MetricValue::Percent(pct),
                )]))
            }
            PatternId::Retries => {
                let n: i64 = caps["n"].parse().map_err(|_| self.malformed(&caps["n"]))?;
                if n < 0 {
                    return Err(MalformedMetric {
                        pattern: self.name(),
                        detail: format!("negative count {n}"),
                    });
                }
                Ok(Some(vec![(
                    MetricKind::RetryCount,
                    MetricValue::Count(n as u64),
                )]))
            }
        }
    }

    /// Whether this pattern's regex matches at all, ignoring validation.
    /// Used by `validate` to echo candidate lines.
    pub fn matches(self, msg: &str) -> bool {
        self.regex().is_match(msg)
    }

    /// Shared percentage parsing: float, range-checked to [0, 100].
    fn percent(self, raw: &str) -> Result<f64, MalformedMetric> {
        let pct: f64 = raw.parse().map_err(|_| self.malformed(raw))?;
        if !(0.0..=100.0).contains(&pct) {
            return Err(MalformedMetric {
                pattern: self.name(),
                detail: format!("percentage {pct} outside 0..=100"),
            });
        }
        Ok(pct)
    }

    fn malformed(self, raw: &str) -> MalformedMetric {
        MalformedMetric {
            pattern: self.name(),
            detail: format!("cannot parse {raw:?}"),
        }
    }
}

/// Whether any registered pattern matches the line.
pub fn matches_any(msg: &str) -> bool {
    DEFAULT_PRIORITY.iter().any(|p| p.matches(msg))
}

/// Convert `num` with a KB/MB/GB/TB suffix to bytes. The suffix is
/// normalized to uppercase before lookup. Fractional sizes truncate,
/// matching how sizes are reported back by the report consumers.
fn size_to_bytes(num: f64, unit: &str) -> Option<u64> {
    let mult: u64 = match unit.to_ascii_uppercase().as_str() {
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        "TB" => 1 << 40,
        _ => return None,
    };
    if !num.is_finite() || num < 0.0 {
        return None;
    }
    Some((num * mult as f64) as u64)
}

/// `HH:MM:SS` to seconds. The capture group guarantees digit groups, so a
/// failed part parses as zero rather than panicking.
fn duration_secs(hms: &str) -> u64 {
    hms.split(':')
        .fold(0u64, |acc, part| acc * 60 + part.parse::<u64>().unwrap_or(0))
}
