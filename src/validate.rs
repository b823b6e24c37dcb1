/// Handle `netperf-scan validate`: echo lines that match a known metric
/// pattern, so pattern coverage can be checked against real sample logs
/// before a scan.
use crate::classify::strip_timestamp;
use crate::config::NetperfConfig;
use crate::discover::{discover_logs, DiscoverError};
use crate::patterns;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Print up to `limit` matching raw lines. Returns how many were shown.
pub fn handle_validate(
    input: &Path,
    limit: usize,
    config: &NetperfConfig,
) -> Result<usize, DiscoverError> {
    let files = discover_logs(input, &config.scan.log_pattern)?;

    let mut shown = 0;
    'files: for path in &files {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "skipping unreadable log file");
                continue;
            }
        };

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "read failed, abandoning file");
                    break;
                }
            }
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim_end_matches(['\n', '\r']);
            let (_, msg) = strip_timestamp(line);
            if patterns::matches_any(msg) {
                println!("{line}");
                shown += 1;
                if shown >= limit {
                    break 'files;
                }
            }
        }
    }

    if shown == 0 {
        println!("No recognizable lines found. Share a few sample lines to tune the patterns.");
    }
    Ok(shown)
}
