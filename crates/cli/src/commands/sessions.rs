//! `sessions` command implementation.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use recorder::SegmentName;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::SessionsArgs;
use crate::error::CliError;

/// One recorded session
#[derive(Debug, Serialize)]
struct SessionInfo {
    base: String,
    session: String,
    segments: Vec<SegmentInfo>,
    rows: u64,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct SegmentInfo {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<u32>,
    rows: u64,
    bytes: u64,
}

/// Execute the `sessions` command
pub fn run_sessions(args: &SessionsArgs) -> Result<()> {
    info!(dir = %args.dir.display(), "Scanning for recorded sessions");

    if !args.dir.is_dir() {
        return Err(CliError::not_a_directory(&args.dir).into());
    }

    let sessions = scan_sessions(&args.dir)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&sessions).context("Failed to serialize sessions")?;
        println!("{}", json);
    } else {
        print_sessions(&args.dir, &sessions);
    }

    Ok(())
}

/// Group segment files by (base, session timestamp)
fn scan_sessions(dir: &Path) -> Result<Vec<SessionInfo>> {
    let mut grouped: BTreeMap<(String, String), Vec<(SegmentName, PathBuf)>> = BTreeMap::new();

    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match SegmentName::parse(&path) {
            Some(name) => grouped
                .entry((name.base.clone(), name.session.clone()))
                .or_default()
                .push((name, path)),
            None => debug!(path = %path.display(), "Not a segment file"),
        }
    }

    let mut sessions = Vec::with_capacity(grouped.len());
    for ((base, session), mut files) in grouped {
        files.sort_by_key(|(name, _)| name.segment.unwrap_or(0));

        let mut segments = Vec::with_capacity(files.len());
        for (name, path) in files {
            let bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            let rows = count_rows(&path);
            segments.push(SegmentInfo {
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                number: name.segment,
                rows,
                bytes,
            });
        }

        sessions.push(SessionInfo {
            rows: segments.iter().map(|s| s.rows).sum(),
            bytes: segments.iter().map(|s| s.bytes).sum(),
            base,
            session,
            segments,
        });
    }

    Ok(sessions)
}

/// Data rows in a segment (lines after the header)
fn count_rows(path: &Path) -> u64 {
    match fs::File::open(path) {
        Ok(file) => {
            let lines = BufReader::new(file).lines().map_while(Result::ok).count() as u64;
            lines.saturating_sub(1)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read segment");
            0
        }
    }
}

fn print_sessions(dir: &Path, sessions: &[SessionInfo]) {
    if sessions.is_empty() {
        println!("No recorded sessions in {}", dir.display());
        return;
    }

    println!("\n=== Recorded Sessions in {} ===\n", dir.display());
    for session in sessions {
        println!(
            "{} [{}] - {} segment(s), {} rows, {} bytes",
            session.session,
            session.base,
            session.segments.len(),
            session.rows,
            session.bytes
        );
        for segment in &session.segments {
            println!(
                "   ├─ {} ({} rows, {} bytes)",
                segment.file, segment.rows, segment.bytes
            );
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_groups_segments_by_session() {
        let dir = tempdir().unwrap();
        let write = |name: &str, content: &str| fs::write(dir.path().join(name), content).unwrap();

        write("robot_data_2025-03-14_09-26-53_002.csv", "payload\n3.000000\n");
        write("robot_data_2025-03-14_09-26-53_001.csv", "payload\n1.000000\n2.000000\n");
        write("robot_data_2025-03-14_10-00-00.csv", "payload\n");
        write("notes.txt", "not a segment\n");

        let sessions = scan_sessions(dir.path()).unwrap();
        assert_eq!(sessions.len(), 2);

        let first = &sessions[0];
        assert_eq!(first.session, "2025-03-14_09-26-53");
        assert_eq!(first.segments.len(), 2);
        assert_eq!(first.segments[0].number, Some(1));
        assert_eq!(first.rows, 3);

        let second = &sessions[1];
        assert_eq!(second.segments[0].number, None);
        assert_eq!(second.rows, 0);
    }
}
