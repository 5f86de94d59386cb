//! File segment manager
//!
//! Owns the single open segment: naming, header, row writes, rotation and
//! close. Segment names follow `<base>_<YYYY-MM-DD_HH-MM-SS>[_<NNN>].<ext>`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime};
use contracts::{RotationPolicy, RotationReason, TelemetrySource, VariableSpec};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::clock::{wall_clock_now, TimestampAnchor};
use crate::csv::{header_line, render_row, RenderedRow};
use crate::error::{RecorderError, Result};

/// Session timestamp format used in segment names
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Upper bound on name-collision retries for one segment
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Decide whether the open segment must rotate
///
/// Size is checked before duration; at most one reason is returned per check.
pub fn evaluate(
    policy: &RotationPolicy,
    size_bytes: u64,
    elapsed: Duration,
) -> Option<RotationReason> {
    if policy.size_limit_bytes().is_some_and(|limit| size_bytes >= limit) {
        return Some(RotationReason::Size);
    }
    if policy.duration_limit().is_some_and(|limit| elapsed >= limit) {
        return Some(RotationReason::Duration);
    }
    None
}

/// One recording episode, possibly spanning several segments
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Wall-clock start, formatted for file names
    pub timestamp: String,
    /// Number of the open segment (starts at 1)
    pub file_number: u32,
    /// Whether this session has rotated at least once
    pub has_rotated: bool,
    /// Segments opened by this session
    pub segments: u32,
    /// Device clock binding, set at the first row
    pub anchor: Option<TimestampAnchor>,
}

/// An open segment file
#[derive(Debug)]
pub struct FileSegment {
    path: PathBuf,
    writer: BufWriter<File>,
    opened_at: Instant,
    created_at: DateTime<Local>,
    bytes_written: u64,
    rows: u64,
}

impl FileSegment {
    fn create(path: PathBuf) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            opened_at: Instant::now(),
            created_at: Local::now(),
            bytes_written: 0,
            rows: 0,
        })
    }

    /// Write one line and flush it to the file
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        self.bytes_written += line.len() as u64;
        Ok(())
    }

    fn close(self) -> io::Result<ClosedSegment> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(ClosedSegment {
            path: self.path,
            rows: self.rows,
            bytes: self.bytes_written,
        })
    }

    /// Segment path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far, header included (equals the on-disk size)
    pub fn size_bytes(&self) -> u64 {
        self.bytes_written
    }

    /// Data rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Time since the segment was opened
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Wall-clock creation time
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// Summary of a closed segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSegment {
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
}

/// Summary of a closed session
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedSession {
    pub session: Session,
    pub last_segment: ClosedSegment,
}

/// Row written by [`SegmentManager::write_row`]
#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub bytes: usize,
    pub placeholders: Vec<(String, usize)>,
}

/// File segment manager
#[derive(Debug)]
pub struct SegmentManager {
    /// Output template, e.g. `data/robot_data.csv`
    template: PathBuf,
    policy: RotationPolicy,
    variables: Vec<VariableSpec>,
    header: String,
    session: Option<Session>,
    segment: Option<FileSegment>,
    /// Set once any session has opened a segment
    has_recorded_before: bool,
    /// Every segment path opened so far, in order
    opened: Vec<PathBuf>,
}

impl SegmentManager {
    /// Create a manager for an output template
    pub fn new(template: impl Into<PathBuf>, policy: RotationPolicy, variables: Vec<VariableSpec>) -> Self {
        let header = header_line(&variables);
        Self {
            template: template.into(),
            policy,
            variables,
            header,
            session: None,
            segment: None,
            has_recorded_before: false,
            opened: Vec::new(),
        }
    }

    /// Recorded variables, in column order
    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// Rotation policy
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Current session
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Open segment
    pub fn segment(&self) -> Option<&FileSegment> {
        self.segment.as_ref()
    }

    /// Whether a segment is open
    pub fn is_open(&self) -> bool {
        self.segment.is_some()
    }

    /// Whether any session has recorded before
    pub fn has_recorded_before(&self) -> bool {
        self.has_recorded_before
    }

    /// Every segment path opened so far
    pub fn opened_segments(&self) -> &[PathBuf] {
        &self.opened
    }

    /// Segment path for a session timestamp and counter
    pub fn segment_path(&self, timestamp: &str, file_number: u32, suffixed: bool) -> PathBuf {
        let stem = self
            .template
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("robot_data");
        let ext = self
            .template
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("csv");

        let name = if suffixed {
            format!("{stem}_{timestamp}_{file_number:03}.{ext}")
        } else {
            format!("{stem}_{timestamp}.{ext}")
        };

        match self.template.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Whether the next segment name needs the counter suffix
    fn needs_suffix(&self, file_number: u32) -> bool {
        file_number > 1 || self.policy.is_active() || self.has_recorded_before
    }

    /// Start a new session and open its first segment
    ///
    /// Any segment still open is closed first.
    #[instrument(name = "segment_open_session", skip(self), fields(template = %self.template.display()))]
    pub fn open_session(&mut self, now: DateTime<Local>) -> Result<&Session> {
        if self.is_open() {
            warn!("Opening a session while a segment is open; closing it first");
            self.close_session()?;
        }

        let mut session = Session {
            timestamp: now.format(SESSION_TIMESTAMP_FORMAT).to_string(),
            file_number: 1,
            has_rotated: false,
            segments: 0,
            anchor: None,
        };
        let segment = self.open_segment(&mut session)?;
        self.has_recorded_before = true;

        info!(
            session = %session.timestamp,
            path = %segment.path.display(),
            "Session started"
        );
        self.segment = Some(segment);
        Ok(&*self.session.insert(session))
    }

    /// Create the segment file for `session.file_number` and write its header
    ///
    /// An existing file is never truncated: on a name collision the counter
    /// advances until a free name is found.
    fn open_segment(&mut self, session: &mut Session) -> Result<FileSegment> {
        let mut suffixed = self.needs_suffix(session.file_number);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.segment_path(&session.timestamp, session.file_number, suffixed);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|source| RecorderError::SegmentOpen {
                    path: path.clone(),
                    source,
                })?;
            }

            match FileSegment::create(path.clone()) {
                Ok(mut segment) => {
                    segment
                        .write_line(&self.header)
                        .map_err(|source| RecorderError::SegmentOpen {
                            path: path.clone(),
                            source,
                        })?;
                    debug!(path = %path.display(), columns = self.header.split(',').count(), "Segment opened");
                    self.opened.push(path);
                    session.segments += 1;
                    return Ok(segment);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "Segment name taken");
                    if suffixed {
                        session.file_number += 1;
                    } else {
                        suffixed = true;
                    }
                }
                Err(source) => return Err(RecorderError::SegmentOpen { path, source }),
            }
        }

        let path = self.segment_path(&session.timestamp, session.file_number, true);
        Err(RecorderError::SegmentOpen {
            path,
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free segment name"),
        })
    }

    /// Rotation trigger for the open segment, if any
    pub fn rotation_due(&self) -> Option<RotationReason> {
        let segment = self.segment.as_ref()?;
        evaluate(&self.policy, segment.size_bytes(), segment.elapsed())
    }

    /// Close the open segment and open the next one of the same session
    ///
    /// The session anchor is kept.
    #[instrument(name = "segment_rotate", skip(self))]
    pub fn rotate(&mut self, reason: RotationReason) -> Result<&Session> {
        let closed = self.close_segment()?;
        let Some(mut session) = self.session.take() else {
            return Err(RecorderError::SegmentOpen {
                path: closed.map(|c| c.path).unwrap_or_default(),
                source: io::Error::new(io::ErrorKind::NotFound, "no active session"),
            });
        };

        session.file_number += 1;
        session.has_rotated = true;
        let segment = match self.open_segment(&mut session) {
            Ok(segment) => segment,
            Err(e) => {
                self.session = Some(session);
                return Err(e);
            }
        };

        info!(
            session = %session.timestamp,
            %reason,
            file_number = session.file_number,
            path = %segment.path.display(),
            "Segment rotated"
        );
        self.segment = Some(segment);
        Ok(&*self.session.insert(session))
    }

    /// Render and write one row from `source`
    ///
    /// Anchors the session on its first row.
    pub fn write_row<S: TelemetrySource>(&mut self, source: &mut S) -> Result<RowOutcome> {
        let (Some(session), Some(segment)) = (self.session.as_mut(), self.segment.as_mut()) else {
            return Err(RecorderError::SegmentWrite {
                path: PathBuf::new(),
                source: io::Error::new(io::ErrorKind::NotFound, "no open segment"),
            });
        };

        if session.anchor.is_none() {
            match source.timestamp() {
                Ok(device_ts) => {
                    let anchor = TimestampAnchor::anchor(device_ts, wall_clock_now());
                    debug!(
                        session = %session.timestamp,
                        device_ts,
                        offset = anchor.offset,
                        "Session anchored"
                    );
                    session.anchor = Some(anchor);
                }
                Err(e) => debug!(error = %e, "Device clock unavailable; anchor deferred"),
            }
        }

        let RenderedRow { line, placeholders } =
            render_row(source, &self.variables, session.anchor.as_ref());
        segment
            .write_line(&line)
            .map_err(|source| RecorderError::SegmentWrite {
                path: segment.path.clone(),
                source,
            })?;
        segment.rows += 1;

        Ok(RowOutcome {
            bytes: line.len(),
            placeholders,
        })
    }

    /// Close the open segment and end the session
    #[instrument(name = "segment_close_session", skip(self))]
    pub fn close_session(&mut self) -> Result<Option<ClosedSession>> {
        let closed = self.close_segment();
        let session = self.session.take();
        match (closed?, session) {
            (Some(last_segment), Some(session)) => {
                info!(
                    session = %session.timestamp,
                    segments = session.segments,
                    rows = last_segment.rows,
                    path = %last_segment.path.display(),
                    "Session closed"
                );
                Ok(Some(ClosedSession {
                    session,
                    last_segment,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Drop the session after a failure, closing the segment if possible
    pub fn abandon_session(&mut self) {
        if let Err(e) = self.close_segment() {
            warn!(error = %e, "Failed segment could not be closed cleanly");
        }
        self.session = None;
    }

    /// Reopen the open segment read-only so every later write fails
    #[cfg(test)]
    pub(crate) fn make_segment_read_only(&mut self) -> io::Result<()> {
        if let Some(segment) = self.segment.as_mut() {
            segment.writer = BufWriter::new(File::open(&segment.path)?);
        }
        Ok(())
    }

    fn close_segment(&mut self) -> Result<Option<ClosedSegment>> {
        let Some(segment) = self.segment.take() else {
            return Ok(None);
        };
        let path = segment.path.clone();
        let closed = segment
            .close()
            .map_err(|source| RecorderError::SegmentClose { path, source })?;
        debug!(path = %closed.path.display(), rows = closed.rows, bytes = closed.bytes, "Segment closed");
        Ok(Some(closed))
    }
}

/// Parsed segment file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentName {
    /// Template stem, e.g. `robot_data`
    pub base: String,
    /// Session timestamp as written in the name
    pub session: String,
    /// Segment counter (None for an unsuffixed first segment)
    pub segment: Option<u32>,
    /// File extension
    pub extension: String,
}

impl SegmentName {
    /// Parse `<base>_<YYYY-MM-DD_HH-MM-SS>[_<NNN>].<ext>`
    pub fn parse(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let extension = path.extension()?.to_str()?.to_string();

        let (rest, segment) = match stem.rsplit_once('_') {
            Some((head, tail)) if tail.len() >= 3 && tail.bytes().all(|b| b.is_ascii_digit()) => {
                (head, Some(tail.parse().ok()?))
            }
            _ => (stem, None),
        };

        // "_" + 19-char timestamp
        let split = rest.len().checked_sub(20)?;
        if !rest.is_char_boundary(split) {
            return None;
        }
        let (base, stamp) = rest.split_at(split);
        let stamp = stamp.strip_prefix('_')?;
        NaiveDateTime::parse_from_str(stamp, SESSION_TIMESTAMP_FORMAT).ok()?;
        if base.is_empty() {
            return None;
        }

        Some(Self {
            base: base.to_string(),
            session: stamp.to_string(),
            segment,
            extension,
        })
    }

    /// Session start time
    pub fn session_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.session, SESSION_TIMESTAMP_FORMAT).ok()
    }
}
