// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step output capture: draining a container's stdout/stderr into the
//! job log, and — for whichever stream the step's `PipeMode` selects —
//! collecting the lines that become the next step's stdin.
//!
//! Grounded on `job/manager.go`'s `capture` function: every line read from
//! either stream is appended to the job's log regardless of pipe mode, but
//! only the selected stream's lines (filtered through the delimiter state
//! machine, when one is configured) are folded into the carried step
//! output.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use dray_core::{JobId, JobStep};
use dray_storage::Repository;

/// Delimited capture is a three-state machine: lines before the begin
/// delimiter are dropped, lines between begin and end are kept, lines after
/// the end delimiter are dropped. A second begin delimiter seen while
/// capturing is ordinary content — it isn't a new boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelimState {
    BeforeBegin,
    Capturing,
    AfterEnd,
}

/// Decides which log lines feed the carried step output.
pub(crate) enum LineFilter {
    /// No delimiters configured: every line on the selected stream counts.
    Always,
    Delimited {
        state: DelimState,
        begin: String,
        end: String,
    },
}

impl LineFilter {
    pub(crate) fn new(step: &JobStep) -> Self {
        if step.uses_delimited_output() {
            LineFilter::Delimited {
                state: DelimState::BeforeBegin,
                begin: step.begin_delimiter.clone(),
                end: step.end_delimiter.clone(),
            }
        } else {
            LineFilter::Always
        }
    }

    fn accept(&mut self, line: &str) -> bool {
        match self {
            LineFilter::Always => true,
            LineFilter::Delimited { state, begin, end } => match state {
                DelimState::BeforeBegin => {
                    if line == begin {
                        *state = DelimState::Capturing;
                    }
                    false
                }
                DelimState::Capturing => {
                    if line == end {
                        *state = DelimState::AfterEnd;
                        false
                    } else {
                        true
                    }
                }
                DelimState::AfterEnd => false,
            },
        }
    }
}

/// Drain one stream line-by-line until EOF (or a read error, treated the
/// same as EOF — a broken pipe means the container is gone, not that the
/// step failed). Every line is appended to the job's log; lines accepted by
/// `sink`'s filter, when present, are folded into its shared buffer.
pub(crate) async fn run_capture<R>(
    reader: R,
    repository: Arc<dyn Repository>,
    job_id: JobId,
    mut sink: Option<(Arc<Mutex<Vec<u8>>>, LineFilter)>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(%job_id, %error, "capture stream ended on a read error");
                break;
            }
        };

        if let Err(error) = repository.append_log_line(&job_id, line.clone()).await {
            tracing::warn!(%job_id, %error, "failed to append log line");
        }

        if let Some((buffer, filter)) = sink.as_mut() {
            if filter.accept(&line) {
                let mut buffer = buffer.lock();
                buffer.extend_from_slice(line.as_bytes());
                buffer.push(b'\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(begin: &str, end: &str) -> JobStep {
        JobStep {
            begin_delimiter: begin.to_string(),
            end_delimiter: end.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn undelimited_filter_accepts_everything() {
        let mut filter = LineFilter::new(&step("", ""));
        assert!(filter.accept("anything"));
        assert!(filter.accept("anything else"));
    }

    #[test]
    fn delimited_filter_drops_outside_the_markers() {
        let mut filter = LineFilter::new(&step("BEGIN", "END"));
        assert!(!filter.accept("before"));
        assert!(!filter.accept("BEGIN"));
        assert!(filter.accept("kept"));
        assert!(!filter.accept("END"));
        assert!(!filter.accept("after"));
    }

    #[test]
    fn second_begin_marker_while_capturing_is_content() {
        let mut filter = LineFilter::new(&step("BEGIN", "END"));
        assert!(!filter.accept("BEGIN"));
        assert!(filter.accept("BEGIN"));
        assert!(!filter.accept("END"));
    }

    #[test]
    fn unterminated_capture_never_closes() {
        let mut filter = LineFilter::new(&step("BEGIN", "END"));
        assert!(!filter.accept("BEGIN"));
        assert!(filter.accept("a"));
        assert!(filter.accept("b"));
    }
}
