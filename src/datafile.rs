//! Parsing of recorded data files
//!
//! Inverse of the writer in [`crate::recorder`]: reads the header, the event
//! mode declaration, and one or more `Session Start`/`Session End` blocks
//! back into [`SessionData`] values. Tolerates blank lines and ignores
//! `Recording`-prefixed header lines. Malformed rows fail with the offending
//! line number.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::GazeError;
use crate::types::{ConvertedRecord, EventMode, SessionData, SessionEvent};

/// Block parser state within a session
#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockState {
    None,
    GazeRows,
    EventRows,
}

fn parse_f64(field: &str, line: usize) -> Result<f64, GazeError> {
    field.parse::<f64>().map_err(|_| GazeError::DataFormat {
        line,
        message: format!("expected a number, found {:?}", field),
    })
}

fn parse_gaze_row(fields: &[&str], line: usize) -> Result<ConvertedRecord, GazeError> {
    Ok(ConvertedRecord {
        time_ms: parse_f64(fields[0], line)?,
        left_x: parse_f64(fields[1], line)?,
        left_y: parse_f64(fields[2], line)?,
        left_pupil: parse_f64(fields[3], line)?,
        left_valid: parse_f64(fields[4], line)? as u8,
        right_x: parse_f64(fields[5], line)?,
        right_y: parse_f64(fields[6], line)?,
        right_pupil: parse_f64(fields[7], line)?,
        right_valid: parse_f64(fields[8], line)? as u8,
        avg_x: parse_f64(fields[9], line)?,
        avg_y: parse_f64(fields[10], line)?,
    })
}

/// Parse a recorded data file into its sessions.
pub fn load_sessions<R: Read>(reader: R) -> Result<Vec<SessionData>, GazeError> {
    let reader = BufReader::new(reader);
    let mut sessions = Vec::new();
    let mut current = SessionData::default();
    let mut mode: Option<EventMode> = None;
    let mut state = BlockState::None;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        // Trailing tabs are significant only as empty embedded event columns
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();

        if fields[0].starts_with("Recording") {
            continue;
        }

        if fields[0] == "Event recording mode:" {
            mode = Some(match fields.get(1).copied() {
                Some("Separated") => EventMode::Separated,
                Some("Embedded") => EventMode::Embedded,
                other => {
                    return Err(GazeError::DataFormat {
                        line: line_no,
                        message: format!("unknown event recording mode {:?}", other),
                    })
                }
            });
            continue;
        }

        match fields[0] {
            "Session Start" => {
                current = SessionData::default();
                state = BlockState::None;
                continue;
            }
            "Session End" => {
                if !current.samples.is_empty() {
                    sessions.push(std::mem::take(&mut current));
                }
                state = BlockState::None;
                continue;
            }
            "TimeStamp" => {
                // Column-header row: a two-column header opens the separated
                // event block, anything else opens the gaze rows.
                state = if fields.len() == 2 && fields[1] == "Event" {
                    BlockState::EventRows
                } else {
                    BlockState::GazeRows
                };
                continue;
            }
            _ => {}
        }

        match state {
            BlockState::None => {
                // Unrecognized content outside a block is ignored
            }
            BlockState::GazeRows => {
                let mode = mode.ok_or_else(|| GazeError::DataFormat {
                    line: line_no,
                    message: "event recording mode was not declared".to_string(),
                })?;
                match (mode, fields.len()) {
                    (_, 11) => current.samples.push(parse_gaze_row(&fields, line_no)?),
                    (EventMode::Embedded, 12) => {
                        // Event-tagged row: contributes both a sample and an event
                        current.samples.push(parse_gaze_row(&fields, line_no)?);
                        current.events.push(SessionEvent {
                            time_ms: parse_f64(fields[0], line_no)?,
                            text: fields[11].to_string(),
                        });
                    }
                    (_, n) => {
                        return Err(GazeError::DataFormat {
                            line: line_no,
                            message: format!("expected 11 or 12 fields, found {}", n),
                        })
                    }
                }
            }
            BlockState::EventRows => {
                if fields.len() != 2 {
                    return Err(GazeError::DataFormat {
                        line: line_no,
                        message: format!("expected 2 event fields, found {}", fields.len()),
                    });
                }
                current.events.push(SessionEvent {
                    time_ms: parse_f64(fields[0], line_no)?,
                    text: fields[1].to_string(),
                });
            }
        }
    }

    Ok(sessions)
}

/// Parse a recorded data file from disk.
pub fn load_sessions_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<SessionData>, GazeError> {
    load_sessions(File::open(path)?)
}
