//! Gaze sample log and data-file serialization
//!
//! [`GazeRecorder`] owns the per-session sample and event buffers.
//! [`DataFileWriter`] serializes flushed sessions to the line-oriented
//! tab-separated recording format, which is byte-exact: column order,
//! decimal precision, and the `Session Start`/`Session End` markers must
//! round-trip with existing recorded files.

use chrono::Local;
use std::io::Write;

use crate::error::GazeError;
use crate::geometry::Point2;
use crate::interpolate::interpolate_record;
use crate::screen::ScreenConfig;
use crate::types::{average_gaze, ConvertedRecord, EventMode, GazeEvent, GazeRecord};

/// Convert a raw device record into the application's screen units.
///
/// `start` is the device timestamp of the first sample in the session; the
/// converted elapsed time is milliseconds relative to it.
pub fn convert_record(cfg: &ScreenConfig, r: &GazeRecord, start: i64) -> ConvertedRecord {
    let left = cfg.to_screen(Point2::new(r.left_x, r.left_y));
    let right = cfg.to_screen(Point2::new(r.right_x, r.right_y));
    let (avg_x, avg_y) = average_gaze(
        (left.x, left.y),
        r.left_valid,
        (right.x, right.y),
        r.right_valid,
    );

    ConvertedRecord {
        time_ms: (r.timestamp - start) as f64 / 1000.0,
        left_x: left.x,
        left_y: left.y,
        left_pupil: r.left_pupil,
        left_valid: r.left_valid,
        right_x: right.x,
        right_y: right.y,
        right_pupil: r.right_pupil,
        right_valid: r.right_valid,
        avg_x,
        avg_y,
    }
}

/// In-memory log of one recording session's gaze samples and events.
///
/// Buffers are cleared atomically when a session starts and are owned by the
/// recorder until flushed. Append order is the only ordering guarantee; the
/// log never re-sorts.
#[derive(Debug, Clone)]
pub struct GazeRecorder {
    screen: ScreenConfig,
    gaze_data: Vec<GazeRecord>,
    event_data: Vec<GazeEvent>,
    recording: bool,
}

impl GazeRecorder {
    pub fn new(screen: ScreenConfig) -> Self {
        Self {
            screen,
            gaze_data: Vec::new(),
            event_data: Vec::new(),
            recording: false,
        }
    }

    pub fn screen(&self) -> &ScreenConfig {
        &self.screen
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn sample_count(&self) -> usize {
        self.gaze_data.len()
    }

    pub fn event_count(&self) -> usize {
        self.event_data.len()
    }

    /// Begin a session: both buffers are cleared together.
    pub fn start_session(&mut self) {
        self.gaze_data.clear();
        self.event_data.clear();
        self.recording = true;
    }

    pub fn stop_session(&mut self) {
        self.recording = false;
    }

    /// Device-callback target; samples arriving outside a session are dropped.
    pub fn push_record(&mut self, record: GazeRecord) {
        if self.recording {
            self.gaze_data.push(record);
        }
    }

    /// Record a timestamped experiment event. `timestamp` must come from the
    /// same clock domain as the gaze records. Ignored unless recording.
    pub fn record_event(&mut self, text: impl Into<String>, timestamp: i64) {
        if !self.recording {
            return;
        }
        self.event_data.push(GazeEvent {
            timestamp,
            text: text.into(),
        });
    }

    /// Latest gaze position in screen units as (left_x, left_y, right_x,
    /// right_y). All-NaN before the first sample arrives.
    pub fn latest_gaze_position(&self) -> (f64, f64, f64, f64) {
        match self.gaze_data.last() {
            None => (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
            Some(r) => {
                let l = self.screen.to_screen(Point2::new(r.left_x, r.left_y));
                let rp = self.screen.to_screen(Point2::new(r.right_x, r.right_y));
                (l.x, l.y, rp.x, rp.y)
            }
        }
    }

    /// Latest pupil diameters as (left, right); NaN before the first sample.
    pub fn latest_pupil_size(&self) -> (f64, f64) {
        match self.gaze_data.last() {
            None => (f64::NAN, f64::NAN),
            Some(r) => (r.left_pupil, r.right_pupil),
        }
    }

    pub fn samples(&self) -> &[GazeRecord] {
        &self.gaze_data
    }

    pub fn events(&self) -> &[GazeEvent] {
        &self.event_data
    }
}

const GAZE_COLUMNS: [&str; 11] = [
    "TimeStamp",
    "GazePointXLeft",
    "GazePointYLeft",
    "PupilLeft",
    "ValidityLeft",
    "GazePointXRight",
    "GazePointYRight",
    "PupilRight",
    "ValidityRight",
    "GazePointX",
    "GazePointY",
];

fn format_row(r: &ConvertedRecord) -> String {
    format!(
        "{:.1}\t{:.4}\t{:.4}\t{:.4}\t{}\t{:.4}\t{:.4}\t{:.4}\t{}\t{:.4}\t{:.4}",
        r.time_ms,
        r.left_x,
        r.left_y,
        r.left_pupil,
        r.left_valid,
        r.right_x,
        r.right_y,
        r.right_pupil,
        r.right_valid,
        r.avg_x,
        r.avg_y
    )
}

/// Row used for events not bracketed by gaze samples: all gaze fields NaN,
/// both validities zero.
fn nan_row(time_ms: f64) -> ConvertedRecord {
    ConvertedRecord {
        time_ms,
        left_x: f64::NAN,
        left_y: f64::NAN,
        left_pupil: f64::NAN,
        left_valid: 0,
        right_x: f64::NAN,
        right_y: f64::NAN,
        right_pupil: f64::NAN,
        right_valid: 0,
        avg_x: f64::NAN,
        avg_y: f64::NAN,
    }
}

/// Writer for the recording data file
pub struct DataFileWriter<W: Write> {
    writer: W,
    mode: EventMode,
}

impl<W: Write> DataFileWriter<W> {
    /// Open a data file: writes the header block (recording date, time,
    /// resolution, event mode) followed by a blank line.
    pub fn new(mut writer: W, screen: &ScreenConfig, mode: EventMode) -> Result<Self, GazeError> {
        let now = Local::now();
        writeln!(writer, "Recording date:\t{}", now.format("%Y/%m/%d"))?;
        writeln!(writer, "Recording time:\t{}", now.format("%H:%M:%S"))?;
        writeln!(
            writer,
            "Recording resolution:\t{} x {}",
            screen.width_px, screen.height_px
        )?;
        writeln!(writer, "Event recording mode:\t{}", mode.as_str())?;
        writeln!(writer)?;
        Ok(Self { writer, mode })
    }

    pub fn mode(&self) -> EventMode {
        self.mode
    }

    /// Write the recorder's buffered session as one `Session Start`/
    /// `Session End` block. Does nothing while the recorder is still
    /// recording or when no samples were collected.
    pub fn flush_session(&mut self, recorder: &GazeRecorder) -> Result<(), GazeError> {
        if recorder.is_recording() || recorder.samples().is_empty() {
            return Ok(());
        }

        let gaze_data = recorder.samples();
        let event_data = recorder.events();
        let cfg = recorder.screen();
        let start = gaze_data[0].timestamp;

        writeln!(self.writer, "Session Start")?;
        match self.mode {
            EventMode::Embedded => {
                writeln!(self.writer, "{}\tEvent", GAZE_COLUMNS.join("\t"))?;

                let mut cursor = 0;
                for (i, record) in gaze_data.iter().enumerate() {
                    // At most one pending event is merged per row boundary;
                    // further events wait for later rows and any still
                    // pending at the end leave as NaN rows.
                    if cursor < event_data.len()
                        && event_data[cursor].timestamp < record.timestamp
                    {
                        let event = &event_data[cursor];
                        let row = if i > 0 {
                            convert_record(
                                cfg,
                                &interpolate_record(&gaze_data[i - 1], record, event.timestamp),
                                start,
                            )
                        } else {
                            nan_row((event.timestamp - start) as f64 / 1000.0)
                        };
                        writeln!(self.writer, "{}\t{}", format_row(&row), event.text)?;
                        cursor += 1;
                    }
                    writeln!(self.writer, "{}\t", format_row(&convert_record(cfg, record, start)))?;
                }

                // Events after the final gaze sample
                for event in &event_data[cursor..] {
                    let row = nan_row((event.timestamp - start) as f64 / 1000.0);
                    writeln!(self.writer, "{}\t{}", format_row(&row), event.text)?;
                }
            }
            EventMode::Separated => {
                writeln!(self.writer, "{}", GAZE_COLUMNS.join("\t"))?;
                for record in gaze_data {
                    writeln!(self.writer, "{}", format_row(&convert_record(cfg, record, start)))?;
                }
                writeln!(self.writer, "TimeStamp\tEvent")?;
                for event in event_data {
                    writeln!(
                        self.writer,
                        "{:.1}\t{}",
                        (event.timestamp - start) as f64 / 1000.0,
                        event.text
                    )?;
                }
            }
        }
        writeln!(self.writer, "Session End")?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> Result<W, GazeError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
