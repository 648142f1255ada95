//! Record a short synthetic session and print the resulting data file

use gazeflow::types::{EventMode, GazeRecord};
use gazeflow::{DataFileWriter, GazeRecorder, ScreenConfig, ScreenUnits};

fn main() {
    let screen = ScreenConfig::new(1920, 1080, 52.0, 29.0, 60.0, ScreenUnits::Pix)
        .expect("valid screen configuration");

    let mut recorder = GazeRecorder::new(screen.clone());
    recorder.start_session();

    // 100 samples at 120 Hz drifting across the screen
    for i in 0..100i64 {
        let t = i as f64 / 100.0;
        recorder.push_record(GazeRecord {
            timestamp: i * 8_333,
            left_x: 0.3 + 0.2 * t,
            left_y: 0.5,
            left_pupil: 3.1,
            left_valid: 1,
            right_x: 0.31 + 0.2 * t,
            right_y: 0.49,
            right_pupil: 3.0,
            right_valid: 1,
        });
    }
    recorder.record_event("stimulus onset", 120_000);
    recorder.record_event("response", 650_000);
    recorder.stop_session();

    let mut writer = DataFileWriter::new(Vec::new(), &screen, EventMode::Embedded)
        .expect("header write");
    writer.flush_session(&recorder).expect("session write");
    let bytes = writer.into_inner().expect("flush");

    print!("{}", String::from_utf8_lossy(&bytes));
}
