//! Gazeflow CLI - Command-line interface for gaze data files
//!
//! Commands:
//! - info: Summarize the sessions in a recorded data file
//! - fixations: Detect fixations in a recorded session
//! - smooth: Apply moving-average smoothing and re-emit the samples

use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use gazeflow::fixation::{DispersionThreshold, VelocityThreshold};
use gazeflow::types::{Eye, SessionData};
use gazeflow::{load_sessions, GazeError, GAZEFLOW_VERSION};

/// Gazeflow - Gaze data processing and calibration validation
#[derive(Parser)]
#[command(name = "gazeflow")]
#[command(version = GAZEFLOW_VERSION)]
#[command(about = "Process recorded gaze data files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the sessions in a recorded data file
    Info {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect fixations in a recorded session
    Fixations {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Session index within the file
        #[arg(long, default_value = "0")]
        session: usize,

        /// Detection algorithm
        #[arg(long, default_value = "velocity")]
        algorithm: Algorithm,

        /// Which eye's trace to analyze
        #[arg(long, default_value = "average")]
        eye: EyeArg,

        /// Velocity threshold in units per sample, or dispersion threshold
        /// in units, depending on the algorithm
        #[arg(long)]
        threshold: Option<f64>,

        /// Minimum fixation duration in milliseconds
        #[arg(long)]
        min_duration: Option<f64>,

        /// Smoothing window applied before detection (0 disables)
        #[arg(long, default_value = "0")]
        smoothing: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply moving-average smoothing and re-emit the samples as JSON
    Smooth {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Session index within the file
        #[arg(long, default_value = "0")]
        session: usize,

        /// Moving-average window in samples
        #[arg(short, long, default_value = "3")]
        window: usize,
    },
}

#[derive(Clone, ValueEnum)]
enum Algorithm {
    /// Velocity threshold (I-VT)
    Velocity,
    /// Dispersion threshold (I-DT)
    Dispersion,
}

#[derive(Clone, ValueEnum)]
enum EyeArg {
    Left,
    Right,
    /// Binocular average trace
    Average,
}

impl From<EyeArg> for Eye {
    fn from(arg: EyeArg) -> Self {
        match arg {
            EyeArg::Left => Eye::Left,
            EyeArg::Right => Eye::Right,
            EyeArg::Average => Eye::Average,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GazeflowCliError> {
    match cli.command {
        Commands::Info { input, json } => cmd_info(&input, json),

        Commands::Fixations {
            input,
            session,
            algorithm,
            eye,
            threshold,
            min_duration,
            smoothing,
            json,
        } => cmd_fixations(
            &input,
            session,
            algorithm,
            eye.into(),
            threshold,
            min_duration,
            smoothing,
            json,
        ),

        Commands::Smooth {
            input,
            session,
            window,
        } => cmd_smooth(&input, session, window),
    }
}

fn cmd_info(input: &PathBuf, json: bool) -> Result<(), GazeflowCliError> {
    let sessions = load_input(input)?;

    let report = InfoReport {
        version: GAZEFLOW_VERSION.to_string(),
        session_count: sessions.len(),
        sessions: sessions
            .iter()
            .map(|s| SessionInfo {
                samples: s.samples.len(),
                events: s.events.len(),
                duration_ms: s
                    .samples
                    .last()
                    .map(|r| r.time_ms)
                    .unwrap_or(f64::NAN),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Gazeflow Data File Report");
        println!("=========================");
        println!("Sessions: {}", report.session_count);
        for (i, s) in report.sessions.iter().enumerate() {
            println!(
                "  session {}: {} samples, {} events, {:.1} ms",
                i, s.samples, s.events, s.duration_ms
            );
        }
    }
    Ok(())
}

fn cmd_fixations(
    input: &PathBuf,
    session: usize,
    algorithm: Algorithm,
    eye: Eye,
    threshold: Option<f64>,
    min_duration: Option<f64>,
    smoothing: usize,
    json: bool,
) -> Result<(), GazeflowCliError> {
    let sessions = load_input(input)?;
    let session_data = sessions
        .get(session)
        .ok_or(GazeflowCliError::SessionOutOfRange(session, sessions.len()))?;

    let samples = if smoothing > 0 {
        gazeflow::moving_average(&session_data.samples, smoothing)
    } else {
        session_data.samples.clone()
    };

    let fixations = match algorithm {
        Algorithm::Velocity => {
            let mut detector = VelocityThreshold::default();
            if let Some(t) = threshold {
                detector.max_velocity = t;
            }
            if let Some(d) = min_duration {
                detector.min_duration = d;
            }
            detector.detect(&samples, eye)
        }
        Algorithm::Dispersion => {
            let mut detector = DispersionThreshold::default();
            if let Some(t) = threshold {
                detector.max_dispersion = t;
            }
            if let Some(d) = min_duration {
                detector.min_duration = d;
            }
            detector.detect(&samples, eye)
        }
    };

    if json {
        println!("{}", format_json(&fixations)?);
    } else {
        println!("Onset (ms)\tDuration (ms)\tX\tY");
        for f in &fixations {
            println!("{:.1}\t{:.1}\t{:.4}\t{:.4}", f.onset, f.duration, f.x, f.y);
        }
    }
    Ok(())
}

fn cmd_smooth(input: &PathBuf, session: usize, window: usize) -> Result<(), GazeflowCliError> {
    if window == 0 {
        return Err(GazeflowCliError::Gaze(GazeError::InvalidConfig(
            "smoothing window must be at least 1".to_string(),
        )));
    }
    let sessions = load_input(input)?;
    let session_data = sessions
        .get(session)
        .ok_or(GazeflowCliError::SessionOutOfRange(session, sessions.len()))?;

    let smoothed = gazeflow::moving_average(&session_data.samples, window);
    println!("{}", format_json(&smoothed)?);
    Ok(())
}

fn load_input(input: &PathBuf) -> Result<Vec<SessionData>, GazeflowCliError> {
    let sessions = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        load_sessions(buffer.as_bytes())?
    } else {
        load_sessions(File::open(input)?)?
    };

    if sessions.is_empty() {
        return Err(GazeflowCliError::NoSessions);
    }
    Ok(sessions)
}

/// Pretty-print when writing to a terminal, compact when piped
fn format_json<T: serde::Serialize>(value: &T) -> Result<String, GazeflowCliError> {
    if atty::is(atty::Stream::Stdout) {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// Report types

#[derive(serde::Serialize)]
struct InfoReport {
    version: String,
    session_count: usize,
    sessions: Vec<SessionInfo>,
}

#[derive(serde::Serialize)]
struct SessionInfo {
    samples: usize,
    events: usize,
    duration_ms: f64,
}

// Error types

#[derive(Debug)]
enum GazeflowCliError {
    Io(io::Error),
    Gaze(GazeError),
    Json(serde_json::Error),
    NoSessions,
    SessionOutOfRange(usize, usize),
}

impl From<io::Error> for GazeflowCliError {
    fn from(e: io::Error) -> Self {
        GazeflowCliError::Io(e)
    }
}

impl From<GazeError> for GazeflowCliError {
    fn from(e: GazeError) -> Self {
        GazeflowCliError::Gaze(e)
    }
}

impl From<serde_json::Error> for GazeflowCliError {
    fn from(e: serde_json::Error) -> Self {
        GazeflowCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GazeflowCliError> for CliError {
    fn from(e: GazeflowCliError) -> Self {
        match e {
            GazeflowCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GazeflowCliError::Gaze(e) => CliError {
                code: "DATA_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a gazeflow data file".to_string()),
            },
            GazeflowCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            GazeflowCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure the file contains a Session Start block".to_string()),
            },
            GazeflowCliError::SessionOutOfRange(index, count) => CliError {
                code: "SESSION_OUT_OF_RANGE".to_string(),
                message: format!("Session index {} out of range ({} sessions)", index, count),
                hint: Some("Run 'gazeflow info' to list sessions".to_string()),
            },
        }
    }
}
