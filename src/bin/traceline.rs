//! Traceline CLI - Command-line interface for Traceline
//!
//! Commands:
//! - analyze: Run the full correlation pipeline over phone exports
//! - validate: Check that exports parse cleanly and report row counts
//! - config: Print the active configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use traceline::geo::format_coordinates;
use traceline::pipeline::{CaseAnalyzer, CaseReport};
use traceline::{AnalysisConfig, AnalysisError, TRACELINE_VERSION};

/// Traceline - Phone activity and location correlation for collision cases
#[derive(Parser)]
#[command(name = "traceline")]
#[command(version = TRACELINE_VERSION)]
#[command(about = "Correlate phone timeline and GPS exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full correlation pipeline over phone exports
    Analyze {
        /// Timeline export CSV
        #[arg(short, long)]
        timeline: PathBuf,

        /// Location export CSV
        #[arg(short, long)]
        location: Option<PathBuf>,

        /// Configuration file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Collision time, "YYYY-MM-DD HH:MM:SS" (UTC)
        #[arg(short = 'c', long)]
        collision_time: Option<String>,

        /// Collision latitude
        #[arg(long, requires = "collision_time")]
        collision_lat: Option<f64>,

        /// Collision longitude
        #[arg(long, requires = "collision_time")]
        collision_lon: Option<f64>,

        /// Override the event/location match tolerance (minutes)
        #[arg(long)]
        tolerance: Option<i64>,

        /// Override the critical window before the collision (minutes)
        #[arg(short, long)]
        window: Option<i64>,

        /// Write the enriched event table to this file
        #[arg(long)]
        events: Option<PathBuf>,

        /// Write the app session table to this file
        #[arg(long)]
        sessions: Option<PathBuf>,

        /// Write the analysis summary to this file (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check that exports parse cleanly and report row counts
    Validate {
        /// Timeline export CSV
        #[arg(short, long)]
        timeline: PathBuf,

        /// Location export CSV
        #[arg(short, long)]
        location: Option<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the active configuration
    Config {
        /// Configuration file (JSON); defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
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

fn run(cli: Cli) -> Result<(), TracelineCliError> {
    match cli.command {
        Commands::Analyze {
            timeline,
            location,
            config,
            collision_time,
            collision_lat,
            collision_lon,
            tolerance,
            window,
            events,
            sessions,
            output,
            pretty,
        } => {
            let mut analysis_config = load_config(config.as_deref())?;
            if let Some(minutes) = tolerance {
                analysis_config.location_match_tolerance_minutes = minutes;
            }
            if let Some(minutes) = window {
                // The window override widens both the pre-collision filter
                // and the critical-session window
                analysis_config.critical_window_minutes = minutes;
                analysis_config.analysis_window_before_minutes = minutes;
            }

            cmd_analyze(
                analysis_config,
                &timeline,
                location.as_deref(),
                collision_time.as_deref(),
                collision_lat,
                collision_lon,
                events.as_deref(),
                sessions.as_deref(),
                &output,
                pretty,
            )
        }

        Commands::Validate {
            timeline,
            location,
            json,
        } => cmd_validate(&timeline, location.as_deref(), json),

        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    config: AnalysisConfig,
    timeline: &Path,
    location: Option<&Path>,
    collision_time: Option<&str>,
    collision_lat: Option<f64>,
    collision_lon: Option<f64>,
    events_out: Option<&Path>,
    sessions_out: Option<&Path>,
    output: &Path,
    pretty: bool,
) -> Result<(), TracelineCliError> {
    let mut analyzer = CaseAnalyzer::with_config(config);

    if let Some(time) = collision_time {
        analyzer.set_collision(time, collision_lat, collision_lon)?;
    }

    let load = analyzer.load(timeline, location)?;

    eprintln!(
        "Timeline: {} rows read, {} loaded, {} skipped, {} duplicates removed",
        load.timeline.rows_read,
        load.timeline.loaded,
        load.timeline.skipped,
        load.timeline.duplicates_removed
    );
    if let Some(report) = &load.location {
        eprintln!(
            "Location: {} rows read, {} loaded, {} skipped, {} duplicates removed",
            report.rows_read, report.loaded, report.skipped, report.duplicates_removed
        );
    }
    if load.location_degraded {
        eprintln!("Warning: location export failed to load, continuing timeline-only");
    }
    if let Some(collision) = analyzer.collision() {
        match (collision.latitude, collision.longitude) {
            (Some(lat), Some(lon)) => eprintln!(
                "Collision: {} at {}",
                collision.time.format("%Y-%m-%d %H:%M:%S"),
                format_coordinates(lat, lon, 5)
            ),
            _ => eprintln!("Collision: {}", collision.time.format("%Y-%m-%d %H:%M:%S")),
        }
    }

    let report = analyzer.analyze()?;

    if let Some(path) = events_out {
        fs::write(path, to_json(&report.events, pretty)?)?;
        eprintln!("Wrote {} events to {}", report.events.len(), path.display());
    }
    if let Some(path) = sessions_out {
        fs::write(path, to_json(&report.sessions, pretty)?)?;
        eprintln!(
            "Wrote {} sessions to {}",
            report.sessions.len(),
            path.display()
        );
    }

    print_highlights(&report);

    let summary_json = to_json(&report.summary, pretty)?;
    if output.to_string_lossy() == "-" {
        println!("{summary_json}");
    } else {
        fs::write(output, summary_json)?;
        eprintln!("Wrote summary to {}", output.display());
    }

    Ok(())
}

fn print_highlights(report: &CaseReport) {
    let findings = &report.summary.key_findings;
    eprintln!(
        "Events: {} total, {} high priority, {} while driving",
        findings.total_events, findings.high_priority_events, findings.phone_while_driving
    );
    eprintln!(
        "Sessions: {} total, {} while driving, {} in critical window",
        report.sessions.len(),
        report.sessions_while_driving.len(),
        report.summary.critical_sessions.len()
    );
    if findings.max_speed_mph > 0.0 {
        eprintln!(
            "Speed: max {:.1} mph, average {:.1} mph",
            findings.max_speed_mph, findings.average_speed_mph
        );
    }
}

fn cmd_validate(
    timeline: &Path,
    location: Option<&Path>,
    json: bool,
) -> Result<(), TracelineCliError> {
    let config = AnalysisConfig::default();
    let (_, timeline_report) = traceline::loader::load_timeline(timeline, &config)?;
    let location_report = match location {
        Some(path) => Some(traceline::loader::load_locations(path, &config)?.1),
        None => None,
    };

    if json {
        let report = serde_json::json!({
            "timeline": timeline_report,
            "location": location_report,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!(
            "Timeline: {} rows read, {} loaded, {} skipped",
            timeline_report.rows_read, timeline_report.loaded, timeline_report.skipped
        );
        match &location_report {
            Some(report) => println!(
                "Location: {} rows read, {} loaded, {} skipped",
                report.rows_read, report.loaded, report.skipped
            ),
            None => println!("Location: not provided"),
        }
    }

    Ok(())
}

fn cmd_config(config: Option<&Path>) -> Result<(), TracelineCliError> {
    let config = load_config(config)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, TracelineCliError> {
    match path {
        Some(path) => {
            let data = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, TracelineCliError> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

// Error types

#[derive(Debug)]
enum TracelineCliError {
    Io(std::io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
}

impl From<std::io::Error> for TracelineCliError {
    fn from(e: std::io::Error) -> Self {
        TracelineCliError::Io(e)
    }
}

impl From<AnalysisError> for TracelineCliError {
    fn from(e: AnalysisError) -> Self {
        TracelineCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for TracelineCliError {
    fn from(e: serde_json::Error) -> Self {
        TracelineCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TracelineCliError> for CliError {
    fn from(e: TracelineCliError) -> Self {
        match e {
            TracelineCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TracelineCliError::Analysis(e) => {
                let hint = match &e {
                    AnalysisError::FileNotFound(_) => "Check the export file path",
                    AnalysisError::FileTooLarge { .. } => {
                        "Raise max_file_size_mb in the configuration"
                    }
                    AnalysisError::InvalidCollisionTime(_) => {
                        "Use \"YYYY-MM-DD HH:MM:SS\" for the collision time"
                    }
                    AnalysisError::NoValidRows(_) => {
                        "Check that the export uses the expected CSV layout"
                    }
                    _ => "Run 'traceline validate' against the exports",
                };
                CliError {
                    code: "ANALYSIS_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            TracelineCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
        }
    }
}
