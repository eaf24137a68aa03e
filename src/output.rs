// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for progress events and reports.

use serde::Serialize;
use std::time::Instant;

use crate::deploy::{DeployEvent, DeploymentReport, RegionOutcome, error_chain};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Render one deployment progress event.
    pub fn event(&self, event: &DeployEvent) {
        match self.mode {
            OutputMode::Normal => println!("{}", format_event(event)),
            OutputMode::Quiet => {}
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print the per-region summary of a finished (or failed) deployment.
    pub fn report(&self, report: &DeploymentReport) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                for outcome in &report.outcomes {
                    println!("{}", format_outcome(outcome));
                }
            }
            OutputMode::Json => {
                let event = JsonReport {
                    event: "report",
                    report,
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "success",
                    message,
                    duration_secs: self.start_time.map(|_| self.elapsed_secs()),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.start_time.map(|_| self.elapsed_secs()),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

/// One human-readable line for a progress event.
pub fn format_event(event: &DeployEvent) -> String {
    let region = event.region();
    match event {
        DeployEvent::StepStarted { step, .. } => format!("[{region}] → {step}..."),
        DeployEvent::StepCompleted {
            step,
            detail: Some(detail),
            ..
        } => format!("[{region}] ✓ {step}: {detail}"),
        DeployEvent::StepCompleted { step, .. } => format!("[{region}] ✓ {step}"),
        DeployEvent::RolloutPoll {
            running,
            desired,
            pending,
            ..
        } => format!("[{region}]   {running}/{desired} running, {pending} pending"),
        DeployEvent::RegionFailed { error, .. } => format!("[{region}] ✗ {error}"),
        DeployEvent::Retired {
            task_definition, ..
        } => format!("[{region}] retired {}", task_definition.resource()),
    }
}

fn format_outcome(outcome: &RegionOutcome) -> String {
    match outcome {
        RegionOutcome::Deployed(result) => format!(
            "{}: deployed {} ({}/{} running)",
            result.region,
            result.task_definition.resource(),
            result.service.running_count,
            result.service.desired_count
        ),
        RegionOutcome::Failed { region, error } => {
            format!("{region}: failed: {}", error_chain(error))
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    event: &'a str,
    #[serde(flatten)]
    report: &'a DeploymentReport,
}
