//! Error types for escrowboard-core

use std::fmt::Write;
use thiserror::Error;

use crate::period::Granularity;

/// A shell command worth running to fix or diagnose a failure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RemediationCommand {
    pub label: String,
    pub command: String,
}

/// "To fix" guidance attached to every user-facing error.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Remediation {
    pub summary: String,
    pub commands: Vec<RemediationCommand>,
    pub alternatives: Vec<String>,
}

impl Remediation {
    #[must_use]
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            commands: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[must_use]
    pub fn command(mut self, label: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(RemediationCommand {
            label: label.into(),
            command: command.into(),
        });
        self
    }

    #[must_use]
    pub fn alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }

    /// Indented plain-text block; empty sections are left out.
    #[must_use]
    pub fn render_plain(&self) -> String {
        let mut out = format!("To fix:\n  {}\n", self.summary);
        let commands = self
            .commands
            .iter()
            .map(|c| format!("{}: {}", c.label, c.command));
        push_section(&mut out, "Commands", commands);
        push_section(&mut out, "Alternatives", self.alternatives.iter().cloned());
        out
    }
}

fn push_section(out: &mut String, title: &str, items: impl Iterator<Item = String>) {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return;
    }
    let _ = writeln!(out, "  {title}:");
    for item in items {
        let _ = writeln!(out, "    - {item}");
    }
}

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for escrowboard-core
#[derive(Error, Debug)]
pub enum Error {
    /// Period allocator rejected its inputs
    #[error("Allocation error: {0}")]
    Allocation(#[from] AllocationError),

    /// Remote API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Return remediation guidance when available.
    #[must_use]
    pub fn remediation(&self) -> Option<Remediation> {
        match self {
            Self::Allocation(err) => Some(err.remediation()),
            Self::Api(err) => Some(err.remediation()),
            Self::Config(err) => Some(err.remediation()),
            Self::Io(_) => Some(Remediation::new(
                "A local file could not be read or written. Check the path and its permissions.",
            )),
            Self::Json(_) => Some(
                Remediation::new("Output could not be encoded as JSON.")
                    .alternative("Use --format plain."),
            ),
        }
    }
}

/// The allocator's only failure: totals it refuses to spread.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("invalid {field} total {value}: {reason}")]
    InvalidInput {
        /// Which total was rejected (`secured` or `released`)
        field: &'static str,
        /// The rejected value as supplied
        value: f64,
        /// Human-readable rule that was violated
        reason: &'static str,
    },
}

impl AllocationError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::InvalidInput { field, .. } => Remediation::new(format!(
                "Pass a finite, non-negative, whole-unit {field} total."
            ))
            .command("Example", "eb series --secured 1200000 --released 900000")
            .alternative("Clamp or round amounts before handing them to the allocator."),
        }
    }
}

/// Remote API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("granularity `{0}` has no remote series")]
    UnsupportedGranularity(Granularity),
}

impl ApiError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::InvalidBaseUrl { .. } => {
                Remediation::new("Fix the API base URL (scheme and host are required).")
                    .command("Override", "eb --api http://localhost:5000 jobs")
                    .alternative("Set ESCROWBOARD_API_URL or [api].base_url in escrowboard.toml.")
            }
            Self::Timeout { .. } => {
                Remediation::new("The API did not answer in time. Check that it is running.")
                    .alternative("Raise [api].timeout_ms in escrowboard.toml.")
            }
            Self::Transport { url, .. } => Remediation::new(format!(
                "Could not reach {url}. Check the API is running and reachable."
            ))
            .command("Probe", format!("curl -sS \"{url}\""))
            .alternative("Use --offline to render synthetic funds data."),
            Self::Status { status, .. } if *status == 404 => {
                Remediation::new("The API does not expose this endpoint.")
                    .alternative("Check the API version matches this client.")
                    .alternative("Disable the remote funds series with ESCROWBOARD_DISABLE_FUNDS_FETCH=true.")
            }
            Self::Status { .. } => {
                Remediation::new("The API returned an error status. Check its logs and retry.")
            }
            Self::Decode { .. } => {
                Remediation::new("The API response did not match the expected shape.")
                    .alternative("Check the API version matches this client.")
            }
            Self::UnsupportedGranularity(_) => {
                Remediation::new("Snapshot views are built locally; request month, quarter or year.")
            }
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ConfigError {
    #[must_use]
    pub fn remediation(&self) -> Remediation {
        match self {
            Self::FileNotFound(path) => {
                Remediation::new(format!("Nothing exists at {path}."))
                    .command("Write the defaults there", format!("eb config --format toml > \"{path}\""))
                    .alternative("Unset ESCROWBOARD_CONFIG or drop --config to use built-in defaults.")
            }
            Self::ReadFailed(path, _) => {
                Remediation::new(format!("{path} exists but is not readable by this user."))
                    .command("Inspect", format!("ls -l \"{path}\""))
            }
            Self::ParseError(_) => Remediation::new("escrowboard.toml is not valid TOML.")
                .command("Compare with defaults", "eb config --format toml")
                .alternative("Unknown keys are ignored; check quoting and section headers."),
            Self::SerializeFailed(_) => {
                Remediation::new("The effective config holds a value TOML cannot represent.")
            }
            Self::ValidationError(_) => {
                Remediation::new("Correct the field named above in escrowboard.toml or via flags.")
                    .command("Show effective config", "eb config")
            }
        }
    }
}

/// Format an error with remediation guidance for display.
#[must_use]
pub fn format_error_with_remediation(error: &Error) -> String {
    let mut output = format!("Error: {error}");
    if let Some(remediation) = error.remediation() {
        output.push('\n');
        output.push('\n');
        output.push_str(&remediation.render_plain());
    }
    output
}
