#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a fatal error, used to decide how a failed run is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Config,
    ExternalTool,
    Session,
    Transform,
}

#[derive(Debug, Error, Diagnostic)]
pub enum CreateError {
    #[error("Project directory '{name}' must be prefixed with 'impl-' or 'ut-'")]
    #[diagnostic(help("Rename the target directory, e.g. 'impl-{name}' or 'ut-{name}'"))]
    InvalidProjectDir { name: String },

    #[error("Cannot determine the name of project directory {path}")]
    UnnamedProjectDir { path: PathBuf },

    #[error("Failed to parse user config {path}")]
    #[diagnostic(help("Check the TOML syntax of your ut-create config.toml"))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown form mode '{mode}'")]
    #[diagnostic(help("Supported form modes: browser, terminal"))]
    UnknownFormMode { mode: String },

    #[error("Registry lookup failed for '{package}': {message}")]
    #[diagnostic(help("Check the template name and the registry URL"))]
    Registry { package: String, message: String },

    #[error("Package '{package}' does not declare a repository URL")]
    MissingRepository { package: String },

    #[error("Command `{command} {}` failed{}", .args.join(" "), status_suffix(.status))]
    #[diagnostic(help("{reason}"))]
    ToolFailed {
        command: String,
        args: Vec<String>,
        status: Option<i32>,
        reason: String,
    },

    #[error("Failed to spawn `{command} {}`", .args.join(" "))]
    #[diagnostic(help("Ensure '{command}' is installed and available on PATH"))]
    ToolSpawn {
        command: String,
        args: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("Template manifest not found at {path}")]
    #[diagnostic(help("The template repository must contain a .ut-create file at its root"))]
    ManifestNotFound { path: PathBuf },

    #[error("Template manifest {path} is invalid: {message}")]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Template manifest script failed in '{function}': {message}")]
    #[diagnostic(help("Check the Rhai code in the template's .ut-create file"))]
    ManifestScript { function: String, message: String },

    #[error("Failed to render '{field}' of rename rule #{index}")]
    RuleTemplate {
        index: usize,
        field: String,
        #[source]
        source: tera::Error,
    },

    #[error("Configuration form failed: {message}")]
    Session { message: String },

    #[error("Configuration form was cancelled")]
    SessionCancelled,

    #[error("Malformed rename rule #{index}: {reason}")]
    MalformedRule { index: usize, reason: String },

    #[error("Invalid regular expression '{pattern}'")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("Invalid file selector '{pattern}'")]
    GlobPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl CreateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidProjectDir { .. } | Self::UnnamedProjectDir { .. } => ErrorKind::Usage,
            Self::ConfigParse { .. } | Self::UnknownFormMode { .. } => ErrorKind::Config,
            Self::Registry { .. }
            | Self::MissingRepository { .. }
            | Self::ToolFailed { .. }
            | Self::ToolSpawn { .. } => ErrorKind::ExternalTool,
            Self::Session { .. } | Self::SessionCancelled => ErrorKind::Session,
            Self::ManifestNotFound { .. }
            | Self::ManifestInvalid { .. }
            | Self::ManifestScript { .. }
            | Self::RuleTemplate { .. }
            | Self::MalformedRule { .. }
            | Self::InvalidRegex { .. }
            | Self::GlobPattern { .. }
            | Self::Io { .. } => ErrorKind::Transform,
        }
    }
}

pub type Result<T> = std::result::Result<T, CreateError>;

fn status_suffix(status: &Option<i32>) -> String {
    status
        .map(|code| format!(" with exit status {code}"))
        .unwrap_or_default()
}
