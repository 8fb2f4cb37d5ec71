use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems. Any of these aborts the run before a single
/// external source is contacted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file '{}' was not found", .0.display())]
    MissingFile(PathBuf),

    #[error("section [{0}] is missing")]
    MissingSection(String),

    #[error("option '{option}' is missing from section [{section}]")]
    MissingOption { section: String, option: String },

    #[error("option '{option}' in section [{section}] has invalid value '{value}'")]
    InvalidValue {
        section: String,
        option: String,
        value: String,
    },

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn missing_section(section: impl Into<String>) -> Self {
        Self::MissingSection(section.into())
    }

    pub fn missing_option(section: impl Into<String>, option: impl Into<String>) -> Self {
        Self::MissingOption {
            section: section.into(),
            option: option.into(),
        }
    }

    pub fn invalid_value(
        section: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section: section.into(),
            option: option.into(),
            value: value.into(),
        }
    }
}

/// Failures inside a single external source. These never leave the
/// connector: they are turned into a documented fallback value.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("connection refused by {host}:{port}")]
    ConnectionRefused { host: String, port: u16 },

    #[error("timed out while {0}")]
    Timeout(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn provider_error(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn timeout(during: impl Into<String>) -> Self {
        Self::Timeout(during.into())
    }
}

/// Top-level errors surfaced by the binary.
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SentinelError {
    /// Short type name used when reporting an unexpected failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
