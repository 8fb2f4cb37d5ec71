pub mod analysis;
pub mod config;
pub mod connectors;
pub mod error;
pub mod pipeline;
pub mod report;

pub use error::{ConfigError, Result, SentinelError, SourceError};
