// Error types for segzone pipeline operations
use crate::pipeline::Stage;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, SegzoneError>;

#[derive(Debug, thiserror::Error)]
pub enum SegzoneError {
    #[error("DuckDB error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid SQL identifier: {ident:?}")]
    InvalidIdentifier { ident: String },

    #[error("Unsupported bound value: {value}")]
    UnsupportedValue { value: String },

    #[error("Unknown output format: {format}")]
    UnknownFormat { format: String },

    #[error("Export to {path} failed")]
    Export {
        path: PathBuf,
        #[source]
        source: Box<SegzoneError>,
    },

    #[error("{stage} failed for partition {partition}")]
    Stage {
        stage: Stage,
        partition: String,
        #[source]
        source: Box<SegzoneError>,
    },
}

impl SegzoneError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap this error with the stage and partition it happened in.
    #[must_use]
    pub fn in_stage(self, stage: Stage, partition: &str) -> Self {
        Self::Stage {
            stage,
            partition: partition.to_string(),
            source: Box::new(self),
        }
    }

    /// The stage this error was raised in, when known.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// This error followed by its sources, joined with `: `.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            let msg = err.to_string();
            // Variants that embed their source already show its message.
            if !out.ends_with(&msg) {
                out.push_str(": ");
                out.push_str(&msg);
            }
            source = err.source();
        }
        out
    }
}
