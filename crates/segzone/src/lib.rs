//! Batch pipeline that filters trajectory segments per monthly partition,
//! removes those touching an exclusion layer, splits the rest over a zone
//! grid and exports one file per partition.

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod ident;
pub mod index;
pub mod overlap;
pub mod partition;
pub mod pipeline;
pub mod session;
pub mod sql;
pub mod working;
pub mod zonal;

// Re-export key types for use in tests and external applications
pub use crate::config::{Config, create_example_config, load_config, parse_config, validate_config};
pub use crate::error::{Result, SegzoneError};
pub use crate::export::{CopyExporter, ExportFormat, ExportReport, ExportRequest, Exporter};
pub use crate::ident::{Ident, TableName};
pub use crate::partition::Partition;
pub use crate::pipeline::{FailurePolicy, PartitionOutcome, Pipeline, RunSummary, Stage};
pub use crate::session::{DuckSession, PlanEntry, PlanSession, Session};
pub use crate::sql::Statement;
pub use crate::working::WorkingTables;
