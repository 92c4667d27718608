//! Per-partition orchestration.
//!
//! Partitions are processed strictly one after another. Within a partition
//! the stages run in a fixed order, each committing its own work:
//!
//! ```text
//! prepare -> ensure-index -> filter -> remove-overlaps -> assign-zones -> export -> cleanup
//! ```
//!
//! What happens when a stage fails is decided by [`Stage::policy`]. Export
//! failures are recorded and the run moves on; everything else ends the run.
//! Working tables are dropped on every path out of a partition.

use crate::config::Config;
use crate::error::{Result, SegzoneError};
use crate::export::{ExportReport, ExportRequest, Exporter};
use crate::filter::filter_partition;
use crate::index::ensure_spatial_index;
use crate::overlap::remove_overlaps;
use crate::partition::Partition;
use crate::session::Session;
use crate::working::WorkingTables;
use crate::zonal::assign_zones;
use diagnostics::{debug, error, info, warn};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Output directory and stale working tables.
    Prepare,
    EnsureIndex,
    Filter,
    RemoveOverlaps,
    AssignZones,
    Export,
    Cleanup,
}

/// What the orchestrator does after a stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Release the working tables and end the run with the error.
    Abort,
    /// Record the failure on the partition, release its tables, and go on
    /// with the next partition.
    Continue,
}

impl Stage {
    #[must_use]
    pub fn policy(self) -> FailurePolicy {
        match self {
            Self::Export => FailurePolicy::Continue,
            Self::Prepare
            | Self::EnsureIndex
            | Self::Filter
            | Self::RemoveOverlaps
            | Self::AssignZones
            | Self::Cleanup => FailurePolicy::Abort,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::EnsureIndex => "ensure-index",
            Self::Filter => "filter",
            Self::RemoveOverlaps => "remove-overlaps",
            Self::AssignZones => "assign-zones",
            Self::Export => "export",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one partition that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOutcome {
    pub partition: Partition,
    pub filtered_rows: usize,
    pub removed_rows: usize,
    pub zoned_rows: usize,
    pub export: Option<ExportReport>,
    /// Error chain of a recoverable failure.
    pub failure: Option<String>,
}

impl PartitionOutcome {
    fn new(partition: Partition) -> Self {
        Self {
            partition,
            filtered_rows: 0,
            removed_rows: 0,
            zoned_rows: 0,
            export: None,
            failure: None,
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<PartitionOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Runs the stages over a set of partitions with one session.
pub struct Pipeline<'a, S: Session, E: Exporter<S>> {
    config: &'a Config,
    session: &'a mut S,
    exporter: E,
}

impl<'a, S: Session, E: Exporter<S>> Pipeline<'a, S, E> {
    pub fn new(config: &'a Config, session: &'a mut S, exporter: E) -> Self {
        Self {
            config,
            session,
            exporter,
        }
    }

    /// Process every configured partition, creating the output directory
    /// first.
    pub fn run(&mut self) -> Result<RunSummary> {
        let partitions = self.config.partitions.resolve()?;
        let dir = &self.config.output.dir;
        std::fs::create_dir_all(dir).map_err(|e| {
            SegzoneError::from(e).in_stage(Stage::Prepare, &dir.display().to_string())
        })?;
        self.run_partitions(&partitions)
    }

    /// Process the given partitions in order. Stops at the first failure
    /// whose policy is [`FailurePolicy::Abort`].
    pub fn run_partitions(&mut self, partitions: &[Partition]) -> Result<RunSummary> {
        let started = Instant::now();
        info!("Processing {total} partitions", total: partitions.len());

        let mut summary = RunSummary::default();
        for partition in partitions {
            summary.outcomes.push(self.process_partition(partition)?);
        }
        summary.elapsed = started.elapsed();

        info!(
            "Run complete: {ok} partitions succeeded, {failed} failed in {secs}s",
            ok: summary.succeeded(),
            failed: summary.failed(),
            secs: format!("{:.1}", summary.elapsed.as_secs_f64())
        );
        Ok(summary)
    }

    /// Run all stages for one partition and release its working tables.
    pub fn process_partition(&mut self, partition: &Partition) -> Result<PartitionOutcome> {
        let label = partition.to_string();
        info!("Processing partition {label}", label: label.as_str());

        let tables = WorkingTables::acquire(self.session, partition)
            .map_err(|e| e.in_stage(Stage::Prepare, &label))?;

        let mut outcome = PartitionOutcome::new(*partition);
        if let Err(err) = self.run_stages(partition, &tables, &mut outcome) {
            if let Err(rb) = self.session.rollback() {
                warn!(
                    "Rollback failed for {label}: {detail}",
                    label: label.as_str(),
                    detail: rb.chain()
                );
            }

            let chain = err.chain();
            match err.stage().map(Stage::policy) {
                Some(FailurePolicy::Continue) => {
                    warn!(
                        "Partition {label} failed, continuing: {chain}",
                        label: label.as_str(),
                        chain: chain.as_str()
                    );
                    outcome.failure = Some(chain);
                }
                Some(FailurePolicy::Abort) | None => {
                    error!(
                        "Partition {label} failed, aborting run: {chain}",
                        label: label.as_str(),
                        chain: chain.as_str()
                    );
                    if let Err(cleanup) = self.release(&tables) {
                        warn!(
                            "Cleanup after failure of {label} also failed: {detail}",
                            label: label.as_str(),
                            detail: cleanup.chain()
                        );
                    }
                    return Err(err);
                }
            }
        }

        self.release(&tables)
            .map_err(|e| e.in_stage(Stage::Cleanup, &label))?;

        info!(
            "Partition {label} done: {filtered} filtered, {zoned} zoned",
            label: label.as_str(),
            filtered: outcome.filtered_rows,
            zoned: outcome.zoned_rows
        );
        Ok(outcome)
    }

    fn run_stages(
        &mut self,
        partition: &Partition,
        tables: &WorkingTables,
        outcome: &mut PartitionOutcome,
    ) -> Result<()> {
        let config = self.config;
        let label = partition.to_string();
        let source = partition.table();

        ensure_spatial_index(self.session, config, &source)
            .map_err(|e| e.in_stage(Stage::EnsureIndex, &label))?;

        outcome.filtered_rows = filter_partition(self.session, config, &source, &tables.filtered)
            .map_err(|e| e.in_stage(Stage::Filter, &label))?;

        if config.filters.remove_overlaps {
            outcome.removed_rows = remove_overlaps(self.session, config, &tables.filtered)
                .map_err(|e| e.in_stage(Stage::RemoveOverlaps, &label))?;
        } else {
            debug!("Overlap removal disabled for {label}", label: label.as_str());
        }

        outcome.zoned_rows = assign_zones(self.session, config, &tables.filtered, &tables.zoned)
            .map_err(|e| e.in_stage(Stage::AssignZones, &label))?;

        let request = ExportRequest::for_partition(config, partition, &tables.zoned);
        let report = self
            .exporter
            .export(self.session, &request)
            .map_err(|e| e.in_stage(Stage::Export, &label))?;
        outcome.export = Some(report);
        Ok(())
    }

    fn release(&mut self, tables: &WorkingTables) -> Result<()> {
        if self.config.keep_working_tables {
            info!(
                "Keeping working tables {filtered} and {zoned}",
                filtered: tables.filtered.to_string(),
                zoned: tables.zoned.to_string()
            );
            return Ok(());
        }
        tables.release(self.session)
    }
}
