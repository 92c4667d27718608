//! Run command - executes the pipeline over the configured partitions
//!
//! Example:
//!   segzone run -c segzone.yaml --year 2020 --month 1 --month 2
//!
//! Export failures are reported per partition and do not change the exit
//! status; any other stage failure ends the run with an error.

use anyhow::{Context, Result};
use clap::Args;
use diagnostics::info;
use segzone::{CopyExporter, DuckSession, Pipeline, RunSummary};

use crate::common::{ConfigArgs, format_file_size};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Leave working tables in the database for inspection
    #[arg(long)]
    pub keep_working_tables: bool,
}

pub fn run_command(args: &RunArgs) -> Result<()> {
    let mut config = args.config.load()?;
    if args.keep_working_tables {
        config.keep_working_tables = true;
    }

    let mut session = DuckSession::open(&config.database).context("Failed to open database")?;
    let db = config
        .database
        .path
        .as_ref()
        .map_or_else(|| ":memory:".to_string(), |p| p.display().to_string());
    info!("Opened database {db}", db: db);

    let summary = Pipeline::new(&config, &mut session, CopyExporter)
        .run()
        .context("Pipeline run failed")?;

    for line in summary_lines(&summary) {
        println!("{line}");
    }
    Ok(())
}

fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = Vec::with_capacity(summary.outcomes.len() + 1);
    for outcome in &summary.outcomes {
        let counts = format!(
            "{} filtered, {} removed, {} zoned",
            outcome.filtered_rows, outcome.removed_rows, outcome.zoned_rows
        );
        let status = match (&outcome.export, &outcome.failure) {
            (_, Some(failure)) => format!("FAILED ({failure})"),
            (Some(report), None) => match report.bytes {
                Some(bytes) => format!("{} ({})", report.path.display(), format_file_size(bytes)),
                None => report.path.display().to_string(),
            },
            (None, None) => "not exported".to_string(),
        };
        lines.push(format!("{}: {counts} -> {status}", outcome.partition));
    }
    lines.push(format!(
        "{} partitions succeeded, {} failed in {:.1}s",
        summary.succeeded(),
        summary.failed(),
        summary.elapsed.as_secs_f64()
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use segzone::{ExportReport, Partition, PartitionOutcome};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_summary_lines() -> Result<()> {
        let summary = RunSummary {
            outcomes: vec![
                PartitionOutcome {
                    partition: Partition::new(2020, 1)?,
                    filtered_rows: 5,
                    removed_rows: 1,
                    zoned_rows: 4,
                    export: Some(ExportReport {
                        path: PathBuf::from("out/grid_segments_2020_01.gpkg"),
                        bytes: Some(2048),
                    }),
                    failure: None,
                },
                PartitionOutcome {
                    partition: Partition::new(2020, 2)?,
                    filtered_rows: 2,
                    removed_rows: 0,
                    zoned_rows: 2,
                    export: None,
                    failure: Some("disk full".to_string()),
                },
            ],
            elapsed: Duration::from_millis(1500),
        };

        let lines = summary_lines(&summary);
        assert_eq!(
            lines,
            vec![
                "year2020.segments_2020_01: 5 filtered, 1 removed, 4 zoned -> out/grid_segments_2020_01.gpkg (2.0KB)",
                "year2020.segments_2020_02: 2 filtered, 0 removed, 2 zoned -> FAILED (disk full)",
                "1 partitions succeeded, 1 failed in 1.5s",
            ]
        );
        Ok(())
    }
}
