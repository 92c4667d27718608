//! Plan command - prints the SQL a run would execute
//!
//! Nothing is opened or written: statements are recorded by a `PlanSession`
//! and the export step only renders its `COPY` statement.

use anyhow::{Context, Result};
use segzone::{
    CopyExporter, ExportReport, ExportRequest, Exporter, PlanEntry, PlanSession, Pipeline, Session,
};

use crate::common::{ConfigArgs, resolve_partitions};

/// Records the export statement without touching the output directory.
struct PlannedExport;

impl Exporter<PlanSession> for PlannedExport {
    fn export(
        &mut self,
        session: &mut PlanSession,
        request: &ExportRequest,
    ) -> segzone::Result<ExportReport> {
        session.execute(&CopyExporter::statement(request)?)?;
        session.commit()?;
        Ok(ExportReport {
            path: request.path.clone(),
            bytes: None,
        })
    }
}

pub fn plan_command(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    for line in plan_lines(&config)? {
        println!("{line}");
    }
    Ok(())
}

/// One line per recorded entry, with a header comment per partition.
pub fn plan_lines(config: &segzone::Config) -> Result<Vec<String>> {
    let mut session = PlanSession::new();
    let mut lines = Vec::new();

    for partition in resolve_partitions(config)? {
        let start = session.entries().len();
        Pipeline::new(config, &mut session, PlannedExport)
            .process_partition(&partition)
            .with_context(|| format!("Failed to plan {partition}"))?;

        lines.push(format!("-- {partition}"));
        lines.extend(session.entries()[start..].iter().map(render));
    }
    Ok(lines)
}

fn render(entry: &PlanEntry) -> String {
    match entry {
        PlanEntry::Execute(stmt) => stmt.to_string(),
        PlanEntry::Query(stmt) => format!("{stmt} -- row count"),
        PlanEntry::Commit => "COMMIT;".to_string(),
        PlanEntry::Rollback => "ROLLBACK;".to_string(),
    }
}
