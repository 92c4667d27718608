//! Lifecycle of the per-partition working tables.
//!
//! Working tables live in the session's default schema and are named after
//! the partition: `temp_{partition}` after filtering and
//! `intertemp_{partition}` after zone assignment. `acquire` drops any stale
//! copies left by an earlier run; `release` drops them again and is called on
//! every exit path of a partition.

use crate::error::Result;
use crate::ident::TableName;
use crate::partition::Partition;
use crate::session::Session;
use crate::sql::{self, Statement};
use diagnostics::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingTables {
    /// Filtered, then overlap-cleaned, segments.
    pub filtered: TableName,
    /// One row per segment and intersecting zone.
    pub zoned: TableName,
}

impl WorkingTables {
    #[must_use]
    pub fn for_partition(partition: &Partition) -> Self {
        let local = partition.local_name();
        Self {
            filtered: TableName::local(local.with_prefix("temp_")),
            zoned: TableName::local(local.with_prefix("intertemp_")),
        }
    }

    /// Drop any leftovers from a previous run and return the table names.
    pub fn acquire<S: Session>(session: &mut S, partition: &Partition) -> Result<Self> {
        let tables = Self::for_partition(partition);
        tables.drop_all(session)?;
        Ok(tables)
    }

    /// Drop both tables if they exist.
    pub fn release<S: Session>(&self, session: &mut S) -> Result<()> {
        debug!(
            "Releasing working tables {filtered} and {zoned}",
            filtered: self.filtered.to_string(),
            zoned: self.zoned.to_string()
        );
        self.drop_all(session)
    }

    #[must_use]
    pub fn drop_statements(&self) -> [Statement; 2] {
        [sql::drop_table(&self.zoned), sql::drop_table(&self.filtered)]
    }

    fn drop_all<S: Session>(&self, session: &mut S) -> Result<()> {
        for stmt in &self.drop_statements() {
            session.execute(stmt)?;
        }
        session.commit()
    }
}
