//! Spatial index maintenance.

use crate::config::Config;
use crate::error::Result;
use crate::ident::{Ident, TableName};
use crate::session::Session;
use crate::sql::Statement;
use diagnostics::debug;
use sea_query::{Index, IndexType, SeaRc};

/// `idx_{table}`, living in the table's schema.
#[must_use]
pub fn index_name(table: &TableName) -> Ident {
    table.local_name().with_prefix("idx_")
}

/// `CREATE INDEX IF NOT EXISTS idx_{table} ON {table} USING {method} ({geom})`.
#[must_use]
pub fn create_index_statement(table: &TableName, geom: &Ident, method: &Ident) -> Statement {
    Statement::schema(
        &Index::create()
            .if_not_exists()
            .name(index_name(table).as_str())
            .table(table.table_ref())
            .col(geom.alias())
            .index_type(IndexType::Custom(SeaRc::new(method.alias())))
            .to_owned(),
    )
}

/// Make sure `table` has a spatial index on its geometry column.
///
/// Working tables are created without indexes, so this runs again on each
/// of them before a spatial predicate touches it.
pub fn ensure_spatial_index<S: Session>(
    session: &mut S,
    config: &Config,
    table: &TableName,
) -> Result<()> {
    if !config.index.enabled {
        debug!("Spatial indexes disabled, skipping {name}", name: table.to_string());
        return Ok(());
    }
    debug!("Ensuring spatial index on {name}", name: table.to_string());
    session.execute(&create_index_statement(
        table,
        &config.columns.geom,
        &config.index.method,
    ))?;
    session.commit()
}
