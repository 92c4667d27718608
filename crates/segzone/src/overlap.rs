//! Removal of segments that touch the exclusion layer.

use crate::config::Config;
use crate::error::{Result, SegzoneError};
use crate::ident::TableName;
use crate::index::ensure_spatial_index;
use crate::session::Session;
use crate::sql::{Statement, poly, st_intersects};
use diagnostics::{debug, info};
use sea_query::{Asterisk, Expr, Query};

/// `DELETE FROM {table} WHERE EXISTS (SELECT * FROM {overlap} AS b WHERE ST_Intersects(...))`.
///
/// Any intersection removes the whole segment; nothing is clipped.
#[must_use]
pub fn delete_overlapping(table: &TableName, overlap: &TableName, config: &Config) -> Statement {
    let geom = &config.columns.geom;
    let b = poly();
    let touching = Query::select()
        .column(Asterisk)
        .from_as(overlap.table_ref(), b.clone())
        .and_where(st_intersects(
            Expr::col((table.local_name().alias(), geom.alias())),
            Expr::col((b, geom.alias())),
        ))
        .to_owned();

    Statement::query(
        &Query::delete()
            .from_table(table.table_ref())
            .and_where(Expr::exists(touching))
            .to_owned(),
    )
}

/// Delete every row of `table` that intersects the overlap table and return
/// how many were removed. The deletion is committed before returning.
pub fn remove_overlaps<S: Session>(
    session: &mut S,
    config: &Config,
    table: &TableName,
) -> Result<usize> {
    let overlap = config.areas.overlap_table.as_ref().ok_or_else(|| {
        SegzoneError::config("remove_overlaps is enabled but areas.overlap_table is not set")
    })?;

    debug!(
        "Removing rows of {name} that intersect {against}",
        name: table.to_string(),
        against: overlap.to_string()
    );

    ensure_spatial_index(session, config, table)?;
    let removed = session.execute(&delete_overlapping(table, overlap, config))?;
    session.commit()?;

    info!(
        "Removed {removed} overlapping rows from {name}",
        removed: removed,
        name: table.to_string()
    );
    Ok(removed)
}
