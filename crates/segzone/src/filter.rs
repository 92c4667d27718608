//! Statistical and spatial filtering of a partition into a working table.

use crate::config::Config;
use crate::error::{Result, SegzoneError};
use crate::ident::TableName;
use crate::session::Session;
use crate::sql::{self, DuckFunc, Statement, poly, seg, st_intersection, st_intersects};
use diagnostics::{debug, info};
use sea_query::{Asterisk, Expr, Func, JoinType, Query};

/// The statements that build the filtered working table, in execution
/// order. Each field is committed before the next runs.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub drop: Statement,
    pub create: Statement,
    /// Present when the AOI clip replaced the geometry.
    pub clip: Option<ClipFixup>,
    pub count: Statement,
}

/// Moves the clipped geometry into place and rescales length and duration.
#[derive(Debug, Clone)]
pub struct ClipFixup {
    pub swap: [Statement; 2],
    pub rescale: Statement,
}

impl FilterPlan {
    pub fn new(config: &Config, source: &TableName, target: &TableName) -> Result<Self> {
        let cols = &config.columns;
        let filters = &config.filters;
        let (a, b) = (seg(), poly());

        let mut select = Query::select();
        select
            .column((a.clone(), Asterisk))
            .from_as(source.table_ref(), a.clone());

        if filters.aoi_clip {
            let aoi = config.areas.clip_table.as_ref().ok_or_else(|| {
                SegzoneError::config("aoi_clip is enabled but areas.clip_table is not set")
            })?;

            // Dissolve the AOI so a segment crossing two AOI polygons stays one row.
            let dissolved = Query::select()
                .expr_as(
                    Func::cust(DuckFunc::StUnionAgg).arg(Expr::col(cols.geom.alias())),
                    cols.geom.alias(),
                )
                .from(aoi.table_ref())
                .to_owned();

            select
                .expr_as(
                    st_intersection(
                        Expr::col((a.clone(), cols.geom.alias())),
                        Expr::col((b.clone(), cols.geom.alias())),
                    ),
                    Config::clipped_geom().alias(),
                )
                .join_subquery(
                    JoinType::InnerJoin,
                    dissolved,
                    b.clone(),
                    st_intersects(
                        Expr::col((a.clone(), cols.geom.alias())),
                        Expr::col((b.clone(), cols.geom.alias())),
                    ),
                );
        }

        if filters.stat_filter {
            select
                .and_where(Expr::col((a.clone(), cols.sog.alias())).lt(filters.max_sog))
                .and_where(Expr::col((a.clone(), cols.length.alias())).lt(filters.max_length))
                .and_where(Expr::col((a.clone(), cols.duration.alias())).lt(filters.max_duration));
        }

        let clip = filters.aoi_clip.then(|| ClipFixup {
            swap: sql::swap_geometry(target, &cols.geom, &Config::clipped_geom()),
            rescale: sql::rescale(target, cols),
        });

        Ok(Self {
            drop: sql::drop_table(target),
            create: Statement::create_table_as(target, &select),
            clip,
            count: sql::count_rows(target),
        })
    }

    /// Every statement the plan executes, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<&Statement> {
        let mut out = vec![&self.drop, &self.create];
        if let Some(clip) = &self.clip {
            out.extend(clip.swap.iter());
            out.push(&clip.rescale);
        }
        out
    }

    /// Build the working table and return its row count.
    pub fn execute<S: Session>(&self, session: &mut S) -> Result<usize> {
        session.execute(&self.drop)?;
        session.execute(&self.create)?;
        session.commit()?;

        if let Some(clip) = &self.clip {
            for stmt in &clip.swap {
                session.execute(stmt)?;
            }
            session.commit()?;
            session.execute(&clip.rescale)?;
            session.commit()?;
        }

        let rows = usize::try_from(session.query_count(&self.count)?).unwrap_or_default();
        Ok(rows)
    }
}

/// Copy `source` into `target`, keeping only qualifying segments.
pub fn filter_partition<S: Session>(
    session: &mut S,
    config: &Config,
    source: &TableName,
    target: &TableName,
) -> Result<usize> {
    debug!(
        "Filtering {from} into {into} (stat_filter={stat}, aoi_clip={clip})",
        from: source.to_string(),
        into: target.to_string(),
        stat: config.filters.stat_filter,
        clip: config.filters.aoi_clip
    );

    let rows = FilterPlan::new(config, source, target)?.execute(session)?;
    info!(
        "Filter complete for {from}: {rows} rows in {into}",
        from: source.to_string(),
        rows: rows,
        into: target.to_string()
    );
    Ok(rows)
}
