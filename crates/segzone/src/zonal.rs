//! Zone assignment: fan each segment out over the zones it crosses.

use crate::config::Config;
use crate::error::Result;
use crate::ident::TableName;
use crate::index::ensure_spatial_index;
use crate::session::Session;
use crate::sql::{self, DuckFunc, Statement, poly, seg, st_intersection, st_intersects};
use diagnostics::{debug, info};
use sea_query::{Alias, Asterisk, Expr, Func, JoinType, Query};

#[derive(Debug, Clone)]
pub struct ZonalPlan {
    pub drop: Statement,
    pub create: Statement,
    pub swap: [Statement; 2],
    pub rescale: Statement,
    pub primary_key: Statement,
    pub count: Statement,
}

impl ZonalPlan {
    #[must_use]
    pub fn new(config: &Config, source: &TableName, target: &TableName) -> Self {
        let geom = &config.columns.geom;
        let ids = &config.ids;
        let (a, b) = (seg(), poly());
        let text = || Alias::new("VARCHAR");

        let combined = Func::cust(DuckFunc::Concat)
            .arg(Func::cast_as(Expr::col((b.clone(), ids.zone_id.alias())), text()))
            .arg(Func::cast_as(Expr::col((a.clone(), ids.segment_id.alias())), text()));

        let select = Query::select()
            .column((a.clone(), Asterisk))
            .expr_as(Expr::col((b.clone(), ids.zone_id.alias())), ids.zone_id.alias())
            .expr_as(combined, Config::combined_id().alias())
            .expr_as(
                st_intersection(
                    Expr::col((a.clone(), geom.alias())),
                    Expr::col((b.clone(), geom.alias())),
                ),
                Config::clipped_geom().alias(),
            )
            .from_as(source.table_ref(), a.clone())
            .join_as(
                JoinType::InnerJoin,
                config.areas.zone_table.table_ref(),
                b.clone(),
                st_intersects(
                    Expr::col((a, geom.alias())),
                    Expr::col((b, geom.alias())),
                ),
            )
            .to_owned();

        Self {
            drop: sql::drop_table(target),
            create: Statement::create_table_as(target, &select),
            swap: sql::swap_geometry(target, geom, &Config::clipped_geom()),
            rescale: sql::rescale(target, &config.columns),
            primary_key: Statement::add_primary_key(target, &Config::combined_id()),
            count: sql::count_rows(target),
        }
    }

    #[must_use]
    pub fn statements(&self) -> Vec<&Statement> {
        let mut out = vec![&self.drop, &self.create];
        out.extend(self.swap.iter());
        out.push(&self.rescale);
        out.push(&self.primary_key);
        out
    }

    /// Build the zone-assigned table and return its row count.
    ///
    /// The primary key is declared last; a duplicate `combined_id` fails here.
    pub fn execute<S: Session>(&self, session: &mut S) -> Result<usize> {
        session.execute(&self.drop)?;
        session.execute(&self.create)?;
        session.commit()?;

        for stmt in &self.swap {
            session.execute(stmt)?;
        }
        session.commit()?;

        session.execute(&self.rescale)?;
        session.commit()?;

        session.execute(&self.primary_key)?;
        session.commit()?;

        let rows = usize::try_from(session.query_count(&self.count)?).unwrap_or_default();
        Ok(rows)
    }
}

/// Join `source` against the zone table into `target`.
pub fn assign_zones<S: Session>(
    session: &mut S,
    config: &Config,
    source: &TableName,
    target: &TableName,
) -> Result<usize> {
    debug!(
        "Assigning {from} to zones of {zones}",
        from: source.to_string(),
        zones: config.areas.zone_table.to_string()
    );

    ensure_spatial_index(session, config, source)?;
    let rows = ZonalPlan::new(config, source, target).execute(session)?;

    info!(
        "Zone assignment complete: {rows} rows in {into}",
        rows: rows,
        into: target.to_string()
    );
    Ok(rows)
}
