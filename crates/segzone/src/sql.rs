//! Statement construction.
//!
//! Statements are built with sea-query in the Postgres dialect, which DuckDB
//! parses as-is. Names come from [`Ident`]/[`TableName`] and values are kept
//! aside as bound parameters. The handful of statements sea-query does not
//! model are assembled from quoted identifiers only.

use crate::config::ColumnConfig;
use crate::ident::{Ident, TableName};
use sea_query::{
    Alias, Asterisk, Expr, Func, FunctionCall, Iden, PostgresQueryBuilder, Query,
    QueryStatementWriter, SchemaStatementBuilder, SelectStatement, SimpleExpr, Table, Value,
};
use std::fmt;

/// Functions resolved by the database's spatial engine.
#[derive(Iden)]
pub enum DuckFunc {
    #[iden = "ST_Intersects"]
    StIntersects,
    #[iden = "ST_Intersection"]
    StIntersection,
    #[iden = "ST_Length"]
    StLength,
    #[iden = "ST_Union_Agg"]
    StUnionAgg,
    Concat,
}

/// Table alias used for the segment side of a join.
pub(crate) fn seg() -> Alias {
    Alias::new("a")
}

/// Table alias used for the polygon side of a join.
pub(crate) fn poly() -> Alias {
    Alias::new("b")
}

pub(crate) fn st_intersects(a: impl Into<SimpleExpr>, b: impl Into<SimpleExpr>) -> SimpleExpr {
    Func::cust(DuckFunc::StIntersects).arg(a).arg(b).into()
}

pub(crate) fn st_intersection(a: impl Into<SimpleExpr>, b: impl Into<SimpleExpr>) -> FunctionCall {
    Func::cust(DuckFunc::StIntersection).arg(a).arg(b)
}

pub(crate) fn st_length(g: impl Into<SimpleExpr>) -> SimpleExpr {
    Func::cust(DuckFunc::StLength).arg(g).into()
}

/// A SQL string plus the values bound to its `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    values: Vec<Value>,
}

impl Statement {
    /// A statement without bound values.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    pub fn query<Q: QueryStatementWriter>(stmt: &Q) -> Self {
        let (sql, values) = stmt.build(PostgresQueryBuilder);
        Self {
            sql,
            values: values.0,
        }
    }

    pub fn schema<S: SchemaStatementBuilder>(stmt: &S) -> Self {
        Self::raw(stmt.build(PostgresQueryBuilder))
    }

    /// `CREATE TABLE <table> AS <select>`, keeping the select's bound values.
    #[must_use]
    pub fn create_table_as(table: &TableName, select: &SelectStatement) -> Self {
        let (sql, values) = select.build(PostgresQueryBuilder);
        Self {
            sql: format!("CREATE TABLE {} AS {}", table.quoted(), sql),
            values: values.0,
        }
    }

    /// `ALTER TABLE <table> ADD PRIMARY KEY (<column>)`.
    #[must_use]
    pub fn add_primary_key(table: &TableName, column: &Ident) -> Self {
        Self::raw(format!(
            "ALTER TABLE {} ADD PRIMARY KEY ({})",
            table.quoted(),
            column.quoted()
        ))
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.sql)?;
        if !self.values.is_empty() {
            write!(f, " -- ")?;
            for (i, v) in self.values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "${} = {:?}", i + 1, v)?;
            }
        }
        Ok(())
    }
}

/// `DROP TABLE IF EXISTS <table>`.
#[must_use]
pub fn drop_table(table: &TableName) -> Statement {
    Statement::schema(&Table::drop().table(table.table_ref()).if_exists().to_owned())
}

/// `SELECT COUNT(*) FROM <table>`.
#[must_use]
pub fn count_rows(table: &TableName) -> Statement {
    Statement::query(
        &Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(table.table_ref())
            .to_owned(),
    )
}

/// Replace `geom` with the `clipped` column produced by a clipping join.
#[must_use]
pub fn swap_geometry(table: &TableName, geom: &Ident, clipped: &Ident) -> [Statement; 2] {
    [
        Statement::schema(
            &Table::alter()
                .table(table.table_ref())
                .drop_column(geom.alias())
                .to_owned(),
        ),
        Statement::schema(
            &Table::alter()
                .table(table.table_ref())
                .rename_column(clipped.alias(), geom.alias())
                .to_owned(),
        ),
    ]
}

/// Rescale length and duration after the geometry was replaced by a clipped
/// part of itself.
///
/// Duration is assumed to be spread uniformly along the segment:
/// `duration = duration * (ST_Length(geom) / length)` and
/// `length = ST_Length(geom)`. Both right-hand sides read the pre-update
/// row. Rows whose stored length is not positive keep their duration.
#[must_use]
pub fn rescale(table: &TableName, columns: &ColumnConfig) -> Statement {
    let new_length = st_length(Expr::col(columns.geom.alias()));
    let ratio = Expr::expr(new_length.clone()).div(Expr::col(columns.length.alias()));
    let duration = Expr::case(
        Expr::col(columns.length.alias()).gt(0.0),
        Expr::col(columns.duration.alias()).mul(ratio),
    )
    .finally(Expr::col(columns.duration.alias()));

    Statement::query(
        &Query::update()
            .table(table.table_ref())
            .value(columns.duration.alias(), duration)
            .value(columns.length.alias(), new_length)
            .to_owned(),
    )
}
