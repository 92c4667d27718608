//! Database sessions.
//!
//! One session is opened per run and handed to every stage as `&mut`. Stages
//! decide where commits happen; a session only executes statements.

use crate::config::DatabaseConfig;
use crate::error::{Result, SegzoneError};
use crate::sql::Statement;
use diagnostics::debug;
use duckdb::Connection;
use duckdb::types::Value as DuckValue;
use sea_query::Value;

/// The operations stages need from a database.
pub trait Session {
    /// Execute one statement, returning the number of rows it changed.
    fn execute(&mut self, stmt: &Statement) -> Result<usize>;

    /// Run a query whose first column of the first row is an integer.
    fn query_count(&mut self, stmt: &Statement) -> Result<i64>;

    /// Make everything executed since the last commit durable.
    fn commit(&mut self) -> Result<()>;

    /// Abandon everything executed since the last commit.
    fn rollback(&mut self) -> Result<()>;
}

/// A DuckDB connection. Statements run inside an explicit transaction that
/// is opened on first use and closed by [`Session::commit`] or
/// [`Session::rollback`].
pub struct DuckSession {
    conn: Connection,
    in_transaction: bool,
}

impl DuckSession {
    /// Open the configured database and load its extensions.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let mut flags = duckdb::Config::default();
        if let Some(threads) = config.threads {
            flags = flags.threads(i64::from(threads))?;
        }
        if let Some(limit) = &config.memory_limit {
            flags = flags.max_memory(limit)?;
        }

        let conn = match &config.path {
            Some(path) => {
                debug!("Opening DuckDB database {path}", path: path.display().to_string());
                Connection::open_with_flags(path, flags)?
            }
            None => {
                debug!("Opening in-memory DuckDB database");
                Connection::open_in_memory_with_flags(flags)?
            }
        };

        for ext in &config.extensions {
            debug!("Loading extension {name}", name: ext.as_str());
            conn.execute_batch(&format!("INSTALL {ext}; LOAD {ext};"))?;
        }

        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection without loading anything.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
        }
    }

    /// Direct access to the connection, for callers that read results.
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN TRANSACTION")?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

impl Session for DuckSession {
    fn execute(&mut self, stmt: &Statement) -> Result<usize> {
        self.begin_if_needed()?;
        debug!("SQL: {sql}", sql: stmt.to_string());
        let params = to_duck_values(stmt.values())?;
        Ok(self
            .conn
            .execute(stmt.sql(), duckdb::params_from_iter(params))?)
    }

    fn query_count(&mut self, stmt: &Statement) -> Result<i64> {
        let params = to_duck_values(stmt.values())?;
        Ok(self.conn.query_row(
            stmt.sql(),
            duckdb::params_from_iter(params),
            |row| row.get::<_, i64>(0),
        )?)
    }

    fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.in_transaction {
            self.in_transaction = false;
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

/// Convert sea-query bound values into DuckDB parameters.
pub fn to_duck_values(values: &[Value]) -> Result<Vec<DuckValue>> {
    values.iter().map(to_duck_value).collect()
}

fn to_duck_value(value: &Value) -> Result<DuckValue> {
    let converted = match value {
        Value::Bool(v) => v.map_or(DuckValue::Null, DuckValue::Boolean),
        Value::TinyInt(v) => v.map_or(DuckValue::Null, DuckValue::TinyInt),
        Value::SmallInt(v) => v.map_or(DuckValue::Null, DuckValue::SmallInt),
        Value::Int(v) => v.map_or(DuckValue::Null, DuckValue::Int),
        Value::BigInt(v) => v.map_or(DuckValue::Null, DuckValue::BigInt),
        Value::TinyUnsigned(v) => v.map_or(DuckValue::Null, DuckValue::UTinyInt),
        Value::SmallUnsigned(v) => v.map_or(DuckValue::Null, DuckValue::USmallInt),
        Value::Unsigned(v) => v.map_or(DuckValue::Null, DuckValue::UInt),
        Value::BigUnsigned(v) => v.map_or(DuckValue::Null, DuckValue::UBigInt),
        Value::Float(v) => v.map_or(DuckValue::Null, DuckValue::Float),
        Value::Double(v) => v.map_or(DuckValue::Null, DuckValue::Double),
        Value::String(v) => v
            .as_ref()
            .map_or(DuckValue::Null, |s| DuckValue::Text(s.as_ref().clone())),
        Value::Char(v) => v.map_or(DuckValue::Null, |c| DuckValue::Text(c.to_string())),
        Value::Bytes(v) => v
            .as_ref()
            .map_or(DuckValue::Null, |b| DuckValue::Blob(b.as_ref().clone())),
        #[allow(unreachable_patterns)]
        other => {
            return Err(SegzoneError::UnsupportedValue {
                value: format!("{other:?}"),
            });
        }
    };
    Ok(converted)
}

/// Records statements instead of running them. Counts are always zero.
///
/// Used to print what a run would execute.
#[derive(Debug, Default)]
pub struct PlanSession {
    entries: Vec<PlanEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanEntry {
    Execute(Statement),
    Query(Statement),
    Commit,
    Rollback,
}

impl PlanSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Executed statements only, in order.
    pub fn executed(&self) -> impl Iterator<Item = &Statement> {
        self.entries.iter().filter_map(|e| match e {
            PlanEntry::Execute(stmt) => Some(stmt),
            _ => None,
        })
    }
}

impl Session for PlanSession {
    fn execute(&mut self, stmt: &Statement) -> Result<usize> {
        self.entries.push(PlanEntry::Execute(stmt.clone()));
        Ok(0)
    }

    fn query_count(&mut self, stmt: &Statement) -> Result<i64> {
        self.entries.push(PlanEntry::Query(stmt.clone()));
        Ok(0)
    }

    fn commit(&mut self) -> Result<()> {
        self.entries.push(PlanEntry::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.entries.push(PlanEntry::Rollback);
        Ok(())
    }
}
