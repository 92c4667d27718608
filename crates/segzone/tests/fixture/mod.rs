//! In-memory database with one-dimensional stand-in geometry.
//!
//! Geometries are `DOUBLE[]` intervals `[start, end]` and the spatial
//! functions the pipeline calls are SQL macros over them, so the full
//! pipeline runs without the spatial extension. Lengths are `end - start`.

#![allow(dead_code)]

use anyhow::Result;
use duckdb::Connection;
use segzone::{Config, DuckSession, parse_config};
use std::path::Path;

const GEOMETRY_MACROS: &str = r#"
CREATE MACRO ST_Intersects(g1, g2) AS g1[1] < g2[2] AND g2[1] < g1[2];
CREATE MACRO ST_Intersection(g1, g2) AS [greatest(g1[1], g2[1]), least(g1[2], g2[2])];
CREATE MACRO ST_Length(g) AS g[2] - g[1];
CREATE MACRO ST_Union_Agg(g) AS [min(g[1]), max(g[2])];
"#;

const AREAS: &str = r#"
CREATE SCHEMA areas;
CREATE TABLE areas.aoi (geom DOUBLE[]);
INSERT INTO areas.aoi VALUES ([0.0, 60.0]), ([40.0, 100.0]);
CREATE TABLE areas.land (geom DOUBLE[]);
INSERT INTO areas.land VALUES ([70.0, 75.0]);
CREATE TABLE areas.grid (grid_id VARCHAR, geom DOUBLE[]);
INSERT INTO areas.grid VALUES ('A', [0.0, 50.0]), ('B', [50.0, 80.0]);
CREATE TABLE areas.bad_grid (grid_id VARCHAR, geom DOUBLE[]);
INSERT INTO areas.bad_grid VALUES ('A', [0.0, 50.0]), ('A1', [0.0, 50.0]);
"#;

/// January 2020. The trailing comment on each row is where it should end up.
const SEGMENTS_2020_01: &str = r#"
CREATE SCHEMA year2020;
CREATE TABLE year2020.segments_2020_01 (
    segmentid INTEGER, sogkt DOUBLE, lenm DOUBLE, duration DOUBLE, geom DOUBLE[]
);
INSERT INTO year2020.segments_2020_01 VALUES
    (1, 10.0, 20.0, 200.0, [10.0, 30.0]),      -- A1
    (2, 10.0, 20.0, 200.0, [40.0, 60.0]),      -- A2 and B2, half each
    (3, 10.0, 35.0, 350.0, [75.0, 110.0]),     -- clipped to [75, 100], then B3 [75, 80]
    (4, 100.0, 10.0, 100.0, [10.0, 20.0]),     -- too fast
    (5, 10.0, 20000.0, 100.0, [20.0, 25.0]),   -- too long
    (6, 10.0, 10.0, 100.0, [195.0, 205.0]),    -- outside the AOI
    (7, 10.0, 5.0, 50.0, [70.0, 75.0]),        -- on land
    (8, 10.0, 3.0, 30.0, [85.0, 88.0]);        -- no zone
"#;

const SEGMENTS_2020_02: &str = r#"
CREATE TABLE year2020.segments_2020_02 (
    segmentid INTEGER, sogkt DOUBLE, lenm DOUBLE, duration DOUBLE, geom DOUBLE[]
);
INSERT INTO year2020.segments_2020_02 VALUES
    (1, 5.0, 10.0, 60.0, [20.0, 30.0]),
    (11, 5.0, 10.0, 60.0, [30.0, 40.0]);
"#;

/// Database with both January and February 2020 loaded.
pub fn session() -> Result<DuckSession> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(GEOMETRY_MACROS)?;
    conn.execute_batch(AREAS)?;
    conn.execute_batch(SEGMENTS_2020_01)?;
    conn.execute_batch(SEGMENTS_2020_02)?;
    Ok(DuckSession::from_connection(conn))
}

/// Configuration for the fixture database writing CSV into `out`, for
/// January 2020 only. `extra` is appended as top-level YAML.
pub fn config(out: &Path, extra: &str) -> Result<Config> {
    let text = format!(
        r#"
database:
  extensions: []
areas:
  clip_table: areas.aoi
  zone_table: areas.grid
  overlap_table: areas.land
index:
  enabled: false
output:
  dir: {}
  format: csv
partitions:
  years: [2020]
  months: [1]
{extra}"#,
        out.display()
    );
    Ok(parse_config(&text)?)
}

/// Number of tables whose name matches the `LIKE` pattern.
pub fn table_count(session: &DuckSession, pattern: &str) -> Result<i64> {
    Ok(session.connection().query_row(
        "SELECT count(*) FROM information_schema.tables WHERE table_name LIKE ?",
        [pattern],
        |row| row.get(0),
    )?)
}

/// `(combined_id, grid_id, lenm, duration)` rows of an exported CSV file.
pub fn read_export(session: &DuckSession, path: &Path) -> Result<Vec<(String, String, f64, f64)>> {
    let sql = format!(
        "SELECT combined_id::VARCHAR, grid_id::VARCHAR, lenm::DOUBLE, duration::DOUBLE \
         FROM read_csv_auto('{}') ORDER BY combined_id",
        path.display()
    );
    let mut stmt = session.connection().prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
