mod fixture;

use anyhow::Result;
use fixture::assert_close;
use segzone::filter::filter_partition;
use segzone::overlap::remove_overlaps;
use segzone::zonal::assign_zones;
use segzone::{Partition, WorkingTables};
use tempfile::tempdir;

fn count(session: &segzone::DuckSession, sql: &str) -> Result<i64> {
    Ok(session.connection().query_row(sql, [], |row| row.get(0))?)
}

/// Every filtered row is under the ceilings and inside the AOI
#[test]
fn test_filter_properties() -> Result<()> {
    let tmp = tempdir()?;
    let cfg = fixture::config(tmp.path(), "")?;
    let mut session = fixture::session()?;
    let partition = Partition::new(2020, 1)?;
    let tables = WorkingTables::acquire(&mut session, &partition)?;

    let rows = filter_partition(&mut session, &cfg, &partition.table(), &tables.filtered)?;
    assert_eq!(rows, 5);
    assert_eq!(
        count(
            &session,
            "SELECT count(*) FROM temp_segments_2020_01
             WHERE sogkt >= 87 OR lenm >= 10000 OR duration >= 21600",
        )?,
        0
    );

    // Clipped geometry never extends past the dissolved AOI [0, 100].
    assert_eq!(
        count(
            &session,
            "SELECT count(*) FROM temp_segments_2020_01 WHERE geom[1] < 0 OR geom[2] > 100",
        )?,
        0
    );

    // Length follows the geometry and duration scales with it.
    let (len, duration): (f64, f64) = session.connection().query_row(
        "SELECT lenm, duration FROM temp_segments_2020_01 WHERE segmentid = 3",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    assert_close(len, 25.0);
    assert_close(duration, 350.0 * 25.0 / 35.0);

    tables.release(&mut session)?;
    Ok(())
}

/// Overlap removal deletes whole segments and running it twice changes nothing
#[test]
fn test_overlap_removal_idempotent() -> Result<()> {
    let tmp = tempdir()?;
    let cfg = fixture::config(tmp.path(), "")?;
    let mut session = fixture::session()?;
    let partition = Partition::new(2020, 1)?;
    let tables = WorkingTables::acquire(&mut session, &partition)?;

    filter_partition(&mut session, &cfg, &partition.table(), &tables.filtered)?;
    assert_eq!(remove_overlaps(&mut session, &cfg, &tables.filtered)?, 1);
    assert_eq!(remove_overlaps(&mut session, &cfg, &tables.filtered)?, 0);

    assert_eq!(
        count(
            &session,
            "SELECT count(*) FROM temp_segments_2020_01 t, areas.land l
             WHERE ST_Intersects(t.geom, l.geom)",
        )?,
        0
    );
    // Segment 3 touches land only at a point and stays.
    assert_eq!(
        count(&session, "SELECT count(*) FROM temp_segments_2020_01 WHERE segmentid = 3")?,
        1
    );

    tables.release(&mut session)?;
    Ok(())
}

/// Zone fan-out: one row per intersecting zone, none for a segment outside all zones
#[test]
fn test_zone_fan_out() -> Result<()> {
    let tmp = tempdir()?;
    let cfg = fixture::config(tmp.path(), "")?;
    let mut session = fixture::session()?;
    let partition = Partition::new(2020, 1)?;
    let tables = WorkingTables::acquire(&mut session, &partition)?;

    filter_partition(&mut session, &cfg, &partition.table(), &tables.filtered)?;
    remove_overlaps(&mut session, &cfg, &tables.filtered)?;
    let rows = assign_zones(&mut session, &cfg, &tables.filtered, &tables.zoned)?;
    assert_eq!(rows, 4);

    let mut stmt = session.connection().prepare(
        "SELECT combined_id, grid_id FROM intertemp_segments_2020_01
         WHERE segmentid = 2 ORDER BY combined_id",
    )?;
    let pairs: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(
        pairs,
        vec![
            ("A2".to_string(), "A".to_string()),
            ("B2".to_string(), "B".to_string()),
        ]
    );

    assert_eq!(
        count(&session, "SELECT count(*) FROM intertemp_segments_2020_01 WHERE segmentid = 8")?,
        0
    );

    // combined_id is now the primary key.
    let dup = session
        .connection()
        .execute_batch("INSERT INTO intertemp_segments_2020_01 SELECT * FROM intertemp_segments_2020_01 LIMIT 1");
    assert!(dup.is_err());

    tables.release(&mut session)?;
    assert_eq!(fixture::table_count(&session, "%temp_segments_2020_01")?, 0);
    Ok(())
}
