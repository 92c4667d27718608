//! Export of the zone-assigned working table to a file.

use crate::config::Config;
use crate::error::{Result, SegzoneError};
use crate::ident::TableName;
use crate::partition::Partition;
use crate::session::Session;
use crate::sql::Statement;
use diagnostics::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output format, named by its file extension.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Gpkg,
    Shp,
    Geojson,
    Fgb,
    Parquet,
    Csv,
}

impl ExportFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Gpkg => "gpkg",
            Self::Shp => "shp",
            Self::Geojson => "geojson",
            Self::Fgb => "fgb",
            Self::Parquet => "parquet",
            Self::Csv => "csv",
        }
    }

    /// GDAL driver name for formats written through the spatial extension.
    #[must_use]
    pub fn gdal_driver(self) -> Option<&'static str> {
        match self {
            Self::Gpkg => Some("GPKG"),
            Self::Shp => Some("ESRI Shapefile"),
            Self::Geojson => Some("GeoJSON"),
            Self::Fgb => Some("FlatGeobuf"),
            Self::Parquet | Self::Csv => None,
        }
    }

    /// Files a driver writes next to the main output.
    #[must_use]
    pub fn sidecar_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Shp => &["shx", "dbf", "prj", "cpg"],
            _ => &[],
        }
    }

    /// Options clause of `COPY ... TO`.
    fn copy_options(self, srs: Option<&str>) -> String {
        match (self.gdal_driver(), self) {
            (Some(driver), _) => match srs {
                Some(srs) => format!(
                    "(FORMAT GDAL, DRIVER '{driver}', SRS '{}')",
                    srs.replace('\'', "''")
                ),
                None => format!("(FORMAT GDAL, DRIVER '{driver}')"),
            },
            (None, Self::Csv) => "(FORMAT CSV, HEADER)".to_string(),
            (None, _) => "(FORMAT PARQUET)".to_string(),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SegzoneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gpkg" => Ok(Self::Gpkg),
            "shp" => Ok(Self::Shp),
            "geojson" => Ok(Self::Geojson),
            "fgb" => Ok(Self::Fgb),
            "parquet" => Ok(Self::Parquet),
            "csv" => Ok(Self::Csv),
            _ => Err(SegzoneError::UnknownFormat {
                format: s.to_string(),
            }),
        }
    }
}

/// What the orchestrator hands to an [`Exporter`] for one partition.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub path: PathBuf,
    pub table: TableName,
    pub format: ExportFormat,
    pub srs: Option<String>,
}

impl ExportRequest {
    /// `{output.dir}/{zone_table}_{partition}.{format}` for `table`.
    #[must_use]
    pub fn for_partition(config: &Config, partition: &Partition, table: &TableName) -> Self {
        let format = config.output.format;
        let file_name = format!(
            "{}_{}.{}",
            config.areas.zone_table.local_name(),
            partition.local_name(),
            format.extension()
        );
        Self {
            path: config.output.dir.join(file_name),
            table: table.clone(),
            format,
            srs: config.output.srs.clone(),
        }
    }
}

/// A successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    /// Size of the written file, when it could be read back.
    pub bytes: Option<u64>,
}

/// Writes one working table to a file.
pub trait Exporter<S: Session> {
    fn export(&mut self, session: &mut S, request: &ExportRequest) -> Result<ExportReport>;
}

/// Exports with the database's own `COPY ... TO`, GDAL-backed for the
/// geospatial formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyExporter;

impl CopyExporter {
    pub fn statement(request: &ExportRequest) -> Result<Statement> {
        Ok(Statement::raw(format!(
            "COPY (SELECT * FROM {}) TO {} {}",
            request.table.quoted(),
            quote_path(&request.path)?,
            request.format.copy_options(request.srs.as_deref())
        )))
    }
}

impl<S: Session> Exporter<S> for CopyExporter {
    fn export(&mut self, session: &mut S, request: &ExportRequest) -> Result<ExportReport> {
        let path = &request.path;
        debug!(
            "Exporting {format} to {target}",
            format: request.format.extension(),
            target: path.display().to_string()
        );

        let written = remove_existing(request)
            .and_then(|()| Self::statement(request))
            .and_then(|stmt| session.execute(&stmt))
            .and_then(|_| session.commit());
        if let Err(err) = written {
            let err = export_error(path, err);
            error!("Export failed: {chain}", chain: err.chain());
            return Err(err);
        }

        let bytes = std::fs::metadata(path).ok().map(|m| m.len());
        info!("Exported {target}", target: path.display().to_string());
        Ok(ExportReport {
            path: path.clone(),
            bytes,
        })
    }
}

/// GDAL drivers refuse to write over an existing dataset, so clear the
/// target and, for shapefiles, the files written alongside it.
fn remove_existing(request: &ExportRequest) -> Result<()> {
    let path = &request.path;
    let sidecars = request
        .format
        .sidecar_extensions()
        .iter()
        .map(|ext| path.with_extension(ext));
    for file in std::iter::once(path.clone()).chain(sidecars) {
        if file.exists() {
            std::fs::remove_file(&file)?;
        }
    }
    Ok(())
}

fn export_error(path: &Path, source: SegzoneError) -> SegzoneError {
    SegzoneError::Export {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// COPY targets cannot be bound parameters; render a single-quoted literal.
fn quote_path(path: &Path) -> Result<String> {
    let text = path
        .to_str()
        .ok_or_else(|| SegzoneError::config(format!("output path is not UTF-8: {}", path.display())))?;
    Ok(format!("'{}'", text.replace('\'', "''")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::session::DuckSession;

    fn config(format: &str) -> Config {
        parse_config(&format!(
            r#"
areas:
  clip_table: areas.aoi
  zone_table: areas.grid
  overlap_table: areas.land
output:
  dir: /data/out
  format: {format}
partitions:
  years: [2020]
  months: [1]
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_output_file_name() {
        let cfg = config("gpkg");
        let p = Partition::new(2020, 1).unwrap();
        let table: TableName = "intertemp_segments_2020_01".parse().unwrap();
        let req = ExportRequest::for_partition(&cfg, &p, &table);
        assert_eq!(req.path, PathBuf::from("/data/out/grid_segments_2020_01.gpkg"));
    }

    #[test]
    fn test_copy_statement_gdal() {
        let cfg = config("shp");
        let p = Partition::new(2020, 1).unwrap();
        let table: TableName = "intertemp_segments_2020_01".parse().unwrap();
        let stmt = CopyExporter::statement(&ExportRequest::for_partition(&cfg, &p, &table)).unwrap();
        assert_eq!(
            stmt.sql(),
            "COPY (SELECT * FROM \"intertemp_segments_2020_01\") TO \
             '/data/out/grid_segments_2020_01.shp' (FORMAT GDAL, DRIVER 'ESRI Shapefile')"
        );
    }

    #[test]
    fn test_copy_statement_quotes_path() {
        let req = ExportRequest {
            path: PathBuf::from("/tmp/o'brien/x.parquet"),
            table: "t".parse().unwrap(),
            format: ExportFormat::Parquet,
            srs: None,
        };
        let stmt = CopyExporter::statement(&req).unwrap();
        assert!(stmt.sql().contains("'/tmp/o''brien/x.parquet' (FORMAT PARQUET)"));
    }

    #[test]
    fn test_remove_existing_clears_shapefile_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExportRequest {
            path: dir.path().join("grid_segments_2020_01.shp"),
            table: "t".parse().unwrap(),
            format: ExportFormat::Shp,
            srs: None,
        };
        for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
            std::fs::write(req.path.with_extension(ext), b"stale").unwrap();
        }
        let unrelated = dir.path().join("grid_segments_2020_02.dbf");
        std::fs::write(&unrelated, b"keep").unwrap();

        remove_existing(&req).unwrap();

        for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
            assert!(!req.path.with_extension(ext).exists(), "{ext} left behind");
        }
        assert!(unrelated.exists());
    }

    #[test]
    fn test_remove_existing_single_file_formats() {
        let dir = tempfile::tempdir().unwrap();
        let req = ExportRequest {
            path: dir.path().join("grid_segments_2020_01.csv"),
            table: "t".parse().unwrap(),
            format: ExportFormat::Csv,
            srs: None,
        };
        let neighbour = req.path.with_extension("dbf");
        std::fs::write(&req.path, b"stale").unwrap();
        std::fs::write(&neighbour, b"keep").unwrap();

        remove_existing(&req).unwrap();
        assert!(!req.path.exists());
        assert!(neighbour.exists());

        // Nothing to remove is not an error.
        remove_existing(&req).unwrap();
    }

    #[test]
    fn test_export_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let conn = duckdb::Connection::open_in_memory().unwrap();
        let mut session = DuckSession::from_connection(conn);
        let req = ExportRequest {
            path: dir.path().join("grid_segments_2020_01.csv"),
            table: "missing_table".parse().unwrap(),
            format: ExportFormat::Csv,
            srs: None,
        };

        let err = CopyExporter.export(&mut session, &req).unwrap_err();
        match &err {
            SegzoneError::Export { path, .. } => assert_eq!(path, &req.path),
            other => panic!("expected export error, got {other:?}"),
        }
        assert!(err.chain().contains("missing_table"));
        assert!(!req.path.exists());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("GeoJSON".parse::<ExportFormat>().unwrap(), ExportFormat::Geojson);
        assert!(matches!(
            "kml".parse::<ExportFormat>(),
            Err(SegzoneError::UnknownFormat { .. })
        ));
    }
}
