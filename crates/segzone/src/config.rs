//! Run configuration, loaded from YAML.

use crate::error::{Result, SegzoneError};
use crate::export::ExportFormat;
use crate::ident::{Ident, TableName};
use crate::partition::{self, Partition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run needs. Passed by shared reference to every stage.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub areas: AreaConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub index: IndexConfig,
    pub output: OutputConfig,
    pub partitions: PartitionConfig,
    /// Leave working tables in place after each partition for inspection.
    #[serde(default)]
    pub keep_working_tables: bool,
}

/// Embedded DuckDB database holding the `year{Y}` schemas and polygon tables.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file; in-memory when absent.
    pub path: Option<PathBuf>,
    /// Extensions installed and loaded when the session opens.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<Ident>,
    pub threads: Option<u32>,
    /// DuckDB memory limit, e.g. `8GB`.
    pub memory_limit: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            extensions: default_extensions(),
            threads: None,
            memory_limit: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default = "yes")]
    pub stat_filter: bool,
    #[serde(default = "yes")]
    pub aoi_clip: bool,
    #[serde(default = "yes")]
    pub remove_overlaps: bool,
    /// Speed-over-ground ceiling, knots.
    #[serde(default = "default_max_sog")]
    pub max_sog: f64,
    /// Segment length ceiling, metres.
    #[serde(default = "default_max_length")]
    pub max_length: f64,
    /// Segment duration ceiling, seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            stat_filter: true,
            aoi_clip: true,
            remove_overlaps: true,
            max_sog: default_max_sog(),
            max_length: default_max_length(),
            max_duration: default_max_duration(),
        }
    }
}

/// Polygon tables. `clip_table` and `overlap_table` are only required when
/// the corresponding filter is enabled.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    pub clip_table: Option<TableName>,
    pub zone_table: TableName,
    pub overlap_table: Option<TableName>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct IdConfig {
    #[serde(default = "default_segment_id")]
    pub segment_id: Ident,
    #[serde(default = "default_zone_id")]
    pub zone_id: Ident,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            segment_id: default_segment_id(),
            zone_id: default_zone_id(),
        }
    }
}

/// Physical column names of the segment tables. Polygon tables share `geom`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    #[serde(default = "default_geom")]
    pub geom: Ident,
    #[serde(default = "default_sog")]
    pub sog: Ident,
    #[serde(default = "default_length")]
    pub length: Ident,
    #[serde(default = "default_duration")]
    pub duration: Ident,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            geom: default_geom(),
            sog: default_sog(),
            length: default_length(),
            duration: default_duration(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    #[serde(default = "yes")]
    pub enabled: bool,
    /// Index access method, `RTREE` for the spatial extension.
    #[serde(default = "default_index_method")]
    pub method: Ident,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            method: default_index_method(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default)]
    pub format: ExportFormat,
    /// Spatial reference written by the GDAL formats, e.g. `EPSG:3857`.
    pub srs: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    #[serde(default)]
    pub years: Vec<u16>,
    #[serde(default)]
    pub months: Vec<u8>,
    /// Individual partitions processed after the years × months grid.
    #[serde(default)]
    pub include: Vec<Partition>,
}

impl PartitionConfig {
    /// The partitions to process, in order, without repeats.
    pub fn resolve(&self) -> Result<Vec<Partition>> {
        let mut all = partition::enumerate(&self.years, &self.months)?;
        for p in &self.include {
            all.push(Partition::new(p.year, p.month)?);
        }
        Ok(partition::dedup_in_order(all))
    }
}

fn yes() -> bool {
    true
}

fn default_extensions() -> Vec<Ident> {
    vec![Ident::trusted("spatial".to_string())]
}

fn default_max_sog() -> f64 {
    87.0
}

fn default_max_length() -> f64 {
    10_000.0
}

fn default_max_duration() -> f64 {
    21_600.0
}

fn default_segment_id() -> Ident {
    Ident::trusted("segmentid".to_string())
}

fn default_zone_id() -> Ident {
    Ident::trusted("grid_id".to_string())
}

fn default_geom() -> Ident {
    Ident::trusted("geom".to_string())
}

fn default_sog() -> Ident {
    Ident::trusted("sogkt".to_string())
}

fn default_length() -> Ident {
    Ident::trusted("lenm".to_string())
}

fn default_duration() -> Ident {
    Ident::trusted("duration".to_string())
}

fn default_index_method() -> Ident {
    Ident::trusted("RTREE".to_string())
}

/// Columns the pipeline adds to working tables.
pub const COMBINED_ID: &str = "combined_id";
pub const CLIPPED_GEOM: &str = "clipped_geom";

impl Config {
    #[must_use]
    pub fn combined_id() -> Ident {
        Ident::trusted(COMBINED_ID.to_string())
    }

    #[must_use]
    pub fn clipped_geom() -> Ident {
        Ident::trusted(CLIPPED_GEOM.to_string())
    }

    /// Replace the configured partitions with a years × months grid.
    pub fn override_partitions(&mut self, years: Vec<u16>, months: Vec<u8>) {
        self.partitions = PartitionConfig {
            years,
            months,
            include: Vec::new(),
        };
    }
}

/// Load configuration from YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_yaml_ng::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.partitions.resolve()?.is_empty() {
        return Err(SegzoneError::config("at least one partition must be configured"));
    }

    let f = &config.filters;
    if f.stat_filter {
        for (name, value) in [
            ("max_sog", f.max_sog),
            ("max_length", f.max_length),
            ("max_duration", f.max_duration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SegzoneError::config(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
    }

    if f.aoi_clip && config.areas.clip_table.is_none() {
        return Err(SegzoneError::config("aoi_clip is enabled but areas.clip_table is not set"));
    }
    if f.remove_overlaps && config.areas.overlap_table.is_none() {
        return Err(SegzoneError::config(
            "remove_overlaps is enabled but areas.overlap_table is not set",
        ));
    }

    let ids = &config.ids;
    if ids.segment_id == ids.zone_id {
        return Err(SegzoneError::config(format!(
            "segment_id and zone_id must differ, both are {}",
            ids.segment_id
        )));
    }
    for added in [COMBINED_ID, CLIPPED_GEOM] {
        if ids.zone_id.as_str() == added {
            return Err(SegzoneError::config(format!(
                "zone_id may not be named {added}, the pipeline adds that column"
            )));
        }
    }

    if let Some(srs) = &config.output.srs {
        let valid = srs
            .split_once(':')
            .is_some_and(|(auth, code)| {
                !auth.is_empty()
                    && auth.chars().all(|c| c.is_ascii_alphabetic())
                    && !code.is_empty()
                    && code.chars().all(|c| c.is_ascii_digit())
            });
        if !valid {
            return Err(SegzoneError::config(format!(
                "output.srs must look like AUTHORITY:CODE, got {srs:?}"
            )));
        }
    }

    Ok(())
}

/// Example configuration written by `segzone init`.
pub const EXAMPLE_CONFIG: &str = r#"# segzone configuration

database:
  # DuckDB database holding year{YYYY}.segments_{YYYY}_{MM} tables
  path: ais.duckdb
  extensions: [spatial]

filters:
  stat_filter: true
  aoi_clip: true
  remove_overlaps: true
  max_sog: 87          # knots
  max_length: 10000    # metres
  max_duration: 21600  # seconds

areas:
  clip_table: areas.area_of_interest
  zone_table: areas.grid
  overlap_table: areas.land

ids:
  segment_id: segmentid
  zone_id: grid_id

output:
  dir: output
  format: gpkg

partitions:
  years: [2020]
  months: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
"#;

/// Write the example configuration, refusing to overwrite an existing file.
pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(SegzoneError::config(format!(
            "configuration file already exists: {}",
            path.display()
        )));
    }
    std::fs::write(path, EXAMPLE_CONFIG)?;
    Ok(())
}
