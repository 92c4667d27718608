use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use segzone::{Config, Partition, load_config, validate_config};

/// Configuration file plus optional partition overrides
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the YAML configuration
    #[arg(short, long, default_value = "segzone.yaml")]
    pub config: PathBuf,

    /// Process only these years (repeatable); months default to the configured ones
    #[arg(long = "year")]
    pub years: Vec<u16>,

    /// Process only these months (repeatable); years default to the configured ones
    #[arg(long = "month")]
    pub months: Vec<u8>,
}

impl ConfigArgs {
    /// Load the configuration and apply the command-line partition overrides.
    pub fn load(&self) -> Result<Config> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("Failed to load configuration {}", self.config.display()))?;
        apply_overrides(&mut config, &self.years, &self.months)?;
        Ok(config)
    }
}

/// Replace the configured partitions with a years × months grid when either
/// list was given on the command line.
pub fn apply_overrides(config: &mut Config, years: &[u16], months: &[u8]) -> Result<()> {
    if years.is_empty() && months.is_empty() {
        return Ok(());
    }
    let years = if years.is_empty() {
        config.partitions.years.clone()
    } else {
        years.to_vec()
    };
    let months = if months.is_empty() {
        config.partitions.months.clone()
    } else {
        months.to_vec()
    };
    config.override_partitions(years, months);
    validate_config(config).context("Invalid partition override")?;
    Ok(())
}

pub fn resolve_partitions(config: &Config) -> Result<Vec<Partition>> {
    config
        .partitions
        .resolve()
        .context("Failed to resolve partitions")
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Size of an exported file for the run summary: whole bytes below 1 KiB,
/// otherwise KB or MB (binary multiples) with one decimal.
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    let scaled = |unit: u64| bytes as f64 / unit as f64;
    match bytes {
        b if b >= MIB => format!("{:.1}MB", scaled(MIB)),
        b if b >= KIB => format!("{:.1}KB", scaled(KIB)),
        b => format!("{b}B"),
    }
}
