use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use diagnostics::Verbosity;

mod commands;
mod common;

use commands::run::RunArgs;
use common::ConfigArgs;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "segzone")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log at debug level, including every generated statement
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, clean, zone and export every configured partition
    Run(RunArgs),
    /// Print the SQL a run would execute without opening the database
    Plan(ConfigArgs),
    /// List the partition tables a run would process
    Partitions(ConfigArgs),
    /// Write an example configuration file
    Init {
        /// Where to write the configuration
        #[arg(default_value = "segzone.yaml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        diagnostics::init_with(Verbosity::Min(emit::Level::Debug));
    } else {
        diagnostics::init_diagnostics();
    }

    match &cli.command {
        Commands::Run(args) => commands::run_command(args),
        Commands::Plan(args) => commands::plan_command(args),
        Commands::Partitions(args) => commands::partitions_command(args),
        Commands::Init { path } => commands::init_command(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "segzone",
            "run",
            "-c",
            "cfg.yaml",
            "--year",
            "2020",
            "--month",
            "1",
            "--month",
            "2",
            "--keep-working-tables",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config.config, PathBuf::from("cfg.yaml"));
        assert_eq!(args.config.years, vec![2020]);
        assert_eq!(args.config.months, vec![1, 2]);
        assert!(args.keep_working_tables);
    }
}
