use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::ingest::paths::PathOverrides;

#[derive(Debug, Parser)]
#[command(
    name = "rig-ingest",
    version,
    about = "Merge test-station result archives into one date-tagged CSV"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args, Default)]
struct PathArgs {
    /// Directory holding the zip/tar/7z archives.
    #[arg(long)]
    archives_dir: Option<PathBuf>,
    /// Directory for the combined CSV and run logs.
    #[arg(long)]
    results_dir: Option<PathBuf>,
    /// Two-column key,value CSV used to rewrite station names.
    #[arg(long)]
    index_file: Option<PathBuf>,
}

impl From<PathArgs> for PathOverrides {
    fn from(args: PathArgs) -> Self {
        Self {
            archives_dir: args.archives_dir,
            results_dir: args.results_dir,
            index_file: args.index_file,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract, filter, date-tag, combine and index-rewrite every archive.
    Run {
        #[command(flatten)]
        paths: PathArgs,
        /// Only write the log files; keep the console quiet.
        #[arg(long)]
        quiet: bool,
    },
    /// Re-check the date column of merged CSVs from the last run.
    Verify {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Show resolved paths, configuration and recognised environment.
    Status {
        #[command(flatten)]
        paths: PathArgs,
    },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let report = match cli.command {
        Command::Run { paths, quiet } => commands::run::run(&commands::run::RunOptions {
            paths: paths.into(),
            echo: !quiet && !cli.json,
        })?,
        Command::Verify { paths } => commands::verify::run(&commands::verify::VerifyOptions {
            paths: paths.into(),
        })?,
        Command::Status { paths } => commands::status::run(&paths.into())?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        std::process::exit(2);
    }
    Ok(())
}
