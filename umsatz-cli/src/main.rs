use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use umsatz_core::report::{EXIT_AUTH, EXIT_USAGE};
use umsatz_core::parse_de_date;

mod config;
mod output;
mod prompt;
mod run;

#[derive(Parser, Debug)]
#[command(
    name = "umsatz",
    version,
    about = "Export DKB giro and credit card transactions as CSV"
)]
struct Cli {
    /// Banking user id (same as used for the web login)
    #[arg(long)]
    userid: String,

    /// Output directory for the per-account CSV files
    #[arg(long, short = 'o', default_value = ".")]
    output: PathBuf,

    /// Export transactions as of this date (dd.mm.yyyy); default: 180 days back
    #[arg(long, value_parser = parse_cli_date)]
    from_date: Option<NaiveDate>,

    /// Export transactions up to this date (dd.mm.yyyy); default: today
    #[arg(long, value_parser = parse_cli_date)]
    to_date: Option<NaiveDate>,

    /// Config file (TOML); built-in defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose transport logging
    #[arg(long)]
    debug: bool,

    /// Never prompt; read the PIN from stdin and fail where interaction
    /// would be required
    #[arg(long)]
    batch: bool,
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    parse_de_date(s).map_err(|_| format!("expected dd.mm.yyyy, got {s:?}"))
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => EXIT_USAGE,
            };
            std::process::exit(code);
        }
    };

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let code = match run::run(cli).await {
        Ok(report) => {
            run::print_summary(&report);
            report.exit_code()
        }
        Err(run::RunError::Usage(message)) => {
            eprintln!("{message}");
            EXIT_USAGE
        }
        Err(e) => {
            tracing::error!("{e}");
            EXIT_AUTH
        }
    };
    std::process::exit(code);
}
