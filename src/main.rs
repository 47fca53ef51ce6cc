use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use tracing::error;

use crate::{
    client::config::MAX_PER_PAGE,
    logging::{init_logging, LoggingConfig},
    pipeline::{catch_unexpected, Summary},
    result::{Failure, RunResult},
};

mod client;
mod domain;
mod logging;
mod pipeline;
mod report;
mod result;
mod settings;

/// Lists every user of a GitLab instance and the unique email domains they use
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// GitLab instance URL [env: GITLAB_URL]
    #[arg(long, value_name = "URL")]
    pub gitlab_url: Option<String>,
    /// Personal access token [env: PRIVATE_TOKEN]
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
    /// Directory the reports are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
    /// Users requested per page
    #[arg(long, value_name = "N", default_value_t = MAX_PER_PAGE)]
    pub per_page: u32,
    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,
    /// Accept invalid TLS certificates, e.g. self-signed ones
    #[arg(long)]
    pub insecure: bool,
    /// Do not show a progress spinner while fetching
    #[arg(long)]
    pub no_progress: bool,
    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too, on stdout
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        },
    };

    let _log_guard = match init_logging(LoggingConfig::from_env().with_verbose(args.verbose)) {
        Ok(guard) => guard,
        Err(e) => {
            let failure = Failure::unexpected(format!("failed to initialize logging: {e}"));
            eprintln!("{failure}");
            return ExitCode::from(&failure);
        },
    };

    match run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(exit_code = failure.exit_code(), "{failure}");
            ExitCode::from(&failure)
        },
    }
}

fn run(args: Args) -> RunResult<Summary> {
    color_eyre::install()
        .map_err(|e| Failure::unexpected(format!("failed to install panic handler: {e}")))?;

    // One thread is enough: every request is awaited in turn
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Failure::unexpected(format!("failed to create runtime: {e}")))?;

    rt.block_on(catch_unexpected(pipeline::run(args)))
}
