//! mpiscan - MPI code inspector
//!
//! Compiles one MPI source file against every available version of a set of
//! MPI implementations, runs it, and reports what each version printed.
//!
//! ## Modes
//!
//! - scan: `mpiscan -s prog.c [-m openmpi,mpich] [-b]` resolves versions
//!   through spack, compiles and runs, then renders the results
//! - reload: `mpiscan -j results.json -f md` renders a previously saved JSON
//!   report without compiling anything

use anyhow::{Context, Result};
use clap::Parser;
use mpiscan_core::{
    load_result_set, render_report, scan, write_report, DriverConfig, ImplementationRequest,
    ResultSet, ScanError, DEFAULT_COMPILER, DEFAULT_IMPLEMENTATIONS,
};
use spack_env_manager::{is_spack_available, SpackClient, SpackConfig, DEFAULT_SPACK};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};

#[derive(Parser, Debug)]
#[command(name = "mpiscan")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "mpiscan MPI code inspector", long_about = None)]
struct Cli {
    /// Format used for the report
    #[arg(short, long, default_value = "json", value_parser = ["md", "json"])]
    format: String,

    /// Comma-separated MPI implementations to test
    #[arg(short, long, default_value = DEFAULT_IMPLEMENTATIONS)]
    mpis: String,

    /// Try to install missing MPI versions
    #[arg(short, long)]
    build: bool,

    /// Store the report in this file instead of printing it
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Previous JSON report to render (nothing is compiled or run)
    #[arg(short, long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// MPI source file to compile and run
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Timeout in seconds for each compile or run
    #[arg(
        short,
        long,
        env = "MPISCAN_TIMEOUT",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    /// Compiler wrapper, invoked as `<mpicc> <source> -o <exe>`
    #[arg(long, env = "MPISCAN_MPICC", default_value = DEFAULT_COMPILER)]
    mpicc: String,

    /// Spack executable
    #[arg(long, env = "MPISCAN_SPACK", default_value = DEFAULT_SPACK)]
    spack: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn driver_config(&self) -> DriverConfig {
        DriverConfig::new(&self.mpicc, Duration::from_secs(self.timeout))
    }

    fn requests(&self) -> Vec<ImplementationRequest> {
        ImplementationRequest::parse_list(&self.mpis, self.build)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    mpiscan_core::init_tracing(cli.log_json, level);

    let results = collect_results(&cli).await?;
    let report = render_report(results, &cli.format).context("Failed to render report")?;
    emit_report(&report, cli.out.as_deref())
}

async fn collect_results(cli: &Cli) -> Result<ResultSet> {
    if let Some(path) = &cli.json {
        info!(path = %path.display(), "Rendering previous results");
        return load_result_set(path)
            .with_context(|| format!("Failed to load results from {}", path.display()));
    }

    let source = cli.source.as_deref().ok_or(ScanError::MissingSource)?;

    let config = SpackConfig::new(&cli.spack);
    if !is_spack_available(&config).await {
        anyhow::bail!("spack executable '{}' cannot be run", config.spack_bin);
    }
    let client = SpackClient::new(config);

    let driver_config = cli.driver_config();
    debug!(compiler = ?driver_config.compiler, timeout_secs = cli.timeout, "Driver configured");

    scan(&client, &cli.requests(), source, driver_config)
        .await
        .with_context(|| format!("Failed to scan {}", source.display()))
}

fn emit_report(report: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            write_report(path, report)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => print!("{}", report),
    }
    Ok(())
}
