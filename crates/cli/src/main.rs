//! Study Planner QA CLI - Main Entry Point
//!
//! Runs the console (static source) suite and the UI (browser) suite
//! against the Study Planner app. With no arguments both suites run and the
//! process exits 0 only if every check passed.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use planner_e2e::config::DEFAULT_CONFIG_FILE;
use planner_e2e::HarnessConfig;

mod commands;
mod interrupt;
mod output;

use commands::run::Suites;
use commands::ExitStatus;

/// Study Planner QA - browser and source checks
#[derive(Parser)]
#[command(name = "planner-qa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (missing file means defaults)
    #[arg(long, env = "PLANNER_QA_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Directory holding index.html, style.css and script-new.js
    #[arg(long, global = true)]
    app_root: Option<PathBuf>,

    /// URL the UI suite opens (defaults to the app root's index.html)
    #[arg(long, global = true)]
    app_url: Option<String>,

    /// Chrome or Chromium executable (auto-detected when unset)
    #[arg(long, env = "CHROME", global = true)]
    chrome: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headed: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the console suite, then the UI suite (default)
    Run,

    /// Run only the static source checks
    Console,

    /// Run only the browser checks
    Ui,

    /// Check that Chrome starts and renders a page
    Doctor,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = HarnessConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(root) = &self.app_root {
            config.app.root = root.clone();
        }
        if let Some(url) = &self.app_url {
            config.app.url = Some(url.clone());
        }
        if let Some(chrome) = &self.chrome {
            config.browser.executable = Some(chrome.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }

        Ok(config)
    }
}

/// First Ctrl-C cancels `cancel` so collected results still get reported;
/// a second one exits immediately
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if interrupt::watch(interrupt::ctrl_c_stream(), cancel).await {
            std::process::exit(ExitStatus::Interrupted.code());
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = cli.load_config()?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let status = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::execute(&config, Suites::All, &cancel).await,
        Commands::Console => commands::run::execute(&config, Suites::Console, &cancel).await,
        Commands::Ui => commands::run::execute(&config, Suites::Ui, &cancel).await,
        Commands::Doctor => commands::doctor::execute(&config).await,
    };

    std::process::exit(status.code());
}
