// ABOUTME: CLI entry point for plan-replicator
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Parser, Subcommand};
use plan_replicator::commands;
use plan_replicator::config::{Config, SESSION_ENV};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plan-replicator")]
#[command(about = "Project-plan spreadsheet workflow: WIP reports, change tracking and replay", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Path to config.toml (defaults to ~/.plan-replicator/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Folder searched for plan and WIP files (overrides [workspace] folder)
    #[arg(long, global = true)]
    folder: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the WIP report workbook from the exported plan
    Report {
        /// Exported plan (defaults to the newest plan in the folder)
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Report path (defaults to a dated file next to the plan)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Mark up WIP edits in a "changes" sheet
    ///
    /// The WIP workbook is overwritten in place and any existing changes sheet
    /// is replaced.
    Changes {
        /// WIP workbook (defaults to the newest WIP report in the folder)
        #[arg(long)]
        wip: Option<PathBuf>,
    },
    /// Write WIP edits into a copy of the plan export
    Apply {
        #[arg(long)]
        wip: Option<PathBuf>,
        /// Plan export to update (defaults to the newest plan in the folder)
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Output path (defaults to <plan>_with_updates.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Map rows by this plan column instead of by key position
        #[arg(long)]
        anchor_column: Option<String>,
        /// WIP column holding the anchor value (defaults to the column projected from --anchor-column)
        #[arg(long, requires = "anchor_column")]
        anchor_source: Option<String>,
    },
    /// Run changes then apply
    Run {
        #[arg(long)]
        wip: Option<PathBuf>,
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay eligible rows into the live sheet through a WebDriver session
    Replicate {
        /// Workbook to replay (defaults to the newest _with_updates plan)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Only replay rows changed in the WIP workbook
        #[arg(long)]
        changed_only: bool,
        /// WIP workbook used by --changed-only
        #[arg(long)]
        wip: Option<PathBuf>,
        /// WebDriver session id
        #[arg(long, env = SESSION_ENV)]
        session: Option<String>,
        /// WebDriver server URL
        #[arg(long)]
        webdriver_url: Option<String>,
        /// Print the write sequence as JSON instead of driving the browser
        #[arg(long)]
        dry_run: bool,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
        /// Do not save the remote sheet afterwards
        #[arg(long)]
        no_save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(folder) = cli.folder {
        config.workspace.folder = folder;
    }
    let now = chrono::Local::now().naive_local();

    match cli.command {
        Commands::Report { plan, output } => {
            commands::report(&config, plan, output, now)?;
        }
        Commands::Changes { wip } => {
            commands::changes(&config, wip)?;
        }
        Commands::Apply {
            wip,
            plan,
            output,
            anchor_column,
            anchor_source,
        } => {
            if anchor_column.is_some() {
                config.apply.anchor_column = anchor_column;
                config.apply.anchor_source = anchor_source;
            }
            commands::apply(&config, wip, plan, output)?;
        }
        Commands::Run { wip, plan, output } => {
            commands::run(&config, wip, plan, output)?;
        }
        Commands::Replicate {
            source,
            changed_only,
            wip,
            session,
            webdriver_url,
            dry_run,
            yes,
            no_save,
        } => {
            let options = commands::ReplicateOptions {
                source,
                changed_only,
                wip,
                session,
                webdriver_url,
                dry_run,
                yes,
                no_save,
            };
            commands::replicate(&config, options, now).await?;
        }
    }

    Ok(())
}
