mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use vox_agent::Assistant;
use vox_config::{config_dir, config_file_path, load_and_prepare};
use vox_logging::init_logger;

#[derive(Parser)]
#[command(name = "vox")]
#[command(about = "Vox: command resolution and scenario tracking for a voice assistant")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.vox/config.yaml or $VOX_CONFIG_DIR/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read requests from stdin, one per line, and print replies
    Run {
        /// Register the sample weather scenario
        #[arg(long)]
        demo: bool,
    },
    /// Print the commands found in TEXT as JSON
    Resolve { text: String },
    /// Print the recognizer vocabulary
    Grammar,
    /// Print the effective config and any validation findings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let (config, report) = load_and_prepare(&path).await?;

    init_logger(&config.log_dir, &config.log_level);
    report.log();

    match cli.command {
        Commands::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            for finding in &report.warnings {
                eprintln!("{}", finding);
            }
            report.into_result()?;
        }
        Commands::Resolve { text } => {
            let assistant = Assistant::from_config(config).await?;
            let resolved = assistant.resolve(&text).await;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Commands::Grammar => {
            let assistant = Assistant::from_config(config).await?;
            println!("{}", assistant.grammar().await);
        }
        Commands::Run { demo } => {
            let assistant = Assistant::from_config(config).await?;
            if demo {
                assistant.add_scenario(demo::weather_scenario()?).await;
            }
            run_loop(&assistant).await?;
        }
    }

    Ok(())
}

async fn run_loop(assistant: &Assistant) -> Result<()> {
    info!(
        session_id = %assistant.session_id(),
        commands = assistant.command_count().await,
        "Vox ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(outcome) = assistant.handle(&line).await else {
            continue;
        };
        for reply in &outcome.replies {
            println!("{}", reply);
        }
        for report in outcome.reports.iter().filter(|r| r.error.is_some()) {
            warn!(action = %report.action, error = ?report.error, "Action did not complete");
        }
    }

    info!("Input closed; shutting down");
    Ok(())
}
