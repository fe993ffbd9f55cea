//! `imgflow` -- command-line front end for the image workflow builder.
//!
//! Lists the available stages, checks and converts saved sequence files,
//! and talks to a ComfyUI instance (submit, upload, history, health).
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                 | Description                     |
//! |------------------------|----------|-------------------------|---------------------------------|
//! | `COMFYUI_URL`          | no       | `http://127.0.0.1:8188` | ComfyUI base URL                |
//! | `COMFYUI_CLIENT_ID`    | no       | `workflow-builder`      | Client id sent with prompts     |
//! | `COMFYUI_TIMEOUT_SECS` | no       | --                      | Per-request timeout             |
//! | `RUST_LOG`             | no       | `imgflow_cli=info,imgflow_comfyui=info` | Log filter      |

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgflow_cli::commands;
use imgflow_cli::error::CliError;
use imgflow_comfyui::api::ComfyUIApi;
use imgflow_comfyui::config::ComfyUIConfig;

/// Build, check and run image-processing workflows on ComfyUI
#[derive(Parser)]
#[command(name = "imgflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// ComfyUI base URL (overrides COMFYUI_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the stages that can be added to a sequence
    Stages,
    /// Validate a sequence file
    Check {
        /// Path to the sequence file (JSON)
        file: PathBuf,
    },
    /// Print the ComfyUI document for a sequence file
    Convert {
        /// Path to the sequence file (JSON)
        file: PathBuf,
    },
    /// Validate and submit a sequence file
    Submit {
        /// Path to the sequence file (JSON)
        file: PathBuf,
    },
    /// Upload an image for use by an upload stage
    Upload {
        /// Path to the image file
        image: PathBuf,
    },
    /// Print the ComfyUI execution history
    History,
    /// Check whether ComfyUI is reachable
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgflow_cli=info,imgflow_comfyui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ComfyUIConfig::from_env();
    if let Some(url) = cli.url {
        config = config.with_api_url(url);
    }

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &ComfyUIConfig) -> Result<ExitCode, CliError> {
    match command {
        Command::Stages => {
            print!("{}", commands::render_stages());
        }
        Command::Check { file } => {
            let report = commands::check(&commands::load_sequence(&file)?);
            print!("{}", report.render());
            if !report.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Convert { file } => {
            println!("{}", commands::convert(&commands::load_sequence(&file)?)?);
        }
        Command::Submit { file } => {
            let sequence = commands::load_sequence(&file)?;
            let api = ComfyUIApi::from_config(config)?;
            let response = commands::submit(&api, &sequence).await?;
            println!("{}", commands::submit_label(&response));
        }
        Command::Upload { image } => {
            let api = ComfyUIApi::from_config(config)?;
            let uploaded = commands::upload(&api, &image).await?;
            println!("{}", commands::upload_label(&uploaded, &image));
        }
        Command::History => {
            let api = ComfyUIApi::from_config(config)?;
            println!("{}", commands::history(&api).await?);
        }
        Command::Health => {
            let api = ComfyUIApi::from_config(config)?;
            if api.check_health().await {
                println!("ComfyUI reachable at {}", api.api_url());
            } else {
                println!("ComfyUI unreachable at {}", api.api_url());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
