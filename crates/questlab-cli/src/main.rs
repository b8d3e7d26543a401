//! QuestLab CLI: validate and store quest media from the command line.
//!
//! Reads configuration from the environment (and `.env`): UPLOAD_FOLDER,
//! MAX_CONTENT_LENGTH_MB, ALLOWED_EXTENSIONS, UPLOAD_RATE_LIMIT, LOG_FILTER.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use questlab_cli::{check_upload, render, FeedbackReport, OutputFormat, TextReport};
use questlab_core::validation::normalize_tags;
use questlab_core::{AppError, QuestlabConfig};
use questlab_infra::{init_telemetry, log_error, shutdown_telemetry, ErrorResponse};
use questlab_services::{
    create_storage, ActionRateLimiter, FeedbackAnalyzer, SubmissionIntake, SubmissionService,
    UploadPipeline, UploadValidator,
};

#[derive(Parser)]
#[command(name = "questlab", about = "QuestLab media validation and intake")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload checks on a file without storing it
    Check {
        /// Path to the file
        file: PathBuf,
        /// Filename to validate as (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Validate a file and store it in the upload folder
    Store {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        /// Client identifier for the upload rate limit
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Store a file and submit it with a reflection
    Submit {
        file: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        reflection: String,
        /// Comma-separated quest tags
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long, default_value = "cli")]
        client: String,
    },
    /// Keyword feedback for a reflection
    Feedback {
        /// Comma-separated quest tags
        #[arg(long, default_value = "")]
        tags: String,
        /// Reflection text
        text: String,
    },
}

fn display_name(file: &Path, name: Option<String>) -> String {
    name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}

async fn read_file(file: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}

fn emit<T: Serialize + TextReport>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render(value, format)?);
    Ok(())
}

async fn pipeline(config: &QuestlabConfig) -> anyhow::Result<UploadPipeline> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize upload storage")?;
    Ok(UploadPipeline::new(
        Arc::new(UploadValidator::from_config(config)),
        ActionRateLimiter::from_config(config),
        storage,
    ))
}

/// Exit code on success; a rejected `check` is reported, not raised.
async fn run(cli: Cli, config: &QuestlabConfig) -> Result<ExitCode, AppError> {
    let format = cli.format;
    match cli.command {
        Commands::Check { file, name } => {
            let filename = display_name(&file, name);
            let mut stream = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?
                .into_std()
                .await;
            let validator = UploadValidator::from_config(config);
            let report = check_upload(&validator, &filename, &mut stream)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            emit(&report, format)?;
            if !report.accepted {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Store { file, name, client } => {
            let filename = display_name(&file, name);
            let data = read_file(&file).await?;
            let stored = pipeline(config).await?.store(&client, &filename, data).await?;
            emit(&stored, format)?;
        }
        Commands::Submit {
            file,
            name,
            reflection,
            tags,
            client,
        } => {
            let filename = display_name(&file, name);
            let data = read_file(&file).await?;
            let service = SubmissionService::new(pipeline(config).await?, SubmissionIntake::default());
            let receipt = service
                .submit(&client, &filename, data, &reflection, &tags)
                .await?;
            emit(&receipt, format)?;
        }
        Commands::Feedback { tags, text } => {
            let tags = normalize_tags(&tags);
            let analyzer = FeedbackAnalyzer::new();
            let report = FeedbackReport {
                concepts: analyzer.matched_concepts(&text, &tags),
                feedback: analyzer.analyze(&text, &tags),
                tags,
            };
            emit(&report, format)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = QuestlabConfig::from_env().context("Invalid configuration")?;
    init_telemetry(&config.environment, &config.log_filter)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let format = cli.format;
    let code = match run(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            log_error(&e);
            let response = ErrorResponse::from_error(&e, !config.is_production());
            emit(&response, format)?;
            ExitCode::FAILURE
        }
    };

    shutdown_telemetry();
    Ok(code)
}
