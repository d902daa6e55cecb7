//! MediScan CLI
//!
//! A command-line tool for listing the disease models served by a MediScan
//! server, submitting predictions, managing accounts and training model
//! artifacts locally.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{account, models, predict, train};
use mediscan_lib::Disease;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// MediScan CLI
#[derive(Parser)]
#[command(name = "mediscan")]
#[command(author, version, about = "CLI for the MediScan prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (defaults to the config file value, then http://localhost:8080)
    #[arg(long, env = "MEDISCAN_API_URL")]
    pub api_url: Option<String>,

    /// Output format (defaults to the config file value, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List disease models and whether they are loaded
    Models,

    /// Show the input form fields for a model
    Schema {
        /// Model key (diabetes, heart, parkinson)
        disease: Disease,
    },

    /// Submit a prediction request
    Predict {
        /// Model key (diabetes, heart, parkinson)
        disease: Disease,

        /// Input value as name=value (repeatable)
        #[arg(long = "field", short = 'f')]
        fields: Vec<String>,

        /// JSON file with input values; --field entries take precedence
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Register a new account
    Register {
        /// Username
        username: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Password
        #[arg(long, env = "MEDISCAN_PASSWORD")]
        password: String,
    },

    /// Log in with an existing account
    Login {
        /// Username
        username: String,

        /// Password
        #[arg(long, env = "MEDISCAN_PASSWORD")]
        password: String,
    },

    /// Train model artifacts from local CSV datasets
    Train {
        /// Directory containing <disease>.csv datasets
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory to write model artifacts into
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Train a single model instead of all of them
        #[arg(long)]
        disease: Option<Disease>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    let format = config.format(cli.format);

    let api_url = config.api_url(cli.api_url);
    debug!(api_url = %api_url, format = ?format, "Resolved CLI settings");
    let client = || client::ApiClient::new(&api_url);

    match cli.command {
        Commands::Models => models::list_models(&client()?, format).await?,
        Commands::Schema { disease } => models::show_schema(&client()?, disease, format).await?,
        Commands::Predict {
            disease,
            fields,
            input,
        } => {
            predict::predict(&client()?, disease, &fields, input.as_deref(), format).await?;
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            account::register(&client()?, &username, &password, email, format).await?;
        }
        Commands::Login { username, password } => {
            account::login(&client()?, &username, &password, format).await?;
        }
        Commands::Train {
            data_dir,
            models_dir,
            disease,
        } => {
            let data_dir = data_dir
                .or(config.data_dir)
                .unwrap_or_else(|| PathBuf::from("data"));
            let models_dir = models_dir
                .or(config.models_dir)
                .unwrap_or_else(|| PathBuf::from("models"));
            train::train(&data_dir, &models_dir, disease, format)?;
        }
    }

    Ok(())
}
