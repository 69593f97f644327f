//! CLI command definitions and dispatch.

pub mod bootstrap;
pub mod config;
pub mod retry;
pub mod sign_in;

use clap::{Parser, Subcommand};

use staffdesk_auth::SessionService;
use staffdesk_core::config::AppConfig;
use staffdesk_core::error::AppError;

use crate::fixture::{Fixture, Providers};
use crate::output::OutputFormat;

/// StaffDesk session and staff permission driver
#[derive(Debug, Parser)]
#[command(name = "staffdesk", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file, without extension
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded next to the base file
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Provider fixture to run against
    #[arg(long, default_value = "fixtures/demo.json")]
    pub fixture: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run bootstrap and print the resulting session state
    Bootstrap(bootstrap::BootstrapArgs),
    /// Sign in with email and password
    SignIn(sign_in::SignInArgs),
    /// Bootstrap, then force a strict permission re-check
    Retry(retry::RetryArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Bootstrap(args) => bootstrap::execute(args, self).await,
            Commands::SignIn(args) => sign_in::execute(args, self).await,
            Commands::Retry(args) => retry::execute(args, self).await,
            Commands::Config(args) => config::execute(args, self).await,
        }
    }
}

/// Helper: load configuration for the selected environment
pub fn load_config(cli: &Cli) -> Result<AppConfig, AppError> {
    AppConfig::load_from(&cli.config, &cli.env)
}

/// Helper: build providers from the fixture and start the session service
pub async fn start_service(cli: &Cli) -> Result<(SessionService, Providers), AppError> {
    let config = load_config(cli)?;
    let fixture = Fixture::load(&cli.fixture).await?;
    let providers = fixture.providers(config.session.event_buffer_size).await?;

    let service = SessionService::start(
        providers.identity.clone(),
        providers.lookup.clone(),
        &config.session,
    )?;
    Ok((service, providers))
}
