//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output;
use staffdesk_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the merged configuration
    Show,
    /// Validate the merged configuration
    Validate,
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, cli: &super::Cli) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(cli)?;
            output::print_item(&config, cli.format);
        }
        ConfigCommand::Validate => match super::load_config(cli) {
            Ok(config) => {
                output::print_success(&format!(
                    "Configuration '{}' ({}) is valid",
                    cli.config, cli.env
                ));
                output::print_kv(
                    "Bootstrap timeout",
                    &format!("{}ms", config.session.bootstrap_timeout_ms),
                );
                output::print_kv(
                    "Permission timeout",
                    &format!("{}ms", config.session.permission_timeout_ms),
                );
                output::print_kv("Event buffer", &config.session.event_buffer_size.to_string());
                output::print_kv(
                    "Logging",
                    &format!("{} ({})", config.logging.level, config.logging.format),
                );
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {}", e));
                return Err(e);
            }
        },
    }

    Ok(())
}
