//! Permission retry command.

use clap::Args;

use crate::output;
use staffdesk_auth::memory::LookupBehavior;
use staffdesk_core::error::AppError;

/// Arguments for the retry command
#[derive(Debug, Args)]
pub struct RetryArgs {
    /// Lookup behavior to switch to before retrying
    #[arg(long, value_enum)]
    pub then: Option<RetryBehavior>,
}

/// Lookup behavior selectable from the command line
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RetryBehavior {
    /// Answer with the fixture rows
    Respond,
    /// Fail with a remote error
    Fail,
    /// Never answer
    Hang,
}

impl From<RetryBehavior> for LookupBehavior {
    fn from(behavior: RetryBehavior) -> Self {
        match behavior {
            RetryBehavior::Respond => Self::Respond,
            RetryBehavior::Fail => Self::Fail,
            RetryBehavior::Hang => Self::Hang,
        }
    }
}

/// Execute the retry command
pub async fn execute(args: &RetryArgs, cli: &super::Cli) -> Result<(), AppError> {
    let (service, providers) = super::start_service(cli).await?;

    let before = service.ready().await?;
    output::print_kv("Before", &before.status.to_string());

    if let Some(behavior) = args.then {
        providers.lookup.set_behavior(behavior.into()).await;
    }

    match service.retry_permissions().await {
        Ok(staff) => output::print_success(&format!("Permissions resolved (staff: {staff})")),
        Err(e) => output::print_warning(&format!("Retry failed: {e}")),
    }
    output::print_snapshot(&service.snapshot(), cli.format);

    service.teardown();
    Ok(())
}
