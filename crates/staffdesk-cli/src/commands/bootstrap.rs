//! Bootstrap command.

use clap::Args;

use crate::output;
use staffdesk_core::error::AppError;

/// Arguments for the bootstrap command
#[derive(Debug, Args)]
pub struct BootstrapArgs {
    /// Also run a background revalidation after bootstrap
    #[arg(long)]
    pub revalidate: bool,
}

/// Execute the bootstrap command
pub async fn execute(args: &BootstrapArgs, cli: &super::Cli) -> Result<(), AppError> {
    let (service, providers) = super::start_service(cli).await?;

    let mut snapshot = service.ready().await?;
    if args.revalidate && snapshot.principal.is_some() {
        service.revalidate().await?;
        snapshot = service.snapshot();
    }

    output::print_snapshot(&snapshot, cli.format);
    tracing::debug!(lookups = providers.lookup.calls(), "Bootstrap command finished");

    service.teardown();
    Ok(())
}
