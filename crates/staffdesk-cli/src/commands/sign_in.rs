//! Sign-in command.

use clap::Args;

use crate::output;
use staffdesk_core::error::AppError;

/// Arguments for the sign-in command
#[derive(Debug, Args)]
pub struct SignInArgs {
    /// Account email
    #[arg(short = 'u', long)]
    pub email: String,
    /// Password (will prompt if not provided)
    #[arg(short, long)]
    pub password: Option<String>,
    /// Sign out again once permissions are resolved
    #[arg(long)]
    pub sign_out: bool,
}

/// Execute the sign-in command
pub async fn execute(args: &SignInArgs, cli: &super::Cli) -> Result<(), AppError> {
    let password = match &args.password {
        Some(p) => p.clone(),
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?,
    };

    let (service, _providers) = super::start_service(cli).await?;
    service.ready().await?;

    let principal = service.sign_in(&args.email, &password).await?;
    let snapshot = service.ready().await?;
    output::print_success(&format!("Signed in as {}", principal.user_id));
    output::print_snapshot(&snapshot, cli.format);

    if args.sign_out {
        service.sign_out().await?;
        output::print_success("Signed out");
        output::print_snapshot(&service.snapshot(), cli.format);
    }

    service.teardown();
    Ok(())
}
