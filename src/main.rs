//! drive_shell CLI - Interactive console for a Google Shared Drive listing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use drive_shell::{shell, Authenticator, DriveClient};

/// Interactive console for timing and printing a Shared Drive listing.
#[derive(Parser)]
#[command(name = "drive_shell")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Authentication strategy.
    #[arg(long, value_enum, default_value_t = AuthMode::ServiceAccount)]
    auth: AuthMode,

    /// Path to the service account JSON key file.
    #[arg(
        long,
        env = "GOOGLE_APPLICATION_CREDENTIALS",
        default_value = "service-account.json"
    )]
    credentials: PathBuf,

    /// Path to the OAuth client secret JSON file (interactive login).
    #[arg(long, default_value = "credentials.json")]
    client_secret: PathBuf,

    /// Token cache written after each interactive login or refresh.
    #[arg(long, default_value = "token.json")]
    token_cache: PathBuf,

    /// Shared Drive ID to list.
    #[arg(long, env = "SHARED_DRIVE_ID", default_value = "0AM0wdzT81rNpUk9PVA")]
    drive_id: String,

    /// Subject the service account impersonates (domain-wide delegation).
    #[arg(long, env = "DELEGATED_SUBJECT", default_value = "elijah@w0lf.digital")]
    subject: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AuthMode {
    /// Interactive user login with a local token cache.
    Oauth,
    /// Non-interactive service identity.
    ServiceAccount,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let auth = match cli.auth {
        AuthMode::Oauth => Authenticator::installed(&cli.client_secret, &cli.token_cache)
            .with_context(|| {
                format!(
                    "Could not load OAuth client secret from {:?}",
                    cli.client_secret
                )
            })?,
        AuthMode::ServiceAccount => {
            Authenticator::service_account(&cli.credentials, Some(cli.subject.clone()))
                .with_context(|| {
                    format!("Could not load service account from {:?}", cli.credentials)
                })?
        }
    };

    // One eager token fetch so credential problems surface before the menu.
    auth.get_access_token()
        .await
        .context("Could not authenticate against the Drive API")?;

    let client = DriveClient::new(auth, cli.drive_id);

    shell::run(&client).await?;

    Ok(())
}
