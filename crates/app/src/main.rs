//! Gatekey CLI - Main Entry Point
//!
//! Obtains a usable access token for the configured client and prints it to
//! stdout, walking the user through the authorization-code flow when the
//! provider requires human consent.

use std::io;

use gatekey_application::TokenManager;
use gatekey_domain::{AuthError, Credentials, TokenKind};
use gatekey_infrastructure::{HttpTransport, SystemClock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn required_env(name: &str) -> Result<String, Box<dyn std::error::Error>> {
    std::env::var(name).map_err(|_| format!("{name} must be set").into())
}

fn read_code() -> Result<String, Box<dyn std::error::Error>> {
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    Ok(code.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get configuration from environment
    let client_id = required_env("GATEKEY_CLIENT_ID")?;
    let client_secret = required_env("GATEKEY_CLIENT_SECRET")?;
    let kind = std::env::var("GATEKEY_TOKEN_KIND")
        .unwrap_or_else(|_| "application".to_string())
        .parse::<TokenKind>()?;
    let scopes = std::env::var("GATEKEY_SCOPES").unwrap_or_default();

    let mut credentials = Credentials::new(client_id, client_secret);
    if let Ok(redirect_uri) = std::env::var("GATEKEY_REDIRECT_URI") {
        credentials = credentials.with_redirect_uri(redirect_uri);
    }

    let manager = TokenManager::new(HttpTransport::new(credentials), SystemClock::new(), kind)
        .with_scopes(scopes.split_whitespace())
        .on_update(|snapshot| {
            tracing::info!(kind = %snapshot.kind, "tokens updated, persist them if needed");
        });

    match manager.access_token().await {
        Ok(token) => {
            println!("{token}");
            Ok(())
        }
        Err(AuthError::NeedsAuthorization { link }) => {
            eprintln!("1. Open URL in your browser:");
            eprintln!("\t{link}");
            eprintln!("2. Authorize the application.");
            eprintln!("3. Copy the `code` parameter from the redirected URL.");
            eprintln!("4. Insert below:");
            let code = read_code()?;
            manager.set_code(&code).await?;
            println!("{}", manager.access_token().await?);
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}
