//! HomeHeaven CLI - sign in, inspect the stored session, and call the API
//! with the stored token.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use homeheaven_session::{
    ApiClient, Config, FetchOptions, FetchOutcome, KeyValueStore, Navigator, PageGuard,
    SessionStore,
};

const USAGE: &str = "usage: homeheaven <login [username] | logout | whoami | headers | get <path>>";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// There is no browser to redirect, so point the user at `login` instead.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Redirect to login");
        eprintln!("Not signed in. Run `homeheaven login` to sign in.");
    }
}

type Store = Arc<dyn KeyValueStore>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    let mut config = Config::load()?;
    let session = SessionStore::new(config.open_store()?);
    let client = ApiClient::from_config(&config, session.clone())?;
    let guard = PageGuard::new(session, TerminalNavigator).with_login_page(config.login_page.clone());

    match command.as_str() {
        "login" => login(&mut config, &client, args.get(1).cloned()).await,
        "logout" => logout(&guard, &client).await,
        "whoami" => whoami(&guard),
        "headers" => {
            for (name, value) in guard.session().headers()?.iter() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            Ok(())
        }
        "get" => {
            let Some(path) = args.get(1) else {
                bail!(USAGE);
            };
            get(&guard, &client, path).await
        }
        other => bail!("unknown command `{}`\n{}", other, USAGE),
    }
}

async fn login(config: &mut Config, client: &ApiClient<Store>, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    if username.is_empty() {
        bail!("Username is required");
    }
    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    let auth = client.login(&username, &password).await?;

    config.last_username = Some(auth.username.clone());
    config.save()?;

    println!("Signed in as {}", auth.username);
    Ok(())
}

async fn logout(guard: &PageGuard<Store, TerminalNavigator>, client: &ApiClient<Store>) -> Result<()> {
    // The server keeps no session state; a failed notification doesn't block logout
    if let Err(e) = client.logout_remote().await {
        tracing::warn!(error = %e, "Server logout failed");
    }
    guard.session().logout()?;
    println!("Signed out");
    Ok(())
}

fn whoami(guard: &PageGuard<Store, TerminalNavigator>) -> Result<()> {
    if !guard.require_auth() {
        bail!("Not signed in");
    }
    let data = guard.session().snapshot();
    println!("username: {}", data.username.as_deref().unwrap_or("-"));
    println!("email:    {}", data.email.as_deref().unwrap_or("-"));
    Ok(())
}

async fn get(
    guard: &PageGuard<Store, TerminalNavigator>,
    client: &ApiClient<Store>,
    path: &str,
) -> Result<()> {
    match guard.fetch(client, path, FetchOptions::new()).await? {
        FetchOutcome::Response(response) => {
            let status = response.status();
            let body = response.text().await?;
            println!("{}", status);
            println!("{}", body);
            if !status.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        FetchOutcome::SessionExpired => bail!("Session expired"),
    }
}

fn prompt(label: &str) -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", label)?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeheaven_session::MemoryStore;

    fn guard_with(entries: &[(&str, &str)]) -> PageGuard<Store, TerminalNavigator> {
        let store: Store = Arc::new(MemoryStore::with_entries(entries.iter().copied()));
        PageGuard::new(SessionStore::new(store), TerminalNavigator)
    }

    #[test]
    fn test_whoami_without_session_fails() {
        let guard = guard_with(&[("username", "alice")]);
        assert!(whoami(&guard).is_err());
    }

    #[test]
    fn test_whoami_with_session() {
        let guard = guard_with(&[("token", "abc"), ("username", "alice")]);
        assert!(whoami(&guard).is_ok());
    }
}
