// src/main.rs
//! Minimal command-line client for the shop API.
//!
//! Cookies live for the lifetime of the process, so flows that need a
//! session chain the calls in one invocation (login prints the /me payload
//! after authenticating).

use std::env;

use shopcli::ApiClient;
use tracing_subscriber::EnvFilter;

fn usage() {
    println!("Usage: shopcli <command> [args]");
    println!();
    println!("Commands:");
    println!("  register <name> <email> <password>   Create an account");
    println!("  login <email> <password>             Authenticate and show the session user");
    println!("  social-url <provider>                Print the provider authorization URL");
    println!();
    println!("Environment:");
    println!("  API_URL   Base URL of the API (default http://localhost:8080)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let api_url = env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let client = ApiClient::new(api_url)?;

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("register") => {
            let (name, email, password) = match (args.get(2), args.get(3), args.get(4)) {
                (Some(n), Some(e), Some(p)) => (n, e, p),
                _ => {
                    usage();
                    return Ok(());
                }
            };
            let message = client.register(name, email, password, password).await?;
            println!("{}", message);
        }
        Some("login") => {
            let (email, password) = match (args.get(2), args.get(3)) {
                (Some(e), Some(p)) => (e, p),
                _ => {
                    usage();
                    return Ok(());
                }
            };
            let user = client.login(email, password).await?;
            println!("Logged in as {} <{}> (role: {})", user.name, user.email, user.role);

            // The cookie from login carries the session
            let profile = client.me().await?;
            println!("Current user id: {}", profile.id);

            let message = client.logout().await?;
            println!("{}", message);
        }
        Some("social-url") => {
            let provider = match args.get(2) {
                Some(p) => p,
                None => {
                    usage();
                    return Ok(());
                }
            };
            let url = client.social_redirect_url(provider).await?;
            println!("{}", url);
        }
        _ => usage(),
    }

    Ok(())
}
