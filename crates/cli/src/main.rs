//! Atelier CLI - Operator tools that talk to the running backend.
//!
//! # Usage
//!
//! ```bash
//! # Check that the backend and recommendation service answer
//! atelier-cli health
//!
//! # Order statistics for the last 30 days (admin credentials required)
//! atelier-cli stats --range 30d --admin-email ops@example.com
//!
//! # Products with five or fewer units left
//! atelier-cli low-stock --threshold 5
//! ```
//!
//! # Environment Variables
//!
//! - `ATELIER_API_URL` - Backend REST API base URL
//! - `ATELIER_RECOMMEND_URL` - Recommendation service base URL
//! - `ATELIER_ADMIN_EMAIL` / `ATELIER_ADMIN_PASSWORD` - Credentials for `stats`

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "atelier-cli")]
#[command(author, version, about = "Atelier operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check upstream service health
    Health,
    /// Print order statistics
    Stats {
        /// Range: 7d, 30d, 90d, ytd or all
        #[arg(short, long, default_value = "30d")]
        range: String,

        /// Admin account email
        #[arg(long, env = "ATELIER_ADMIN_EMAIL")]
        admin_email: String,

        /// Admin account password
        #[arg(long, env = "ATELIER_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
    },
    /// List products running out of stock
    LowStock {
        /// Report products with at most this many units in total
        #[arg(short, long, default_value_t = 5)]
        threshold: u32,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atelier_cli=info,atelier_client=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let api = commands::client_from_env()?;
    let mut out = std::io::stdout();

    match cli.command {
        Commands::Health => commands::health::run(&api, &mut out).await,
        Commands::Stats {
            range,
            admin_email,
            admin_password,
        } => {
            let password = SecretString::from(admin_password);
            commands::stats::run(&api, &range, &admin_email, &password, &mut out).await
        }
        Commands::LowStock { threshold } => {
            commands::low_stock::run(&api, threshold, &mut out).await
        }
    }
}
