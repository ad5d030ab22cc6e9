//! # UCCTL CLI
//!
//! Command-line client for the Unity Catalog permissions gateway.
//!
//! ## Usage
//!
//! ```bash
//! # List grants on a catalog
//! ucctl list catalog unity
//!
//! # Grant privileges on a table
//! ucctl grant table unity.default.orders analyst "SELECT, MODIFY"
//!
//! # Revoke privileges on a schema
//! ucctl revoke schema unity.default analyst USE_SCHEMA
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dbt_orchestrator::constants::DEFAULT_GATEWAY_URL;
use dbt_orchestrator::gateway::GatewayClient;

/// Unity Catalog permissions manager
#[derive(Parser)]
#[command(name = "ucctl")]
#[command(
    about = "Unity Catalog permissions manager",
    long_about = None,
    after_help = "\
Examples:
  ucctl list catalog unity
  ucctl grant table unity.default.orders analyst \"SELECT, MODIFY\"
  ucctl revoke schema unity.default analyst USE_SCHEMA
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Permissions gateway base URL
    #[arg(long, global = true, env = "UC_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List permissions on a securable
    List {
        securable_type: SecurableKind,
        /// e.g. `unity` or `unity.default`
        full_name: String,
    },
    /// Grant permissions to a principal
    Grant {
        securable_type: SecurableKind,
        full_name: String,
        /// e.g. `user@example.com` or a group name
        principal: String,
        /// Comma-separated, e.g. `USE_CATALOG, CREATE_TABLE`
        privileges: String,
    },
    /// Revoke permissions from a principal
    Revoke {
        securable_type: SecurableKind,
        full_name: String,
        principal: String,
        /// Comma-separated, e.g. `SELECT, MODIFY`
        privileges: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SecurableKind {
    Catalog,
    Schema,
    Table,
}

impl SecurableKind {
    fn as_str(self) -> &'static str {
        match self {
            SecurableKind::Catalog => "catalog",
            SecurableKind::Schema => "schema",
            SecurableKind::Table => "table",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ucctl=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = GatewayClient::new(&cli.base_url)?;

    match cli.command {
        Commands::List {
            securable_type,
            full_name,
        } => {
            let table = client
                .list_grants(securable_type.as_str(), &full_name)
                .await?;
            println!("{table}");
        }
        Commands::Grant {
            securable_type,
            full_name,
            principal,
            privileges,
        } => {
            let message = client
                .grant(securable_type.as_str(), &full_name, &principal, &privileges)
                .await?;
            println!("{message}");
        }
        Commands::Revoke {
            securable_type,
            full_name,
            principal,
            privileges,
        } => {
            let message = client
                .revoke(securable_type.as_str(), &full_name, &principal, &privileges)
                .await?;
            println!("{message}");
        }
    }
    Ok(())
}
