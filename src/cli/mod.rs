use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use crate::app::{app, AppState};
use crate::auth::hash_password;
use crate::clock::SystemClock;
use crate::config;
use crate::database::{DataStore, PgStore, TimeoutStore};

#[derive(Parser)]
#[command(name = "filial-gateway")]
#[command(about = "Branch-scoped data gateway in front of Postgres")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding GATEWAY_PORT / PORT")]
        port: Option<u16>,
    },

    #[command(about = "Print an Argon2 hash for an acessos.senha value")]
    HashPassword {
        #[arg(help = "Plaintext password to hash")]
        password: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(port).await,
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    config.validate()?;
    info!("Starting filial-gateway in {:?} mode", config.environment);

    let pg = PgStore::connect(&config.database)
        .await
        .context("failed to connect to the database")?
        .with_debug_logging(config.filter.debug_logging);
    let store: Arc<dyn DataStore> = Arc::new(TimeoutStore::new(Arc::new(pg), config.store_timeout()));
    let state = AppState::new(store, Arc::new(SystemClock), config)?;

    let bind_addr = format!("0.0.0.0:{}", port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("filial-gateway listening on http://{}", bind_addr);
    axum::serve(listener, app(state, config)).await?;
    Ok(())
}
