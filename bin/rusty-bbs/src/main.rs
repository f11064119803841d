//! # Rusty-BBS Binary
//!
//! Assembles the board from the plugins selected at compile time.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rb_api::middleware::{cors_policy, standard_middleware};
use rb_api::{configure_routes, AppState};
use rb_auth_trip::TripIdentityProvider;
use rb_config::AppConfig;
use rb_core::{AppError, BoardService, DocumentStore, Environment};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rusty-bbs", version, about = "2ch-compatible textboard")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the board over HTTP (default)
    Serve,
    /// Create every configured board that does not exist yet
    Seed,
    /// Print the number of writes accepted in the current period
    WriteCount,
    /// Start a new write period on every board
    ResetWriteCounts,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-sqlite")]
async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store =
        rb_db_sqlite::SqliteDocumentStore::new(&config.database.url, config.database.max_connections)
            .await
            .with_context(|| format!("failed to open {}", config.database.url))?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_store(_config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    tracing::warn!("no database backend compiled in, using the in-memory store");
    Ok(Arc::new(rb_core::memory::MemoryStore::new()))
}

async fn seed(service: &BoardService, config: &AppConfig) -> anyhow::Result<usize> {
    let mut created = 0;
    for name in config.boards.names() {
        match service.create_board(name).await {
            Ok(()) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(err) => return Err(err).with_context(|| format!("failed to create board {name}")),
        }
    }
    Ok(created)
}

async fn serve(service: BoardService, config: AppConfig) -> anyhow::Result<()> {
    let created = seed(&service, &config).await?;
    if created > 0 {
        info!(created, "created missing boards");
    }

    let (host, port) = (config.server.host.clone(), config.server.port);
    let state = web::Data::new(AppState {
        service,
        boards: config.boards,
    });

    info!("Rusty-BBS starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_policy())
            .wrap(standard_middleware())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = AppConfig::load()?;
    let env = Environment::new(Utc::now(), config.time.offset()?);
    let store = open_store(&config).await?;
    let identity = Arc::new(TripIdentityProvider::new(config.identity.id_salt.clone())?);
    let service = BoardService::new(store, identity, env);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(service, config).await?,
        Command::Seed => {
            let created = seed(&service, &config).await?;
            println!("{created} board(s) created");
        }
        Command::WriteCount => println!("{}", service.total_write_count().await?),
        Command::ResetWriteCounts => {
            let reset = service.reset_write_counts().await?;
            info!(reset, "write counts reset");
            println!("{reset} board(s) reset");
        }
    }
    Ok(())
}
