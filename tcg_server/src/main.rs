//! Tournament server using the async actor model.
//!
//! Each tournament runs in a TournamentActor owned by the TournamentManager,
//! persisted to PostgreSQL when a database URL is configured.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use pico_args::Arguments;
use tcg_server::{api, config::ServerConfig, logging, metrics};
use tcg_tournament::{
    TournamentManager,
    collaborators::{LogNotifier, OrganizerOrAdmin},
    db::{
        Database, InMemoryTournamentRepository, PgTournamentRepository, TournamentRepository,
    },
};

const HELP: &str = "\
Run the TCG tournament server

USAGE:
  tcg_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL, in-memory when unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                        Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                       PostgreSQL connection string
  ADMIN_USER_IDS                     Comma-separated users who manage every tournament
  TOURNAMENT_CHANNEL_CAPACITY        Actor inbox size
  OVERTIME_CHECK_SECS                Interval between overtime checks
  DEFAULT_MATCH_TIME_LIMIT_MINUTES   Match time limit when an event sets none
  ORDERING_SEED                      Seed for reproducible pairings
  METRICS_BIND                       Prometheus exporter address
  RUST_LOG                           Log filter
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    let (repository, database): (Arc<dyn TournamentRepository>, Option<Arc<Database>>) =
        match &config.database {
            Some(db_config) => {
                tracing::info!("Connecting to database");
                let database = Database::new(db_config)
                    .await
                    .context("Failed to connect to database")?;
                database
                    .ensure_schema()
                    .await
                    .context("Failed to create tournament schema")?;
                tracing::info!("Database connected successfully");

                let repository: Arc<dyn TournamentRepository> =
                    Arc::new(PgTournamentRepository::new(
                        database.pool().clone(),
                        Duration::from_secs(db_config.query_timeout_secs),
                    ));
                (repository, Some(Arc::new(database)))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, tournaments are kept in memory only");
                let repository: Arc<dyn TournamentRepository> =
                    Arc::new(InMemoryTournamentRepository::new());
                (repository, None)
            }
        };

    tracing::info!(admins = config.admin_user_ids.len(), "Authorization configured");

    let manager = Arc::new(TournamentManager::new(
        repository,
        Arc::new(OrganizerOrAdmin::new(config.admin_user_ids.iter().copied())),
        Arc::new(LogNotifier),
        config.engine.clone(),
    ));

    let loaded = manager
        .load_existing_tournaments()
        .await
        .context("Failed to load tournaments")?;
    metrics::active_tournaments(loaded);
    tracing::info!("Server ready with {} active tournament(s)", loaded);

    let app = api::create_router(api::AppState {
        manager: manager.clone(),
        database: database.clone(),
    });

    tracing::info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    tracing::info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Shutting down tournament actors...");
    manager.shutdown().await;

    if let Some(database) = database {
        Arc::unwrap_or_clone(database).close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
