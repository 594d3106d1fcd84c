// src/main.rs

use dotenvy::dotenv;
use levelboard::config::Config;
use levelboard::engine::ProgressionEngine;
use levelboard::routes;
use levelboard::state::AppState;
use levelboard::store::{MemoryStore, PgStore, ProgressionStore, Seed};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    let store: Arc<dyn ProgressionStore> = match &config.database_url {
        Some(url) => {
            let pool = connect_with_retry(url).await?;
            tracing::info!("Database connected...");

            // Run Migrations Automatically
            tracing::info!("Running migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Migrations applied successfully.");

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(load_memory_store(config.seed_path.as_deref()).await?)
        }
    };

    tracing::info!(
        activity_weight = config.engine.weights.activity,
        mission_weight = config.engine.weights.mission,
        teacher_snapshots = config.engine.policy.teacher_scope,
        global_snapshots = config.engine.policy.global_scope,
        "Progression engine configured"
    );
    let engine = Arc::new(ProgressionEngine::new(store, config.engine));

    // Create AppState
    let state = AppState {
        engine,
        config: config.clone(),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Start the server
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize Database Pool with Retry
async fn connect_with_retry(url: &str) -> Result<PgPool, sqlx::Error> {
    let mut retry_count = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn load_memory_store(seed_path: Option<&str>) -> Result<MemoryStore, Box<dyn std::error::Error>> {
    let Some(path) = seed_path else {
        return Ok(MemoryStore::new());
    };

    let raw = tokio::fs::read_to_string(path).await?;
    let seed: Seed = serde_json::from_str(&raw)?;
    tracing::info!(
        classes = seed.classes.len(),
        students = seed.students.len(),
        items = seed.items.len(),
        grades = seed.grades.len(),
        "Seeded in-memory store from {}",
        path
    );
    Ok(MemoryStore::from_seed(seed))
}
