use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use chatio_api::{
    config::Config,
    db::{self, MessageStore, PgMessageStore},
    embeddings::{pacer_from_config, Embedder, GoogleEmbeddingClient},
    llm::{GoogleAdapter, LLMAdapter},
    routes::create_router,
    search::ResultEnhancer,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatio_api=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);
    info!("Google AI: {:?}", config.google_ai);

    // Connect to database
    let pool = db::create_pool(&config.database).await?;

    if config.database.run_migrations {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations completed");
    }

    // Remote providers are optional: without a key the API still serves CRUD
    let pacer = pacer_from_config(&config.search)?;
    let embedder: Option<Arc<dyn Embedder>> =
        match GoogleEmbeddingClient::new(&config.google_ai, pacer) {
            Ok(client) => {
                info!(model = client.model(), "Embedding client ready");
                Some(Arc::new(client) as Arc<dyn Embedder>)
            }
            Err(e) => {
                warn!(error = %e, "Semantic search and backfill disabled");
                None
            }
        };

    let enhancer = if config.search.ai_enhancement {
        match GoogleAdapter::new(&config.google_ai) {
            Ok(adapter) => ResultEnhancer::new(Some(Arc::new(adapter) as Arc<dyn LLMAdapter>)),
            Err(e) => {
                warn!(error = %e, "Search enhancement disabled");
                ResultEnhancer::disabled()
            }
        }
    } else {
        info!("Search enhancement turned off by configuration");
        ResultEnhancer::disabled()
    };

    // Create shared state
    let store: Arc<dyn MessageStore> = Arc::new(PgMessageStore::new(pool.clone()));
    let state = AppState {
        pool,
        config: config.clone(),
        store,
        embedder,
        enhancer: Arc::new(enhancer),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
