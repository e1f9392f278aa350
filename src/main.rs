use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use chatstream::adapters::http::{app_router, AuthState, ChatAppState, RateLimiterState};
use chatstream::adapters::{
    postgres, InMemoryConversationStore, InMemoryRateLimiter, JwtSessionValidator,
    MockAIProvider, OpenAIConfig, OpenAIProvider, PostgresConversationStore,
};
use chatstream::application::StreamingHandlerConfig;
use chatstream::config::{AppConfig, ServerConfig};
use chatstream::ports::{AIProvider, ConversationStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        return Err(e.into());
    }

    let store = build_store(&config).await?;
    let ai_provider = build_ai_provider(&config)?;
    let validator: AuthState = Arc::new(JwtSessionValidator::from_config(&config.auth));
    let limiter: RateLimiterState = Arc::new(InMemoryRateLimiter::new(config.rate_limit.clone()));

    let state = ChatAppState::new(
        store,
        ai_provider,
        limiter.clone(),
        StreamingHandlerConfig::from_ai_config(&config.ai),
    );
    let app = app_router(state, validator, limiter, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return Err(e.into());
        }
    };

    tracing::info!(%addr, environment = ?config.server.environment, "chatstream listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> Result<(), BoxError> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&server.log_level))?;

    let fmt_layer = if server.is_production() {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).compact().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn ConversationStore>, BoxError> {
    match &config.database {
        Some(database) => {
            let pool = postgres::connect(database).await?;
            tracing::info!("using PostgreSQL conversation store");
            Ok(Arc::new(PostgresConversationStore::new(pool)))
        }
        None => {
            tracing::warn!("no database configured, conversations are kept in memory");
            Ok(Arc::new(InMemoryConversationStore::new()))
        }
    }
}

fn build_ai_provider(config: &AppConfig) -> Result<Arc<dyn AIProvider>, BoxError> {
    match OpenAIConfig::from_app_config(&config.ai) {
        Some(openai) => {
            let provider = OpenAIProvider::new(openai)?;
            tracing::info!(model = %config.ai.model, "model provider configured");
            Ok(Arc::new(provider))
        }
        None if config.is_production() => {
            Err("CHATSTREAM__AI__API_KEY is required in production".into())
        }
        None => {
            tracing::warn!("no AI API key configured, replies come from the mock provider");
            Ok(Arc::new(MockAIProvider::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
