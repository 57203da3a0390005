//! convo-stream - HTTP front end for a streaming conversation controller
//!
//! Serves one controller bound to the agent at `CONVO_AGENT_URL`.

use convo_stream::agent::{HttpAgent, LoggingAgent};
use convo_stream::api::{create_router, AppState};
use convo_stream::config::Config;
use convo_stream::{spawn_controller, Agent};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convo_stream=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env();

    let agent: Option<Arc<dyn Agent>> = match &config.agent_url {
        Some(url) => {
            let http = HttpAgent::new(
                url,
                config.agent_connect_timeout,
                config.controller.reset_timeout,
            )?;
            tracing::info!(url = %url, "Agent configured");
            let agent: Arc<dyn Agent> = Arc::new(LoggingAgent::new(Arc::new(http), url.clone()));
            Some(agent)
        }
        None => {
            tracing::warn!("No agent configured. Set CONVO_AGENT_URL; messages will be ignored.");
            None
        }
    };

    let controller = spawn_controller(agent, config.controller);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(controller))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.listen_addr();
    tracing::info!("convo-stream listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
