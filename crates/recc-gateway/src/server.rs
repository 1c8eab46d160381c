//! HTTP health endpoint plus the WebSocket control surface.

use crate::rpc::{GatewayState, Runner};
use crate::ws::handle_connection;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use recc_agent::{AgentConfig, ReccAgent};
use recc_llm::Collaborator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 18920,
        }
    }
}

pub async fn start_gateway(
    agent_config: AgentConfig,
    gateway: GatewayConfig,
    collaborator: Arc<dyn Collaborator>,
) -> anyhow::Result<()> {
    let agent = ReccAgent::new(agent_config, collaborator);
    info!(session = agent.session_id(), "agent created");

    let state = Arc::new(GatewayState {
        agent: Arc::new(Mutex::new(agent)),
        runner: Mutex::new(Runner::default()),
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state);

    let bind_addr: SocketAddr = format!("{}:{}", gateway.bind, gateway.port).parse()?;

    info!("recc gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  WebSocket: ws://{}/ws", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let agent = state.agent.lock().await;
    let status = agent.status();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "session_id": status.session_id,
        "cycle": status.cycle,
    }))
}
