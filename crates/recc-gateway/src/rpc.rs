//! RPC router: dispatches JSON-RPC method calls to handlers
//!
//! The control surface: start, stop, send, save, load, status, step.
//! Each method is handled by a dedicated async function; the router
//! maps method names to handlers.

use recc_agent::ReccAgent;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    pub fn ok(id: &str, result: Value) -> Self {
        Self {
            id: id.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: &str, code: i32, message: String) -> Self {
        Self {
            id: id.to_string(),
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

/// The loop task, if one is running.
#[derive(Default)]
pub struct Runner {
    handle: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Runner {
    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Shared state behind every connection and handler.
pub struct GatewayState {
    pub agent: Arc<Mutex<ReccAgent>>,
    pub runner: Mutex<Runner>,
}

pub type RpcResult = Result<Value, (i32, String)>;

pub async fn route_rpc(method: &str, params: Value, state: &Arc<GatewayState>) -> RpcResult {
    match method {
        "start" => handle_start(params, state).await,
        "stop" => handle_stop(state).await,
        "step" => handle_step(state).await,
        "send" => handle_send(params, state).await,
        "save" => handle_save(state).await,
        "load" => handle_load(params, state).await,
        "status" => handle_status(state).await,
        "echo" => Ok(params),
        _ => Err((-32601, format!("Method not found: {}", method))),
    }
}

pub fn to_response(id: &str, result: RpcResult) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err((code, message)) => RpcResponse::err(id, code, message),
    }
}

// ---------------------------------------------------------------------------
// start: spawn the cycle loop
// ---------------------------------------------------------------------------

async fn handle_start(params: Value, state: &Arc<GatewayState>) -> RpcResult {
    let steps = params["steps"].as_u64();
    let mode = params["mode"].as_str().unwrap_or("continuous");

    let mut runner = state.runner.lock().await;
    if runner.is_running() {
        return Err((-32001, "Agent loop already running".to_string()));
    }

    let cancel = CancellationToken::new();
    runner.cancel = cancel.clone();
    let agent = state.agent.clone();
    info!(?steps, mode, "starting agent loop");

    runner.handle = Some(tokio::spawn(async move {
        let mut done = 0u64;
        loop {
            if cancel.is_cancelled() {
                info!(cycles = done, "agent loop stopped by cancellation");
                break;
            }
            if let Some(limit) = steps {
                if done >= limit {
                    info!(cycles = done, "agent loop finished its step budget");
                    break;
                }
            }
            // Lock per cycle so control calls interleave at boundaries.
            let mut guard = agent.lock().await;
            if let Err(e) = guard.step().await {
                warn!(error = %e, "cycle failed; continuing");
            }
            done += 1;
        }
    }));

    Ok(json!({ "started": true, "steps": steps, "mode": mode }))
}

// ---------------------------------------------------------------------------
// stop: cooperative cancellation at the next cycle boundary
// ---------------------------------------------------------------------------

async fn handle_stop(state: &Arc<GatewayState>) -> RpcResult {
    let runner = state.runner.lock().await;
    let was_running = runner.is_running();
    runner.cancel.cancel();
    Ok(json!({ "stopped": was_running }))
}

// ---------------------------------------------------------------------------
// step: run exactly one cycle
// ---------------------------------------------------------------------------

async fn handle_step(state: &Arc<GatewayState>) -> RpcResult {
    {
        let runner = state.runner.lock().await;
        if runner.is_running() {
            return Err((-32001, "Agent loop already running".to_string()));
        }
    }
    let mut agent = state.agent.lock().await;
    let event = agent.step().await.map_err(|e| (-32002, e.to_string()))?;
    serde_json::to_value(event).map_err(|e| (-32603, e.to_string()))
}

// ---------------------------------------------------------------------------
// send: queue external input for the next cycle
// ---------------------------------------------------------------------------

async fn handle_send(params: Value, state: &Arc<GatewayState>) -> RpcResult {
    let text = params["text"]
        .as_str()
        .ok_or_else(|| (-32602, "Missing required param: text".to_string()))?;
    let mut agent = state.agent.lock().await;
    agent.send_external_input(text);
    Ok(json!({ "queued": true }))
}

// ---------------------------------------------------------------------------
// save / load
// ---------------------------------------------------------------------------

async fn handle_save(state: &Arc<GatewayState>) -> RpcResult {
    let agent = state.agent.lock().await;
    let id = agent.save().map_err(|e| (-32002, e.to_string()))?;
    Ok(json!({ "snapshot_id": id }))
}

async fn handle_load(params: Value, state: &Arc<GatewayState>) -> RpcResult {
    let reference = params["ref"].as_str().unwrap_or("latest");
    let mut agent = state.agent.lock().await;
    agent
        .load(reference)
        .map_err(|e| (-32002, e.to_string()))?;
    Ok(json!({ "loaded": reference }))
}

// ---------------------------------------------------------------------------
// status
// ---------------------------------------------------------------------------

async fn handle_status(state: &Arc<GatewayState>) -> RpcResult {
    let runner_running = state.runner.lock().await.is_running();
    let agent = state.agent.lock().await;
    let mut status = serde_json::to_value(agent.status()).map_err(|e| (-32603, e.to_string()))?;
    status["running"] = json!(runner_running);
    Ok(status)
}
