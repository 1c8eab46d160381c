//! WebSocket connection handling
//!
//! Each connection gets its own subscription to the observability bus
//! and a JSON-RPC command channel multiplexed over the same socket.
//! Events stream in publish order; a slow client lags and loses old
//! events rather than stalling the agent loop.

use crate::rpc::{route_rpc, to_response, GatewayState, RpcRequest};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut events = {
        let agent = state.agent.lock().await;
        agent.bus().subscribe()
    };

    // Greeting so clients can confirm the protocol version.
    let hello = serde_json::json!({
        "type": "hello",
        "version": env!("CARGO_PKG_VERSION"),
    });
    let _ = ws_tx.send(WsMessage::Text(hello.to_string())).await;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let response = handle_text_message(&text, &state).await;
                        if ws_tx.send(WsMessage::Text(response)).await.is_err() {
                            return; // Client disconnected
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Client disconnected");
                        return;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        return;
                    }
                    None => return, // Stream ended
                    _ => {} // Ping/Pong/Binary: ignore
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let framed = serde_json::json!({
                            "type": "cycle",
                            "event": event,
                        });
                        if ws_tx.send(WsMessage::Text(framed.to_string())).await.is_err() {
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, dropped {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Observability bus closed");
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_text_message(text: &str, state: &Arc<GatewayState>) -> String {
    let response = match serde_json::from_str::<RpcRequest>(text) {
        Ok(request) => {
            let result = route_rpc(&request.method, request.params, state).await;
            to_response(&request.id, result)
        }
        Err(e) => crate::rpc::RpcResponse::err("", -32700, format!("Parse error: {}", e)),
    };
    serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"id":"","error":{"code":-32603,"message":"serialize"}}"#.to_string())
}
