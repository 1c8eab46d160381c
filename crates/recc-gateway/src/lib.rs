//! Control surface for a running agent: an axum HTTP + WebSocket
//! gateway exposing start/stop/send/save/load/status and streaming one
//! observability event per cycle to every subscriber.

pub mod rpc;
pub mod server;
pub mod ws;

pub use server::{start_gateway, GatewayConfig};
