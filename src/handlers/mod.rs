//! HTTP and WebSocket transport over the dispatcher and hub.

pub mod http;
pub mod ws;

pub use http::AppState;
pub use ws::ws_handler;
