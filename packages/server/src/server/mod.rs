// HTTP server setup (Axum + SSE)
pub mod app;
pub mod middleware;
pub mod routes;

pub use app::*;
