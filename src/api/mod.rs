//! API Module
//!
//! HTTP handlers and routing for the node admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` - List live caches
//! - `POST /cluster/departures` - Report a departed node

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
