//! Clustered Cache - cluster-wide key/value caches over a shared store
//!
//! Every node writes its own copy of an entry into one shared repository.
//! Reads see the copies of all nodes, and a departed node's copies are
//! purged when membership changes.

pub mod api;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_cleanup_task;
