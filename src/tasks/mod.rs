//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a node is up.
//!
//! # Tasks
//! - Expiration sweep: removes expired records from the in-memory repository

mod cleanup;

pub use cleanup::spawn_cleanup_task;
