//! Cluster Module
//!
//! Node identity, payload types shared between members, and the membership
//! hub that purges a departed node from every live cache.

mod membership;
mod node;

pub use membership::{ClusterMembership, DepartureReason, ManagedCache, PurgeReport};
pub use node::{ClientRoute, DomainPair, NodeId};
