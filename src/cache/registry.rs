//! Cache Registry
//!
//! Maps a cache name to the key type, value type and write policy its
//! instances use. Names nobody registered get the generic flavour.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::{Aggregate, CacheSettings, ClusteredCache, PayloadFormat, ValueCodec};
use crate::cluster::{ClientRoute, DomainPair, ManagedCache, NodeId};
use crate::error::{CacheError, Result};
use crate::store::CacheRepository;

// == Well-Known Cache Names ==
pub const C2S_CACHE_NAME: &str = "Routing Users Cache";
pub const ANONYMOUS_C2S_CACHE_NAME: &str = "Routing AnonymousUsers Cache";
pub const S2S_CACHE_NAME: &str = "Routing Servers Cache";
pub const COMPONENT_CACHE_NAME: &str = "Routing Components Cache";
pub const C2S_SESSION_CACHE_NAME: &str = "Routing User Sessions";
pub const C2S_INFO_CACHE_NAME: &str = "Client Session Info Cache";
pub const ROSTER_CACHE_NAME: &str = "Roster";
pub const CROSS_PROXY_CACHE_NAME: &str = "Cluster Cross Proxy Map";
/// Room caches are created per chat service, with the service name appended.
pub const LOCAL_ROOM_CACHE_PREFIX: &str = "Local MUC Room Manager ";

// == Descriptor ==
/// Type of the keys a cache is addressed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Text,
    DomainPair,
    Generic,
}

/// Type of the payloads a cache holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    ClientRoute,
    NodeId,
    NodeIdList,
    TextList,
    ClientSessionInfo,
    Roster,
    CrossProxyInfo,
    MucRoom,
    Generic,
}

impl ValueKind {
    /// Storage path payloads of this kind must use; `None` accepts any.
    pub fn format(self) -> Option<PayloadFormat> {
        match self {
            ValueKind::ClientRoute => Some(PayloadFormat::SelfDescribing),
            ValueKind::Generic => None,
            _ => Some(PayloadFormat::Structured),
        }
    }
}

/// Key types a registered cache can be addressed by.
pub trait CacheKey: Display {
    const KIND: KeyKind;
}

impl CacheKey for String {
    const KIND: KeyKind = KeyKind::Text;
}

impl CacheKey for DomainPair {
    const KIND: KeyKind = KeyKind::DomainPair;
}

/// What the registry knows about one cache name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheDescriptor {
    pub key_kind: KeyKind,
    pub value_kind: ValueKind,
    pub singleton: bool,
}

impl CacheDescriptor {
    pub const fn new(key_kind: KeyKind, value_kind: ValueKind, singleton: bool) -> Self {
        Self {
            key_kind,
            value_kind,
            singleton,
        }
    }

    /// Flavour used for every unregistered name.
    pub const fn generic() -> Self {
        Self::new(KeyKind::Generic, ValueKind::Generic, false)
    }
}

impl Default for CacheDescriptor {
    fn default() -> Self {
        Self::generic()
    }
}

// == Cache Registry ==
/// Builds cache instances wired to one shared repository.
pub struct CacheRegistry {
    repository: Arc<dyn CacheRepository>,
    exact: HashMap<String, CacheDescriptor>,
    prefixes: Vec<(String, CacheDescriptor)>,
}

impl CacheRegistry {
    /// Registry with no registered names.
    pub fn new(repository: Arc<dyn CacheRepository>) -> Self {
        Self {
            repository,
            exact: HashMap::new(),
            prefixes: Vec::new(),
        }
    }

    /// Registry preloaded with the routing, session, roster, proxy and room caches.
    pub fn with_defaults(repository: Arc<dyn CacheRepository>) -> Self {
        use KeyKind::Text;

        let mut registry = Self::new(repository);
        registry.register(
            C2S_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::ClientRoute, false),
        );
        registry.register(
            ANONYMOUS_C2S_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::ClientRoute, false),
        );
        registry.register(
            S2S_CACHE_NAME,
            CacheDescriptor::new(KeyKind::DomainPair, ValueKind::NodeId, false),
        );
        registry.register(
            COMPONENT_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::NodeIdList, false),
        );
        registry.register(
            C2S_SESSION_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::TextList, false),
        );
        registry.register(
            C2S_INFO_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::ClientSessionInfo, false),
        );
        registry.register(
            ROSTER_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::Roster, true),
        );
        registry.register(
            CROSS_PROXY_CACHE_NAME,
            CacheDescriptor::new(Text, ValueKind::CrossProxyInfo, false),
        );
        registry.register_prefix(
            LOCAL_ROOM_CACHE_PREFIX,
            CacheDescriptor::new(Text, ValueKind::MucRoom, true),
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, descriptor: CacheDescriptor) {
        self.exact.insert(name.into(), descriptor);
    }

    /// Registers a descriptor for every name starting with `prefix`.
    pub fn register_prefix(&mut self, prefix: impl Into<String>, descriptor: CacheDescriptor) {
        self.prefixes.push((prefix.into(), descriptor));
    }

    /// Names registered exactly, sorted.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.exact.keys().cloned().collect();
        names.sort();
        names
    }

    // == Descriptor Lookup ==
    /// Exact match first, then the first matching prefix, then generic.
    pub fn descriptor(&self, name: &str) -> CacheDescriptor {
        self.exact
            .get(name)
            .copied()
            .or_else(|| {
                self.prefixes
                    .iter()
                    .find(|(prefix, _)| name.starts_with(prefix.as_str()))
                    .map(|(_, descriptor)| *descriptor)
            })
            .unwrap_or_default()
    }

    // == Create Cache ==
    /// Creates the typed cache `name` for `node_id`.
    ///
    /// The singleton policy comes from the descriptor. A key type or codec
    /// that disagrees with the descriptor is rejected; generic keys accept any
    /// key type.
    pub fn create_cache<K: CacheKey, V>(
        &self,
        name: &str,
        settings: CacheSettings,
        node_id: NodeId,
        codec: ValueCodec<V>,
    ) -> Result<ClusteredCache<K, V>> {
        let descriptor = self.descriptor(name);

        if descriptor.key_kind != KeyKind::Generic && descriptor.key_kind != K::KIND {
            return Err(CacheError::InvalidRequest(format!(
                "Cache {} is keyed by {:?}, not {:?}",
                name,
                descriptor.key_kind,
                K::KIND
            )));
        }

        if let Some(expected) = descriptor.value_kind.format() {
            if expected != codec.format() {
                return Err(CacheError::InvalidRequest(format!(
                    "Cache {} stores {:?} payloads as {:?}, codec uses {:?}",
                    name,
                    descriptor.value_kind,
                    expected,
                    codec.format()
                )));
            }
        }

        debug!("Creating cache {} as {:?}", name, descriptor);
        ClusteredCache::builder(name, node_id)
            .settings(settings)
            .singleton(descriptor.singleton)
            .repository(self.repository.clone())
            .codec(codec)
            .build()
    }

    /// Creates `name` holding arbitrary JSON payloads under text keys.
    pub fn create_generic_cache(
        &self,
        name: &str,
        settings: CacheSettings,
        node_id: NodeId,
    ) -> Result<ClusteredCache<String, serde_json::Value>> {
        self.create_cache(name, settings, node_id, ValueCodec::structured())
    }

    // == Create Managed Cache ==
    /// Creates `name` with the key and value types its descriptor names,
    /// behind the type-erased membership view.
    pub fn create_managed_cache(
        &self,
        name: &str,
        settings: CacheSettings,
        node_id: NodeId,
    ) -> Result<Arc<dyn ManagedCache>> {
        let descriptor = self.descriptor(name);

        match (descriptor.key_kind, descriptor.value_kind) {
            (_, ValueKind::ClientRoute) => self.erase::<String, ClientRoute>(
                name,
                settings,
                node_id,
                ValueCodec::self_describing(),
            ),
            (KeyKind::DomainPair, ValueKind::NodeId) => self.erase::<DomainPair, NodeId>(
                name,
                settings,
                node_id,
                ValueCodec::structured(),
            ),
            (_, ValueKind::NodeIdList) => self.erase::<String, Vec<NodeId>>(
                name,
                settings,
                node_id,
                ValueCodec::structured(),
            ),
            (_, ValueKind::TextList) => self.erase::<String, Vec<String>>(
                name,
                settings,
                node_id,
                ValueCodec::structured(),
            ),
            _ => self.erase::<String, serde_json::Value>(
                name,
                settings,
                node_id,
                ValueCodec::structured(),
            ),
        }
    }

    fn erase<K, V>(
        &self,
        name: &str,
        settings: CacheSettings,
        node_id: NodeId,
        codec: ValueCodec<V>,
    ) -> Result<Arc<dyn ManagedCache>>
    where
        K: CacheKey + Send + Sync + 'static,
        V: Aggregate + Send + Sync + 'static,
    {
        let cache: ClusteredCache<K, V> = self.create_cache(name, settings, node_id, codec)?;
        Ok(Arc::new(cache))
    }
}
