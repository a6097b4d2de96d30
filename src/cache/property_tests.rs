//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the clustered cache against a shared in-memory store.
//! Each case builds fresh node handles on one repository.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::{CacheSettings, ClusteredCache, Lookup, ValueCodec};
use crate::cluster::{ClientRoute, NodeId};
use crate::store::MemoryRepository;

// == Test Configuration ==
const TEST_CACHE: &str = "PropCache";
const TEST_LIFETIME_MS: i64 = 600_000;

fn node_cache<V>(
    repo: &Arc<MemoryRepository>,
    node: &str,
    singleton: bool,
    codec: ValueCodec<V>,
) -> ClusteredCache<String, V> {
    ClusteredCache::builder(TEST_CACHE, NodeId::new(node))
        .settings(CacheSettings::new(-1, TEST_LIFETIME_MS, true))
        .singleton(singleton)
        .repository(repo.clone())
        .codec(codec)
        .build()
        .unwrap()
}

// == Strategies ==
/// Generates entry keys (non-empty, printable)
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

/// Generates text payloads, including characters JSON must escape
fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 \"\\\\/]{0,64}"
}

fn node_id_strategy() -> impl Strategy<Value = NodeId> {
    "[a-z0-9-]{1,16}".prop_map(NodeId::new)
}

fn route_strategy() -> impl Strategy<Value = ClientRoute> {
    (node_id_strategy(), any::<bool>()).prop_map(|(node, available)| ClientRoute::new(node, available))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Storing a pair and reading it back before expiry returns the same value.
    #[test]
    fn prop_put_then_get(key in key_strategy(), value in text_strategy()) {
        let repo = Arc::new(MemoryRepository::new());
        let cache = node_cache(&repo, "node-a", false, ValueCodec::<String>::structured());

        let found = tokio_test::block_on(async {
            cache.put(&key, value.clone()).await.unwrap();
            cache.get(&key).await.unwrap()
        });

        prop_assert_eq!(found, Some(Lookup::Single(value)));
    }

    // Removing the only copy of a key makes it absent.
    #[test]
    fn prop_remove_then_get(key in key_strategy(), value in text_strategy()) {
        let repo = Arc::new(MemoryRepository::new());
        let cache = node_cache(&repo, "node-a", false, ValueCodec::<String>::structured());

        let (removed, found) = tokio_test::block_on(async {
            cache.put(&key, value.clone()).await.unwrap();
            let removed = cache.remove(&key).await.unwrap();
            (removed, cache.get(&key).await.unwrap())
        });

        prop_assert_eq!(removed, Some(value));
        prop_assert_eq!(found, None);
    }

    // A singleton cache keeps exactly one physical entry; the last writer wins.
    #[test]
    fn prop_singleton_last_writer_wins(
        key in key_strategy(),
        first in text_strategy(),
        second in text_strategy(),
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let a = node_cache(&repo, "node-a", true, ValueCodec::<String>::structured());
        let b = node_cache(&repo, "node-b", true, ValueCodec::<String>::structured());

        let (found, records) = tokio_test::block_on(async {
            a.put(&key, first).await.unwrap();
            b.put(&key, second.clone()).await.unwrap();
            (a.get(&key).await.unwrap(), repo.len().await)
        });

        prop_assert_eq!(records, 1);
        prop_assert_eq!(found, Some(Lookup::Single(second)));
    }

    // Copies held by two nodes merge, list payloads contributing their elements.
    #[test]
    fn prop_merge_flattens_node_copies(
        key in key_strategy(),
        left in prop::collection::vec(node_id_strategy(), 0..4),
        right in prop::collection::vec(node_id_strategy(), 0..4),
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let a = node_cache(&repo, "node-a", false, ValueCodec::<Vec<NodeId>>::structured());
        let b = node_cache(&repo, "node-b", false, ValueCodec::<Vec<NodeId>>::structured());

        let found = tokio_test::block_on(async {
            a.put(&key, left.clone()).await.unwrap();
            b.put(&key, right.clone()).await.unwrap();
            b.get(&key).await.unwrap()
        });

        // records come back ordered by storage key, so node-a's copy first
        let expected: Vec<NodeId> = left.into_iter().chain(right).collect();
        prop_assert_eq!(found, Some(Lookup::Merged(expected)));
    }

    // Size counts only local entries, values spans the whole cluster.
    #[test]
    fn prop_size_is_local_values_is_global(
        keys_a in prop::collection::hash_set(key_strategy(), 0..6),
        keys_b in prop::collection::hash_set(key_strategy(), 0..6),
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let a = node_cache(&repo, "node-a", false, ValueCodec::<String>::structured());
        let b = node_cache(&repo, "node-b", false, ValueCodec::<String>::structured());

        let (size_a, size_b, values, keys) = tokio_test::block_on(async {
            for key in &keys_a {
                a.put(key, format!("a-{}", key)).await.unwrap();
            }
            for key in &keys_b {
                b.put(key, format!("b-{}", key)).await.unwrap();
            }
            (
                a.size().await.unwrap(),
                b.size().await.unwrap(),
                a.values().await.unwrap(),
                a.key_set().await.unwrap(),
            )
        });

        prop_assert_eq!(size_a, keys_a.len());
        prop_assert_eq!(size_b, keys_b.len());
        prop_assert_eq!(values.len(), keys_a.len() + keys_b.len());
        prop_assert_eq!(keys, keys_a);
    }

    // Purging one node leaves every other node's entries readable.
    #[test]
    fn prop_purge_only_removes_departed_node(
        keys_a in prop::collection::hash_set(key_strategy(), 1..6),
        keys_b in prop::collection::hash_set(key_strategy(), 1..6),
    ) {
        let repo = Arc::new(MemoryRepository::new());
        let a = node_cache(&repo, "node-a", false, ValueCodec::<String>::structured());
        let b = node_cache(&repo, "node-b", false, ValueCodec::<String>::structured());

        let (removed, remaining) = tokio_test::block_on(async {
            for key in &keys_a {
                a.put(key, "a".to_string()).await.unwrap();
            }
            for key in &keys_b {
                b.put(key, "b".to_string()).await.unwrap();
            }
            let removed = b
                .purge_clustered_node_caches(&NodeId::new("node-a"))
                .await
                .unwrap();
            (removed, b.key_set().await.unwrap())
        });

        prop_assert_eq!(removed, keys_a.len());
        prop_assert_eq!(remaining, keys_b.iter().cloned().collect::<HashSet<_>>());
        for key in &keys_b {
            let found = tokio_test::block_on(a.get(key)).unwrap();
            prop_assert!(found.is_some(), "entry {} of node-b should survive", key);
        }
    }

    // Every supported payload shape survives encode then decode.
    #[test]
    fn prop_codec_roundtrip(
        text in text_strategy(),
        texts in prop::collection::vec(text_strategy(), 0..5),
        nodes in prop::collection::vec(node_id_strategy(), 0..5),
        route in route_strategy(),
    ) {
        let scalar = ValueCodec::<String>::structured();
        prop_assert_eq!(scalar.decode(&scalar.encode(&text).unwrap()).unwrap(), text);

        let list = ValueCodec::<Vec<String>>::structured();
        prop_assert_eq!(list.decode(&list.encode(&texts).unwrap()).unwrap(), texts);

        let node_list = ValueCodec::<Vec<NodeId>>::structured();
        prop_assert_eq!(node_list.decode(&node_list.encode(&nodes).unwrap()).unwrap(), nodes);

        let binary = ValueCodec::<ClientRoute>::self_describing();
        prop_assert_eq!(binary.decode(&binary.encode(&route).unwrap()).unwrap(), route);
    }
}
