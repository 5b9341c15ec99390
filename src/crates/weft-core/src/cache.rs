//! Node result cache.
//!
//! Keys combine a node's structural fingerprint with a canonical rendering
//! of its resolved inputs, so a cache survives graph rebuilds as long as the
//! node's implementation identity and inputs are unchanged. Only nodes
//! explicitly marked cacheable participate.

use crate::node::{InputMap, OutputMap};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;

/// Shared in-memory result cache for cacheable function nodes.
#[derive(Debug, Default)]
pub struct NodeCache {
    entries: RwLock<HashMap<String, OutputMap>>,
}

impl NodeCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for one invocation: node fingerprint plus inputs rendered
    /// in sorted-key order.
    pub fn key(fingerprint: &str, inputs: &InputMap) -> String {
        let mut hasher = Sha256::new();
        hasher.update(fingerprint.as_bytes());
        let mut names: Vec<&String> = inputs.keys().collect();
        names.sort();
        for name in names {
            hasher.update(b"|");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(inputs[name].to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Look up cached outputs.
    pub fn get(&self, key: &str) -> Option<OutputMap> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Store outputs under a key.
    pub fn put(&self, key: String, outputs: OutputMap) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, outputs);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_is_insensitive_to_input_iteration_order() {
        let a = InputMap::from([("x".into(), json!(1)), ("y".into(), json!(2))]);
        let b = InputMap::from([("y".into(), json!(2)), ("x".into(), json!(1))]);
        assert_eq!(NodeCache::key("fp", &a), NodeCache::key("fp", &b));
    }

    #[test]
    fn key_separates_fingerprints_and_values() {
        let inputs = InputMap::from([("x".into(), json!(1))]);
        let other = InputMap::from([("x".into(), json!(2))]);
        assert_ne!(NodeCache::key("fp1", &inputs), NodeCache::key("fp2", &inputs));
        assert_ne!(NodeCache::key("fp1", &inputs), NodeCache::key("fp1", &other));
    }

    #[test]
    fn round_trip_and_clear() {
        let cache = NodeCache::new();
        let key = NodeCache::key("fp", &InputMap::from([("x".into(), json!(1))]));
        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), OutputMap::from([("y".into(), json!(2))]));
        assert_eq!(cache.get(&key).unwrap()["y"], json!(2));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
