use crate::core::loader::LoadOutcome;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Identity of a dataset source: the hex SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFingerprint(String);

impl SourceFingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SourceFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell sources apart in logs.
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

/// Load results, keyed by the fingerprint of the bytes they came from.
#[derive(Clone)]
pub struct LoadCache {
    inner: Arc<RwLock<HashMap<SourceFingerprint, Arc<LoadOutcome>>>>,
}

impl LoadCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &SourceFingerprint) -> Option<Arc<LoadOutcome>> {
        let cache = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!(%key, "Cache HIT");
        } else {
            debug!(%key, "Cache MISS");
        }
        value
    }

    pub fn put(&self, key: SourceFingerprint, value: Arc<LoadOutcome>) {
        let mut cache = self.inner.write().unwrap_or_else(|e| e.into_inner());
        debug!(%key, "Cache PUT");
        cache.insert(key, value);
    }

    /// Drops one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &SourceFingerprint) -> bool {
        let mut cache = self.inner.write().unwrap_or_else(|e| e.into_inner());
        debug!(%key, "Cache INVALIDATE");
        cache.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut cache = self.inner.write().unwrap_or_else(|e| e.into_inner());
        cache.clear();
        debug!("Cache CLEAR");
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LoadCache {
    fn default() -> Self {
        Self::new()
    }
}
