use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::store::KeyValueStore;
use crate::clock::Clock;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry<V> {
    value: V,
    fetched_at: u64,
}

/// Per-track-index cache on top of a [`KeyValueStore`].
///
/// Entries older than the TTL read as absent but stay in the store until
/// the same index is written again.
pub struct TtlCache<V> {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    _value: PhantomData<fn() -> V>,
}

impl<V> TtlCache<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            _value: PhantomData,
        }
    }

    fn key(index: usize) -> String {
        format!("track_{}", index)
    }

    pub fn get(&self, index: usize) -> Option<V> {
        let raw = self.store.get(&Self::key(index))?;

        let entry: Entry<V> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry for track {}: {}", index, e);
                return None;
            }
        };

        let age_ms = self.clock.now_ms().saturating_sub(entry.fetched_at);
        if age_ms < self.ttl.as_millis() as u64 {
            tracing::trace!("Cache hit for track {} (age {}ms)", index, age_ms);
            Some(entry.value)
        } else {
            tracing::trace!("Cache entry for track {} expired (age {}ms)", index, age_ms);
            None
        }
    }

    /// Overwrites the entry for `index`, stamped with the current time.
    /// Storage failures are logged; the cache is only an optimisation.
    pub fn put(&self, index: usize, value: V) {
        let entry = Entry {
            value,
            fetched_at: self.clock.now_ms(),
        };

        let stored = serde_json::to_string(&entry)
            .map_err(Into::into)
            .and_then(|raw| self.store.set(&Self::key(index), raw));

        if let Err(e) = stored {
            tracing::warn!("Failed to cache track {}: {}", index, e);
        }
    }
}
