//! Read-through memoization for repeated service lookups.
//!
//! A sync pass asks the same questions many times (room list for the
//! building, mail addresses for a group that appears in dozens of
//! lessons). [`ResponseCache`] remembers the first successful answer
//! for the lifetime of the process, so each distinct lookup hits the
//! network once per run. There is no eviction: a run is short-lived and
//! works from one consistent snapshot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

/// Identity of a memoized call: operation name plus argument values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    op: &'static str,
    args: Vec<String>,
}

impl CacheKey {
    #[must_use]
    pub fn new(op: &'static str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            op,
            args: args.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn op(&self) -> &'static str {
        self.op
    }
}

/// Cache (de)serialization failures.
///
/// Values are stored as JSON so one cache can hold answers of different
/// shapes. These errors indicate a type whose serde round trip is lossy
/// and surface as the caller's own error type via `From`.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to encode cached value for {op}: {source}")]
    Encode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode cached value for {op}: {source}")]
    Decode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Process-lifetime memoization table with single-flight fetches.
#[derive(Debug, Default)]
pub struct ResponseCache {
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<serde_json::Value>>>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized answer for `key`, running `fetch` only if
    /// no successful answer is stored yet.
    ///
    /// Concurrent callers for the same key share one in-flight fetch
    /// rather than racing duplicates. A failed fetch stores nothing;
    /// the error goes to the caller that observed it and the next
    /// caller retries.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let op = key.op;
        let cell = {
            let mut cells = self.cells.lock();
            Arc::clone(cells.entry(key).or_default())
        };

        let stored = cell
            .get_or_try_init(|| async {
                let value = fetch().await?;
                serde_json::to_value(&value).map_err(|source| E::from(CacheError::Encode {
                    op,
                    source,
                }))
            })
            .await?;

        serde_json::from_value(stored.clone())
            .map_err(|source| E::from(CacheError::Decode { op, source }))
    }

    /// Number of keys that have a stored (successful) answer.
    #[must_use]
    pub fn settled_len(&self) -> usize {
        self.cells
            .lock()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }
}
