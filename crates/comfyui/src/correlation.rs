//! Volatile half of result correlation.
//!
//! The dispatcher parks a [`CorrelationEntry`] here under the encoded
//! address of each shot it submits; the reconciler claims entries as
//! results come back. Entries do not survive a process restart, which
//! is why every dispatch also writes a durable audit row.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shotforge_core::generation::ShotParameters;
use shotforge_core::types::DbId;
use tokio::sync::RwLock;

/// Everything the reconciler needs to route one finished shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub project_id: DbId,
    /// Placement the result should replace, when the shot targeted one.
    pub target_placement_id: Option<DbId>,
    pub params: ShotParameters,
}

/// Keyed, claim-once storage for in-flight shots.
///
/// Implementations must overwrite on repeated `put` for the same
/// address (re-dispatch wins) and remove on `take` so a result can be
/// claimed exactly once.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Park an entry under `address`, replacing any previous entry.
    async fn put(&self, address: &str, entry: CorrelationEntry);

    /// Claim and remove the entry for `address`, if present.
    async fn take(&self, address: &str) -> Option<CorrelationEntry>;

    /// Number of unclaimed entries.
    async fn len(&self) -> usize;
}

/// Process-local [`CorrelationStore`] on a `tokio::sync::RwLock` map.
#[derive(Default)]
pub struct InMemoryCorrelationStore {
    entries: RwLock<HashMap<String, CorrelationEntry>>,
}

impl InMemoryCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CorrelationStore for InMemoryCorrelationStore {
    async fn put(&self, address: &str, entry: CorrelationEntry) {
        self.entries
            .write()
            .await
            .insert(address.to_string(), entry);
    }

    async fn take(&self, address: &str) -> Option<CorrelationEntry> {
        self.entries.write().await.remove(address)
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
