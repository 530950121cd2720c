//! Typed topic logs
//!
//! Each topic carries exactly one record type. Records are kept in arrival
//! order and stored in their JSON wire form, so readers decode exactly what a
//! remote board would have returned.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::debug;

use napdkg_core::{EphemeralKeyRecord, ShareVerificationRecord, SharingOutputRecord};

use crate::error::{BoardError, Result};

/// Binds a record type to its topic name
pub trait Topic: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const NAME: &'static str;

    /// Board-assigned identifier used for deduplication and deletion
    fn record_id(&self) -> &str;
}

impl Topic for EphemeralKeyRecord {
    const NAME: &'static str = "ephemeralKeys";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Topic for SharingOutputRecord {
    const NAME: &'static str = "DealerPublish";

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Topic for ShareVerificationRecord {
    const NAME: &'static str = "ShareVerificationOutput";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Append-only log for one topic
#[async_trait]
pub trait TopicLog<M: Topic>: Send + Sync {
    /// Append a record. Publishing an id twice is a no-op.
    async fn publish(&self, message: M) -> Result<()>;

    /// All records, in arrival order
    async fn fetch(&self) -> Result<Vec<M>>;

    /// Remove a record by id, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Monotonic change counter, bumped on every mutation
    fn version(&self) -> u64;

    /// Wait until the version exceeds `version` or `max_wait` elapses.
    ///
    /// Returns the version observed on wakeup. Callers re-fetch either way,
    /// so a missed notification only costs one poll interval.
    async fn wait_newer_than(&self, version: u64, max_wait: Duration) -> u64;
}

/// In-process topic log
pub struct InMemoryTopic<M: Topic> {
    entries: RwLock<Vec<(String, String)>>,
    version_tx: watch::Sender<u64>,
    _marker: std::marker::PhantomData<fn() -> M>,
}

impl<M: Topic> InMemoryTopic<M> {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            entries: RwLock::new(Vec::new()),
            version_tx,
            _marker: std::marker::PhantomData,
        }
    }

    /// Drop every record
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        if !entries.is_empty() {
            entries.clear();
            self.version_tx.send_modify(|v| *v += 1);
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn serialization_error(e: serde_json::Error) -> BoardError {
        BoardError::Serialization {
            topic: M::NAME,
            reason: e.to_string(),
        }
    }
}

impl<M: Topic> Default for InMemoryTopic<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<M: Topic> TopicLog<M> for InMemoryTopic<M> {
    async fn publish(&self, message: M) -> Result<()> {
        let json = serde_json::to_string(&message).map_err(Self::serialization_error)?;
        let id = message.record_id().to_string();

        let mut entries = self.entries.write().await;
        if entries.iter().any(|(existing, _)| *existing == id) {
            debug!("Ignoring duplicate record {} on {}", id, M::NAME);
            return Ok(());
        }
        entries.push((id, json));
        self.version_tx.send_modify(|v| *v += 1);
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<M>> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(_, json)| serde_json::from_str(json).map_err(Self::serialization_error))
            .collect()
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(existing, _)| existing != id);
        let removed = entries.len() != before;
        if removed {
            self.version_tx.send_modify(|v| *v += 1);
        }
        Ok(removed)
    }

    fn version(&self) -> u64 {
        *self.version_tx.borrow()
    }

    async fn wait_newer_than(&self, version: u64, max_wait: Duration) -> u64 {
        let mut rx = self.version_tx.subscribe();
        let _ = tokio::time::timeout(max_wait, rx.wait_for(|v| *v > version)).await;
        let current = *rx.borrow();
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(id: &str, party: u16) -> EphemeralKeyRecord {
        EphemeralKeyRecord {
            id: id.to_string(),
            party_index: party,
            public_key: "02".to_string(),
            schnorr_proof: "1|2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_fetch_in_arrival_order() {
        let topic = InMemoryTopic::<EphemeralKeyRecord>::new();
        topic.publish(record("b", 1)).await.unwrap();
        topic.publish(record("a", 0)).await.unwrap();

        let fetched = topic.fetch().await.unwrap();
        assert_eq!(fetched, vec![record("b", 1), record("a", 0)]);
        assert_eq!(topic.version(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_ignored() {
        let topic = InMemoryTopic::<EphemeralKeyRecord>::new();
        topic.publish(record("a", 0)).await.unwrap();
        topic.publish(record("a", 5)).await.unwrap();
        assert_eq!(topic.len().await, 1);
        assert_eq!(topic.version(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let topic = InMemoryTopic::<EphemeralKeyRecord>::new();
        topic.publish(record("a", 0)).await.unwrap();
        topic.publish(record("b", 1)).await.unwrap();

        assert!(topic.delete("a").await.unwrap());
        assert!(!topic.delete("a").await.unwrap());
        assert_eq!(topic.fetch().await.unwrap(), vec![record("b", 1)]);

        topic.clear().await;
        assert!(topic.is_empty().await);
        assert_eq!(topic.version(), 4);
    }

    #[tokio::test]
    async fn test_wait_newer_than_wakes_on_publish() {
        let topic = Arc::new(InMemoryTopic::<EphemeralKeyRecord>::new());
        let waiter = {
            let topic = Arc::clone(&topic);
            tokio::spawn(async move { topic.wait_newer_than(0, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        topic.publish(record("a", 0)).await.unwrap();
        assert_eq!(waiter.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wait_newer_than_times_out() {
        let topic = InMemoryTopic::<EphemeralKeyRecord>::new();
        let version = topic.wait_newer_than(0, Duration::from_millis(20)).await;
        assert_eq!(version, 0);
    }
}
