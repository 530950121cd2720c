//! The three-topic bulletin board consumed by the protocol

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use napdkg_core::{EphemeralKeyRecord, ShareVerificationRecord, SharingOutputRecord};

use crate::topic::{InMemoryTopic, TopicLog};

/// Public bulletin board with one typed log per protocol topic
#[async_trait]
pub trait BulletinBoard: Send + Sync + 'static {
    fn ephemeral_keys(&self) -> Arc<dyn TopicLog<EphemeralKeyRecord>>;

    fn dealer_outputs(&self) -> Arc<dyn TopicLog<SharingOutputRecord>>;

    fn threshold_outputs(&self) -> Arc<dyn TopicLog<ShareVerificationRecord>>;

    /// Wipe every topic before a new run
    async fn clear(&self);
}

/// Board held in process memory, shared between party tasks
#[derive(Clone, Default)]
pub struct InMemoryBoard {
    ephemeral_keys: Arc<InMemoryTopic<EphemeralKeyRecord>>,
    dealer_outputs: Arc<InMemoryTopic<SharingOutputRecord>>,
    threshold_outputs: Arc<InMemoryTopic<ShareVerificationRecord>>,
}

impl InMemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BulletinBoard for InMemoryBoard {
    fn ephemeral_keys(&self) -> Arc<dyn TopicLog<EphemeralKeyRecord>> {
        self.ephemeral_keys.clone()
    }

    fn dealer_outputs(&self) -> Arc<dyn TopicLog<SharingOutputRecord>> {
        self.dealer_outputs.clone()
    }

    fn threshold_outputs(&self) -> Arc<dyn TopicLog<ShareVerificationRecord>> {
        self.threshold_outputs.clone()
    }

    async fn clear(&self) {
        self.ephemeral_keys.clear().await;
        self.dealer_outputs.clear().await;
        self.threshold_outputs.clear().await;
        info!("Bulletin board cleared");
    }
}
