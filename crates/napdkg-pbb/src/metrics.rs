//! Message and byte counters around a bulletin board
//!
//! Sizes are the JSON wire size of each record. Each topic is used by one
//! phase, so traffic is attributed by topic and direction: ephemeral keys to
//! Setup, dealer publishes to Sharing and dealer fetches to Verification,
//! threshold outputs to Threshold.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use napdkg_core::{EphemeralKeyRecord, ShareVerificationRecord, SharingOutputRecord};

use crate::board::BulletinBoard;
use crate::error::{BoardError, Result};
use crate::topic::{Topic, TopicLog};

/// Protocol phase a unit of board traffic is charged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Sharing,
    Verification,
    Threshold,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Setup,
        Phase::Sharing,
        Phase::Verification,
        Phase::Threshold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Sharing => "sharing",
            Phase::Verification => "verification",
            Phase::Threshold => "threshold",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Point-in-time traffic totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traffic {
    /// Records published
    pub msgs_out: u64,
    pub bytes_out: u64,
    /// Records returned by fetches
    pub msgs_in: u64,
    pub bytes_in: u64,
    pub fetches: u64,
}

impl std::ops::Add for Traffic {
    type Output = Traffic;

    fn add(self, other: Traffic) -> Traffic {
        Traffic {
            msgs_out: self.msgs_out + other.msgs_out,
            bytes_out: self.bytes_out + other.bytes_out,
            msgs_in: self.msgs_in + other.msgs_in,
            bytes_in: self.bytes_in + other.bytes_in,
            fetches: self.fetches + other.fetches,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    msgs_out: AtomicU64,
    bytes_out: AtomicU64,
    msgs_in: AtomicU64,
    bytes_in: AtomicU64,
    fetches: AtomicU64,
}

impl Counters {
    fn add_out(&self, bytes: u64) {
        self.msgs_out.fetch_add(1, Ordering::Relaxed);
        self.bytes_out.fetch_add(bytes, Ordering::Relaxed);
    }

    fn add_in(&self, msgs: u64, bytes: u64) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.msgs_in.fetch_add(msgs, Ordering::Relaxed);
        self.bytes_in.fetch_add(bytes, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Traffic {
        Traffic {
            msgs_out: self.msgs_out.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            msgs_in: self.msgs_in.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for counter in [
            &self.msgs_out,
            &self.bytes_out,
            &self.msgs_in,
            &self.bytes_in,
            &self.fetches,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Per-phase traffic counters shared by every topic of a [`CountingBoard`]
#[derive(Debug, Default)]
pub struct BoardMetrics {
    phases: [Counters; 4],
}

impl BoardMetrics {
    pub fn phase(&self, phase: Phase) -> Traffic {
        self.phases[phase.slot()].snapshot()
    }

    /// `(phase, traffic)` in phase order
    pub fn snapshot(&self) -> [(Phase, Traffic); 4] {
        Phase::ALL.map(|p| (p, self.phase(p)))
    }

    pub fn total(&self) -> Traffic {
        Phase::ALL
            .iter()
            .fold(Traffic::default(), |acc, p| acc + self.phase(*p))
    }

    pub fn reset(&self) {
        for counters in &self.phases {
            counters.reset();
        }
    }

    fn counters(&self, phase: Phase) -> &Counters {
        &self.phases[phase.slot()]
    }
}

fn wire_size<M: Topic>(message: &M) -> Result<u64> {
    serde_json::to_vec(message)
        .map(|bytes| bytes.len() as u64)
        .map_err(|e| BoardError::Serialization {
            topic: M::NAME,
            reason: e.to_string(),
        })
}

struct CountingLog<M: Topic> {
    inner: Arc<dyn TopicLog<M>>,
    metrics: Arc<BoardMetrics>,
    publish_phase: Phase,
    fetch_phase: Phase,
}

#[async_trait]
impl<M: Topic> TopicLog<M> for CountingLog<M> {
    async fn publish(&self, message: M) -> Result<()> {
        let bytes = wire_size(&message)?;
        self.inner.publish(message).await?;
        self.metrics.counters(self.publish_phase).add_out(bytes);
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<M>> {
        let records = self.inner.fetch().await?;
        let bytes = records
            .iter()
            .try_fold(0u64, |acc, r| wire_size(r).map(|b| acc + b))?;
        self.metrics
            .counters(self.fetch_phase)
            .add_in(records.len() as u64, bytes);
        Ok(records)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }

    fn version(&self) -> u64 {
        self.inner.version()
    }

    async fn wait_newer_than(&self, version: u64, max_wait: Duration) -> u64 {
        self.inner.wait_newer_than(version, max_wait).await
    }
}

/// Board wrapper that counts every publish and fetch
pub struct CountingBoard {
    inner: Arc<dyn BulletinBoard>,
    metrics: Arc<BoardMetrics>,
    ephemeral_keys: Arc<CountingLog<EphemeralKeyRecord>>,
    dealer_outputs: Arc<CountingLog<SharingOutputRecord>>,
    threshold_outputs: Arc<CountingLog<ShareVerificationRecord>>,
}

impl CountingBoard {
    pub fn new(inner: Arc<dyn BulletinBoard>) -> Self {
        let metrics = Arc::new(BoardMetrics::default());
        let ephemeral_keys = Arc::new(CountingLog {
            inner: inner.ephemeral_keys(),
            metrics: Arc::clone(&metrics),
            publish_phase: Phase::Setup,
            fetch_phase: Phase::Setup,
        });
        let dealer_outputs = Arc::new(CountingLog {
            inner: inner.dealer_outputs(),
            metrics: Arc::clone(&metrics),
            publish_phase: Phase::Sharing,
            fetch_phase: Phase::Verification,
        });
        let threshold_outputs = Arc::new(CountingLog {
            inner: inner.threshold_outputs(),
            metrics: Arc::clone(&metrics),
            publish_phase: Phase::Threshold,
            fetch_phase: Phase::Threshold,
        });
        Self {
            inner,
            metrics,
            ephemeral_keys,
            dealer_outputs,
            threshold_outputs,
        }
    }

    pub fn metrics(&self) -> Arc<BoardMetrics> {
        Arc::clone(&self.metrics)
    }
}

#[async_trait]
impl BulletinBoard for CountingBoard {
    fn ephemeral_keys(&self) -> Arc<dyn TopicLog<EphemeralKeyRecord>> {
        self.ephemeral_keys.clone()
    }

    fn dealer_outputs(&self) -> Arc<dyn TopicLog<SharingOutputRecord>> {
        self.dealer_outputs.clone()
    }

    fn threshold_outputs(&self) -> Arc<dyn TopicLog<ShareVerificationRecord>> {
        self.threshold_outputs.clone()
    }

    /// Clears the wrapped board. Counters are kept until [`BoardMetrics::reset`].
    async fn clear(&self) {
        self.inner.clear().await;
    }
}
