//! Background topic cache
//!
//! A single poller task fetches a topic on change (or every poll interval)
//! and caches records by id, so many readers can share one polling loop.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::topic::{Topic, TopicLog};

struct Cache<M> {
    ids: HashSet<String>,
    items: Vec<M>,
}

struct Shared<M: Topic> {
    log: Arc<dyn TopicLog<M>>,
    interval: Duration,
    cache: RwLock<Cache<M>>,
    count_tx: watch::Sender<usize>,
}

impl<M: Topic> Shared<M> {
    async fn refresh(&self) {
        let fetched = match self.log.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Poller fetch on {} failed: {}", M::NAME, e);
                return;
            }
        };

        let mut cache = self.cache.write().await;
        let before = cache.items.len();
        for item in fetched {
            if cache.ids.insert(item.record_id().to_string()) {
                cache.items.push(item);
            }
        }
        let after = cache.items.len();
        if after != before {
            debug!("Poller on {} cached {} records", M::NAME, after);
            self.count_tx.send_replace(after);
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            let version = self.log.version();
            self.refresh().await;
            self.log.wait_newer_than(version, self.interval).await;
        }
    }
}

/// Shared background poller over one topic
pub struct TopicPoller<M: Topic> {
    shared: Arc<Shared<M>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<M: Topic> TopicPoller<M> {
    pub fn new(log: Arc<dyn TopicLog<M>>, interval: Duration) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                log,
                interval,
                cache: RwLock::new(Cache {
                    ids: HashSet::new(),
                    items: Vec::new(),
                }),
                count_tx,
            }),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the polling task. Calling this on a running poller does nothing.
    pub fn start(&self) {
        let mut handle = match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        debug!("Starting poller on {}", M::NAME);
        *handle = Some(tokio::spawn(Arc::clone(&self.shared).run()));
    }

    pub fn stop(&self) {
        let mut handle = match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(h) = handle.take() {
            debug!("Stopping poller on {}", M::NAME);
            h.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        match self.handle.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(poisoned) => poisoned.into_inner().as_ref().is_some_and(|h| !h.is_finished()),
        }
    }

    /// Cached records in first-seen order
    pub async fn snapshot(&self) -> Vec<M> {
        self.shared.cache.read().await.items.clone()
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        *self.shared.count_tx.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `k` records are cached; `false` on timeout
    pub async fn await_at_least(&self, k: usize, timeout: Duration) -> bool {
        let mut rx = self.shared.count_tx.subscribe();
        let reached = tokio::time::timeout(timeout, rx.wait_for(|count| *count >= k))
            .await
            .is_ok_and(|r| r.is_ok());
        reached
    }

    /// Wait until more than `seen` records are cached, returning the new count
    pub async fn wait_for_growth(&self, seen: usize, timeout: Duration) -> usize {
        let mut rx = self.shared.count_tx.subscribe();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|count| *count > seen)).await;
        let count = *rx.borrow();
        count
    }
}

impl<M: Topic> Drop for TopicPoller<M> {
    fn drop(&mut self) {
        self.stop();
    }
}
