//! Concurrent in-process ceremony: one task per party over a shared board

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use k256::ProjectivePoint;
use napdkg_core::{PartyIndex, ProtocolParameters};
use napdkg_pbb::{BulletinBoard, TopicPoller};

use crate::config::DkgConfig;
use crate::error::{PartyError, Result};
use crate::party::{Party, Reconstruction};
use crate::reference::{GroupKeyReference, ReferenceOutcome};

/// Wall-clock time spent in each phase by one party
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub setup: Duration,
    pub sharing: Duration,
    pub verification: Duration,
    pub threshold: Duration,
    pub reconstruction: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.setup + self.sharing + self.verification + self.threshold + self.reconstruction
    }

    /// `(name, duration)` pairs in phase order
    pub fn phases(&self) -> [(&'static str, Duration); 5] {
        [
            ("setup", self.setup),
            ("sharing", self.sharing),
            ("verification", self.verification),
            ("threshold", self.threshold),
            ("reconstruction", self.reconstruction),
        ]
    }
}

/// What one party ended up with
#[derive(Debug, Clone)]
pub struct PartyReport {
    pub q1: Vec<PartyIndex>,
    pub q2: Vec<PartyIndex>,
    pub reconstruction: Reconstruction,
    pub timings: PhaseTimings,
}

#[derive(Debug)]
pub struct PartyOutcome {
    pub index: PartyIndex,
    pub result: Result<PartyReport>,
}

/// Outcome of a whole run
#[derive(Debug)]
pub struct CeremonyReport {
    pub run_id: Uuid,
    pub elapsed: Duration,
    pub outcomes: Vec<PartyOutcome>,
}

impl CeremonyReport {
    pub fn successes(&self) -> impl Iterator<Item = &PartyReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (PartyIndex, &PartyError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
    }

    /// The group key if every successful party reconstructed the same one
    pub fn agreed_group_key(&self) -> Option<ProjectivePoint> {
        let mut keys = self.successes().map(|r| r.reconstruction.group_key);
        let first = keys.next()?;
        keys.all(|k| k == first).then_some(first)
    }

    pub fn mismatches(&self) -> usize {
        self.successes()
            .filter(|r| matches!(r.reconstruction.outcome, ReferenceOutcome::Mismatched { .. }))
            .count()
    }
}

async fn timed<T>(
    slot: &mut Duration,
    phase: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    let start = Instant::now();
    let result = phase.await;
    *slot = start.elapsed();
    result
}

/// Run every phase of one party in order
pub async fn run_party(mut party: Party) -> Result<PartyReport> {
    let mut timings = PhaseTimings::default();

    timed(&mut timings.setup, party.setup()).await?;
    timed(&mut timings.sharing, party.sharing()).await?;
    let q1 = timed(&mut timings.verification, party.verify_dealers()).await?;

    let start = Instant::now();
    party.publish_threshold_output().await?;
    let q2 = party.collect_threshold_outputs().await?;
    timings.threshold = start.elapsed();

    let start = Instant::now();
    let reconstruction = party.final_reconstruction()?;
    timings.reconstruction = start.elapsed();

    Ok(PartyReport {
        q1,
        q2,
        reconstruction,
        timings,
    })
}

/// Run a full ceremony on `board`, one task per party.
///
/// The board and the reference are reset first. Parties fail independently;
/// one party's error never stops its siblings.
pub async fn run_ceremony(
    config: DkgConfig,
    board: Arc<dyn BulletinBoard>,
    reference: Arc<GroupKeyReference>,
) -> Result<CeremonyReport> {
    let pp: Arc<ProtocolParameters> = Arc::new(config.protocol_parameters()?);
    let config = Arc::new(config);

    board.clear().await;
    let run_id = reference.reset();
    info!(
        "Starting run {} with t={} n={} fa={}",
        run_id, config.t, config.n, config.fa
    );
    if config.max_workers < config.n {
        warn!(
            "max_workers {} < n {}; parties waiting on unscheduled peers will time out",
            config.max_workers, config.n
        );
    }

    let poller = config.use_dealer_poller.then(|| {
        let poller = Arc::new(TopicPoller::new(board.dealer_outputs(), config.poll_interval()));
        poller.start();
        poller
    });

    let started = Instant::now();
    let permits = Arc::new(Semaphore::new(config.max_workers));
    let mut handles = Vec::with_capacity(config.n);

    for index in 0..config.n as PartyIndex {
        let mut party = Party::new(
            index,
            Arc::clone(&pp),
            Arc::clone(&config),
            Arc::clone(&board),
            Arc::clone(&reference),
        )?;
        if let Some(poller) = &poller {
            party = party.with_dealer_poller(Arc::clone(poller));
        }

        let permits = Arc::clone(&permits);
        let span = info_span!("party", index);
        let handle = tokio::spawn(
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| PartyError::InvalidState(format!("Worker pool closed: {}", e)))?;
                run_party(party).await
            }
            .instrument(span),
        );
        handles.push((index, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (index, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(PartyError::InvalidState(format!("Party task failed: {}", e))),
        };
        if let Err(e) = &result {
            error!("Party {} failed: {}", index, e);
        }
        outcomes.push(PartyOutcome { index, result });
    }

    if let Some(poller) = &poller {
        poller.stop();
    }

    let report = CeremonyReport {
        run_id,
        elapsed: started.elapsed(),
        outcomes,
    };
    info!(
        "Run {} finished in {:?}: {} succeeded, {} failed",
        run_id,
        report.elapsed,
        report.successes().count(),
        report.failures().count()
    );
    Ok(report)
}
