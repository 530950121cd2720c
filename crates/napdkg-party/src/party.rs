//! One participant, talking only to the bulletin board
//!
//! Phases must be called in order: [`Party::setup`], [`Party::sharing`],
//! [`Party::verify_dealers`], [`Party::publish_threshold_output`],
//! [`Party::collect_threshold_outputs`], [`Party::final_reconstruction`].
//! Every wait on the board is bounded by a configured timeout.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use k256::{ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use napdkg_core::{
    EphemeralKeyRecord, PartyIndex, ProtocolParameters, ShareVerificationPublish,
    ShareVerificationRecord, SharingOutput, SharingOutputRecord,
};
use napdkg_pbb::{BulletinBoard, TopicPoller};

use crate::config::DkgConfig;
use crate::error::{PartyError, Result};
use crate::keys::EphemeralKeyPair;
use crate::reference::{GroupKeyReference, ReferenceOutcome};
use crate::setup::{distinct_parties, KeyDirectory};
use crate::sharing::{self, MaskedDealing};
use crate::verification::VerificationState;

/// Reconstructed group key and how it compared to the run's reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconstruction {
    pub group_key: ProjectivePoint,
    pub outcome: ReferenceOutcome,
}

/// Protocol state of one participant
pub struct Party {
    index: PartyIndex,
    pp: Arc<ProtocolParameters>,
    config: Arc<DkgConfig>,
    board: Arc<dyn BulletinBoard>,
    reference: Arc<GroupKeyReference>,
    dealer_poller: Option<Arc<TopicPoller<SharingOutputRecord>>>,
    key: EphemeralKeyPair,
    directory: Option<KeyDirectory>,
    state: VerificationState,
}

fn remaining(deadline: Instant, interval: Duration) -> Option<Duration> {
    let now = Instant::now();
    if now >= deadline {
        None
    } else {
        Some(interval.min(deadline - now))
    }
}

impl Party {
    pub fn new(
        index: PartyIndex,
        pp: Arc<ProtocolParameters>,
        config: Arc<DkgConfig>,
        board: Arc<dyn BulletinBoard>,
        reference: Arc<GroupKeyReference>,
    ) -> Result<Self> {
        if index as usize >= pp.n {
            return Err(PartyError::IdentityLookup(format!(
                "Party index {} out of range for n = {}",
                index, pp.n
            )));
        }
        Ok(Self {
            index,
            state: VerificationState::new(index, config.quorum_target()),
            pp,
            config,
            board,
            reference,
            dealer_poller: None,
            key: EphemeralKeyPair::generate(&mut OsRng),
            directory: None,
        })
    }

    /// Read dealer outputs from a shared poller instead of fetching the topic directly
    pub fn with_dealer_poller(mut self, poller: Arc<TopicPoller<SharingOutputRecord>>) -> Self {
        self.dealer_poller = Some(poller);
        self
    }

    pub fn index(&self) -> PartyIndex {
        self.index
    }

    pub fn public_key(&self) -> &ProjectivePoint {
        self.key.public()
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn directory(&self) -> Result<&KeyDirectory> {
        self.directory
            .as_ref()
            .ok_or_else(|| PartyError::InvalidState("Setup has not completed".to_string()))
    }

    /// This party's share of the group secret
    pub fn secret_share(&self) -> Result<Scalar> {
        self.state.secret_share()
    }

    // ============================================
    // Setup
    // ============================================

    pub async fn publish_ephemeral_key(&self) -> Result<()> {
        let record = EphemeralKeyRecord::from(&self.key.prove(&mut OsRng, self.index));
        self.board.ephemeral_keys().publish(record).await?;
        debug!("Party {} published its ephemeral key", self.index);
        Ok(())
    }

    /// Wait for all `n` ephemeral keys and verify them
    pub async fn await_ephemeral_keys(&mut self) -> Result<()> {
        let log = self.board.ephemeral_keys();
        let deadline = Instant::now() + self.config.setup_timeout();

        loop {
            let version = log.version();
            let records = log.fetch().await?;
            let seen = distinct_parties(&self.pp, &records);

            if seen >= self.pp.n {
                let directory = KeyDirectory::from_records(&self.pp, &records)?;
                if directory.key(self.index)? != self.key.public() {
                    return Err(PartyError::IdentityLookup(format!(
                        "Directory entry for party {} is not our key",
                        self.index
                    )));
                }
                info!("Party {} completed setup with {} keys", self.index, seen);
                self.directory = Some(directory);
                return Ok(());
            }

            match remaining(deadline, self.config.poll_interval()) {
                Some(wait) => {
                    log.wait_newer_than(version, wait).await;
                }
                None => {
                    return Err(PartyError::Timeout(format!(
                        "Saw {} of {} ephemeral keys",
                        seen, self.pp.n
                    )))
                }
            }
        }
    }

    pub async fn setup(&mut self) -> Result<()> {
        self.publish_ephemeral_key().await?;
        self.await_ephemeral_keys().await
    }

    // ============================================
    // Sharing
    // ============================================

    pub fn mask_shares(&self) -> Result<MaskedDealing> {
        Ok(sharing::mask_shares(
            &mut OsRng,
            &self.pp,
            &self.key,
            self.directory()?,
        ))
    }

    pub fn seal(&self, dealing: MaskedDealing) -> Result<SharingOutput> {
        sharing::seal(
            &mut OsRng,
            &self.pp,
            self.index,
            &self.key,
            self.directory()?,
            dealing,
        )
    }

    pub async fn publish_sharing(&self, output: &SharingOutput) -> Result<()> {
        self.board
            .dealer_outputs()
            .publish(SharingOutputRecord::from(output))
            .await?;
        debug!("Dealer {} published its sharing", self.index);
        Ok(())
    }

    /// Deal and publish
    pub async fn sharing(&self) -> Result<SharingOutput> {
        let output = self.seal(self.mask_shares()?)?;
        self.publish_sharing(&output).await?;
        Ok(output)
    }

    // ============================================
    // Verification
    // ============================================

    fn dealer_mark(&self) -> u64 {
        match &self.dealer_poller {
            Some(poller) => poller.len() as u64,
            None => self.board.dealer_outputs().version(),
        }
    }

    async fn dealer_records(&self) -> Result<Vec<SharingOutputRecord>> {
        match &self.dealer_poller {
            Some(poller) => Ok(poller.snapshot().await),
            None => Ok(self.board.dealer_outputs().fetch().await?),
        }
    }

    async fn wait_dealer_change(&self, mark: u64, wait: Duration) {
        match &self.dealer_poller {
            Some(poller) => {
                poller.wait_for_growth(mark as usize, wait).await;
            }
            None => {
                self.board.dealer_outputs().wait_newer_than(mark, wait).await;
            }
        }
    }

    /// Records claiming to come from `dealer`, empty if none arrive in time
    async fn await_dealer(&self, dealer: PartyIndex) -> Result<Vec<SharingOutputRecord>> {
        let deadline = Instant::now() + self.config.dealer_timeout();
        loop {
            let mark = self.dealer_mark();
            let records: Vec<_> = self
                .dealer_records()
                .await?
                .into_iter()
                .filter(|r| r.dealer_index == dealer)
                .collect();
            if !records.is_empty() {
                return Ok(records);
            }
            match remaining(deadline, self.config.poll_interval()) {
                Some(wait) => self.wait_dealer_change(mark, wait).await,
                None => return Ok(Vec::new()),
            }
        }
    }

    /// Check dealers in index order until Q1 reaches `t + fa`, then finalize it
    pub async fn verify_dealers(&mut self) -> Result<Vec<PartyIndex>> {
        let directory = self.directory()?.clone();

        for dealer in 0..self.pp.n as PartyIndex {
            if self.state.q1_complete() {
                break;
            }

            let records = self.await_dealer(dealer).await?;
            if records.is_empty() {
                warn!("Party {}: dealer {} absent, skipping", self.index, dealer);
                self.state.note_absent_dealer(dealer);
                continue;
            }

            for record in &records {
                let checked = SharingOutput::try_from(record)
                    .map_err(PartyError::from)
                    .and_then(|output| {
                        self.state
                            .check_dealer(&self.pp, &directory, &self.key, output)
                    });
                match checked {
                    Ok(()) => break,
                    Err(e) if e.is_candidate_rejection() => {
                        warn!("Party {}: dropping dealer {}: {}", self.index, dealer, e);
                        self.state.note_dealer_rejection(dealer, &e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let q1 = self.state.finalize_q1(&self.pp)?;
        info!("Party {} finalized Q1 {:?}", self.index, q1);
        Ok(q1)
    }

    // ============================================
    // Threshold output
    // ============================================

    pub async fn publish_threshold_output(&mut self) -> Result<ShareVerificationPublish> {
        let theta = self.state.threshold_output(&mut OsRng, &self.key)?;
        self.board
            .threshold_outputs()
            .publish(ShareVerificationRecord::from(&theta))
            .await?;
        debug!("Party {} published its threshold output", self.index);
        Ok(theta)
    }

    /// Collect and verify threshold outputs into Q2.
    ///
    /// Stops at `t + fa` verified outputs or when the collect timeout expires.
    /// Records that fail to decode or verify never count towards either. Fails
    /// unless Q2 holds `t + 1`.
    pub async fn collect_threshold_outputs(&mut self) -> Result<Vec<PartyIndex>> {
        let directory = self.directory()?.clone();
        let log = self.board.threshold_outputs();
        let deadline = Instant::now() + self.config.collect_timeout();
        let mut seen_ids = HashSet::new();

        loop {
            let version = log.version();
            for record in log.fetch().await? {
                if !seen_ids.insert(record.id.clone()) {
                    continue;
                }

                let accepted = ShareVerificationPublish::try_from(&record)
                    .map_err(PartyError::from)
                    .and_then(|theta| self.state.accept_threshold_output(&directory, theta));
                match accepted {
                    Ok(_) => {}
                    Err(e) if e.is_candidate_rejection() => {
                        warn!(
                            "Party {}: dropping threshold output of party {}: {}",
                            self.index, record.verifier_index, e
                        );
                    }
                    Err(e) => return Err(e),
                }
                if self.state.q2_complete() {
                    break;
                }
            }

            if self.state.q2_complete() {
                break;
            }
            match remaining(deadline, self.config.poll_interval()) {
                Some(wait) => {
                    log.wait_newer_than(version, wait).await;
                }
                None => {
                    debug!("Party {}: collect timeout reached", self.index);
                    break;
                }
            }
        }

        self.state.require_q2(&self.pp)?;
        let q2 = self.state.q2();
        info!("Party {} collected Q2 {:?}", self.index, q2);
        Ok(q2)
    }

    // ============================================
    // Reconstruction
    // ============================================

    /// Interpolate the group key from Q2 and offer it to the run's reference.
    ///
    /// A mismatch with the reference is logged, not returned as an error.
    pub fn final_reconstruction(&self) -> Result<Reconstruction> {
        self.state.require_q2(&self.pp)?;
        let group_key = self.state.reconstruct(&self.pp, self.directory()?)?;
        let outcome = self.reference.compare_and_set(group_key);
        match outcome {
            ReferenceOutcome::Established => {
                info!("Party {} established the reference group key", self.index)
            }
            ReferenceOutcome::Matched => {
                debug!("Party {} matches the reference group key", self.index)
            }
            ReferenceOutcome::Mismatched { .. } => {
                warn!(
                    "Party {} reconstructed a group key that differs from the reference",
                    self.index
                )
            }
        }
        Ok(Reconstruction { group_key, outcome })
    }
}

impl std::fmt::Debug for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Party")
            .field("index", &self.index)
            .field("key", &self.key)
            .field("setup_complete", &self.directory.is_some())
            .field("state", &self.state)
            .finish()
    }
}
