//! Verification, quorum formation, threshold output and reconstruction
//!
//! [`VerificationState`] is the transport-free half of the verifier role. It
//! is fed decoded board records by [`crate::party::Party`] and owns Q1, the
//! unmasked shares addressed to this party, Θ and Q2.
//!
//! Q1 is finalized locally by sorting accepted dealers on index and keeping
//! the first `t + fa`. Two honest parties agree on Q1 whenever they accept the
//! same dealers among the lowest indices.

use std::collections::BTreeMap;

use k256::{ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};

use napdkg_core::{
    reconstruct_point, scrape, unmask_scalar, DleqProof, PartyIndex, ProtocolParameters,
    ShareVerificationPublish, SharingOutput,
};

use crate::error::{PartyError, Rejection, Result};
use crate::keys::EphemeralKeyPair;
use crate::setup::KeyDirectory;

/// A dealer accepted into Q1 together with the share it sent us
#[derive(Debug, Clone)]
struct AcceptedDealer {
    output: SharingOutput,
    share_point: ProjectivePoint,
    share_scalar: Scalar,
}

/// This party's aggregated view of Q1
#[derive(Debug, Clone, Copy)]
struct ThresholdView {
    /// EQ1 = Σ dealer public keys
    eq1: ProjectivePoint,
    theta: ShareVerificationPublish,
}

/// Per-party verifier state
#[derive(Debug)]
pub struct VerificationState {
    me: PartyIndex,
    target: usize,
    q1: BTreeMap<PartyIndex, AcceptedDealer>,
    finalized: bool,
    threshold: Option<ThresholdView>,
    q2: BTreeMap<PartyIndex, ShareVerificationPublish>,
    rejected_dealers: Vec<Rejection>,
    rejected_outputs: Vec<Rejection>,
}

impl VerificationState {
    /// Fresh state for party `me`, targeting `t + fa` entries in each quorum
    pub fn new(me: PartyIndex, target: usize) -> Self {
        Self {
            me,
            target,
            q1: BTreeMap::new(),
            finalized: false,
            threshold: None,
            q2: BTreeMap::new(),
            rejected_dealers: Vec::new(),
            rejected_outputs: Vec::new(),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Dealers currently in Q1, ascending
    pub fn q1(&self) -> Vec<PartyIndex> {
        self.q1.keys().copied().collect()
    }

    pub fn q1_len(&self) -> usize {
        self.q1.len()
    }

    pub fn q1_complete(&self) -> bool {
        self.q1.len() >= self.target
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn contains_dealer(&self, dealer: PartyIndex) -> bool {
        self.q1.contains_key(&dealer)
    }

    /// Publishers currently in Q2, ascending
    pub fn q2(&self) -> Vec<PartyIndex> {
        self.q2.keys().copied().collect()
    }

    pub fn q2_len(&self) -> usize {
        self.q2.len()
    }

    pub fn q2_complete(&self) -> bool {
        self.q2.len() >= self.target
    }

    pub fn rejected_dealers(&self) -> &[Rejection] {
        &self.rejected_dealers
    }

    pub fn rejected_outputs(&self) -> &[Rejection] {
        &self.rejected_outputs
    }

    pub fn theta(&self) -> Option<&ShareVerificationPublish> {
        self.threshold.as_ref().map(|view| &view.theta)
    }

    /// This party's share of the group secret, Σ aₖ over the finalized Q1
    pub fn secret_share(&self) -> Result<Scalar> {
        self.require_finalized()?;
        Ok(self.q1.values().map(|d| d.share_scalar).sum())
    }

    fn require_finalized(&self) -> Result<()> {
        if !self.finalized {
            return Err(PartyError::InvalidState("Q1 is not finalized".to_string()));
        }
        Ok(())
    }

    /// Record why a dealer was dropped
    pub fn note_dealer_rejection(&mut self, dealer: PartyIndex, err: &PartyError) {
        if let Some(rejection) = Rejection::from_error(dealer, err) {
            self.rejected_dealers.push(rejection);
        }
    }

    pub(crate) fn note_absent_dealer(&mut self, dealer: PartyIndex) {
        self.rejected_dealers.push(Rejection {
            party: dealer,
            kind: crate::error::RejectionKind::Absent,
        });
    }

    /// Check one dealer's publication and, if sound, add it to Q1.
    ///
    /// The aggregate DLEQ proves the columns lie on a degree-`t` polynomial;
    /// the unmask check then catches a dealer that corrupted only our column.
    pub fn check_dealer(
        &mut self,
        pp: &ProtocolParameters,
        directory: &KeyDirectory,
        key: &EphemeralKeyPair,
        output: SharingOutput,
    ) -> Result<()> {
        if self.finalized {
            return Err(PartyError::InvalidState(
                "Q1 already finalized".to_string(),
            ));
        }
        let dealer = output.dealer_index;
        if self.q1.contains_key(&dealer) {
            debug!("Dealer {} already in Q1", dealer);
            return Ok(());
        }

        let registered = directory.key(dealer).map_err(|_| {
            napdkg_core::Error::MalformedContribution(format!(
                "Dealer index {} is out of range",
                dealer
            ))
        })?;
        if *registered != output.dealer_public_key {
            return Err(PartyError::ProofVerification(format!(
                "Dealer {} signed with a key that is not its registered ephemeral key",
                dealer
            )));
        }

        let agg = scrape::aggregate(
            pp,
            &output.dealer_public_key,
            directory.keys(),
            &output.commitments,
            &output.masked_shares,
        )?;
        if !output.proof.verify(&agg.u, &output.dealer_public_key, &agg.v) {
            return Err(PartyError::ProofVerification(format!(
                "SCRAPE DLEQ proof of dealer {} does not verify",
                dealer
            )));
        }

        let (commitment, masked) = output.column(self.me).ok_or_else(|| {
            napdkg_core::Error::MalformedContribution(format!(
                "Dealer {} has no column for party {}",
                dealer, self.me
            ))
        })?;
        let share_point = *commitment - output.dealer_public_key * key.secret();
        let share_scalar = unmask_scalar(&share_point, masked)
            .filter(|a| ProjectivePoint::GENERATOR * a == share_point)
            .ok_or_else(|| {
                PartyError::MaskConsistency(format!(
                    "Share from dealer {} does not open its commitment",
                    dealer
                ))
            })?;

        debug!("Accepted dealer {} into Q1", dealer);
        self.q1.insert(
            dealer,
            AcceptedDealer {
                output,
                share_point,
                share_scalar,
            },
        );
        Ok(())
    }

    /// Sort Q1 by dealer index and keep the first `t + fa`.
    ///
    /// Fewer than `t + 1` surviving dealers cannot yield a shared key.
    pub fn finalize_q1(&mut self, pp: &ProtocolParameters) -> Result<Vec<PartyIndex>> {
        if self.q1.len() < pp.reconstruction_threshold() {
            return Err(PartyError::InsufficientQuorum {
                have: self.q1.len(),
                need: pp.reconstruction_threshold(),
            });
        }
        while self.q1.len() > self.target {
            self.q1.pop_last();
        }
        self.finalized = true;
        Ok(self.q1())
    }

    /// Build Θ = (τ, DLEQ proof that `W − τ = sk·EQ1`)
    pub fn threshold_output<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        key: &EphemeralKeyPair,
    ) -> Result<ShareVerificationPublish> {
        self.require_finalized()?;
        if let Some(view) = &self.threshold {
            return Ok(view.theta);
        }

        let mut w = ProjectivePoint::IDENTITY;
        let mut tau = ProjectivePoint::IDENTITY;
        let mut eq1 = ProjectivePoint::IDENTITY;
        for dealer in self.q1.values() {
            let (commitment, _) = dealer.output.column(self.me).ok_or_else(|| {
                PartyError::InvalidState("Accepted dealer lost our column".to_string())
            })?;
            w += commitment;
            tau += dealer.share_point;
            eq1 += dealer.output.dealer_public_key;
        }

        let proof = DleqProof::generate(rng, &eq1, key.public(), &(w - tau), key.secret());
        let theta = ShareVerificationPublish {
            party_index: self.me,
            tau,
            proof,
        };
        self.threshold = Some(ThresholdView { eq1, theta });
        Ok(theta)
    }

    fn column_sum(&self, column: PartyIndex) -> Option<ProjectivePoint> {
        self.q1.values().try_fold(ProjectivePoint::IDENTITY, |acc, dealer| {
            dealer.output.column(column).map(|(c, _)| acc + c)
        })
    }

    fn check_theta_at(
        &self,
        eq1: &ProjectivePoint,
        publisher_key: &ProjectivePoint,
        column: PartyIndex,
        theta: &ShareVerificationPublish,
    ) -> bool {
        self.column_sum(column)
            .is_some_and(|w| theta.proof.verify(eq1, publisher_key, &(w - theta.tau)))
    }

    /// Verify another party's Θ against our Q1.
    ///
    /// `Wⱼ` is always summed from column `j`, the same index whose α is used
    /// when τⱼ is interpolated.
    pub fn verify_threshold_output(
        &self,
        directory: &KeyDirectory,
        theta: &ShareVerificationPublish,
    ) -> Result<()> {
        let view = self
            .threshold
            .as_ref()
            .ok_or_else(|| PartyError::InvalidState("Threshold output not built".to_string()))?;
        let publisher = theta.party_index;
        let publisher_key = directory.key(publisher).map_err(|_| {
            napdkg_core::Error::MalformedContribution(format!(
                "Threshold output from out-of-range party {}",
                publisher
            ))
        })?;

        if self.check_theta_at(&view.eq1, publisher_key, publisher, theta) {
            return Ok(());
        }
        Err(PartyError::ProofVerification(format!(
            "Threshold output DLEQ of party {} does not verify",
            publisher
        )))
    }

    /// Verify Θ and add it to Q2. Returns whether Q2 grew.
    pub fn accept_threshold_output(
        &mut self,
        directory: &KeyDirectory,
        theta: ShareVerificationPublish,
    ) -> Result<bool> {
        if self.q2.contains_key(&theta.party_index) {
            return Ok(false);
        }
        match self.verify_threshold_output(directory, &theta) {
            Ok(()) => {
                debug!("Accepted threshold output of party {}", theta.party_index);
                self.q2.insert(theta.party_index, theta);
                Ok(true)
            }
            Err(e) => {
                if let Some(rejection) = Rejection::from_error(theta.party_index, &e) {
                    self.rejected_outputs.push(rejection);
                }
                Err(e)
            }
        }
    }

    /// Fail unless Q2 holds at least `t + 1` entries
    pub fn require_q2(&self, pp: &ProtocolParameters) -> Result<()> {
        let need = pp.reconstruction_threshold();
        if self.q2.len() < need {
            return Err(PartyError::InsufficientQuorum {
                have: self.q2.len(),
                need,
            });
        }
        Ok(())
    }

    /// Re-verify Q2 and interpolate the τⱼ at `X = 0` to recover the group key
    pub fn reconstruct(
        &self,
        pp: &ProtocolParameters,
        directory: &KeyDirectory,
    ) -> Result<ProjectivePoint> {
        let mut taus = Vec::with_capacity(self.q2.len());
        let mut xs = Vec::with_capacity(self.q2.len());
        for theta in self.q2.values() {
            match self.verify_threshold_output(directory, theta) {
                Ok(()) => {
                    taus.push(theta.tau);
                    xs.push(pp.alpha_for_party(theta.party_index));
                }
                Err(e) => warn!(
                    "Dropping threshold output of party {} on re-verification: {}",
                    theta.party_index, e
                ),
            }
        }

        let need = pp.reconstruction_threshold();
        if taus.len() < need {
            return Err(PartyError::InsufficientQuorum {
                have: taus.len(),
                need,
            });
        }
        Ok(reconstruct_point(&taus, &xs)?)
    }
}
