//! End-to-end protocol tests for NAP-DKG
//!
//! These tests run whole ceremonies over an in-memory bulletin board, either
//! through the concurrent driver or by stepping every party through its
//! phases by hand.

use std::sync::Arc;
use std::time::Duration;

use napdkg_core::{MaskedShare, PartyIndex, ProjectivePoint, ShareVerificationRecord};
use napdkg_party::{
    run_ceremony, DkgConfig, GroupKeyReference, Party, PartyError, ReferenceOutcome,
    RejectionKind,
};
use napdkg_pbb::{BulletinBoard, CountingBoard, InMemoryBoard, Phase};

fn fast_config(t: usize, n: usize, fa: usize) -> DkgConfig {
    let mut config = DkgConfig::with_threshold(t, n, fa);
    config.poll_interval_ms = 5;
    config.setup_timeout_ms = 10_000;
    config.dealer_timeout_ms = 10_000;
    config.collect_timeout_ms = 10_000;
    config
}

struct Ceremony {
    board: Arc<dyn BulletinBoard>,
    reference: Arc<GroupKeyReference>,
    parties: Vec<Party>,
}

impl Ceremony {
    fn new(config: DkgConfig) -> Self {
        let board: Arc<dyn BulletinBoard> = Arc::new(InMemoryBoard::new());
        let reference = Arc::new(GroupKeyReference::new());
        let pp = Arc::new(config.protocol_parameters().unwrap());
        let config = Arc::new(config);
        let parties = (0..config.n as PartyIndex)
            .map(|i| {
                Party::new(
                    i,
                    Arc::clone(&pp),
                    Arc::clone(&config),
                    Arc::clone(&board),
                    Arc::clone(&reference),
                )
                .unwrap()
            })
            .collect();
        Self {
            board,
            reference,
            parties,
        }
    }

    async fn setup(&mut self) {
        for party in &self.parties {
            party.publish_ephemeral_key().await.unwrap();
        }
        for party in self.parties.iter_mut() {
            party.await_ephemeral_keys().await.unwrap();
        }
    }

    async fn verify_all(&mut self) -> Vec<Vec<PartyIndex>> {
        let mut q1s = Vec::new();
        for party in self.parties.iter_mut() {
            q1s.push(party.verify_dealers().await.unwrap());
        }
        q1s
    }
}

// ==========================================
// Quorum liveness
// ==========================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_honest_parties_agree() {
    let board: Arc<dyn BulletinBoard> = Arc::new(InMemoryBoard::new());
    let reference = Arc::new(GroupKeyReference::new());

    let report = run_ceremony(fast_config(6, 10, 1), board, Arc::clone(&reference))
        .await
        .unwrap();

    assert_eq!(report.failures().count(), 0);
    assert_eq!(report.successes().count(), 10);
    for party in report.successes() {
        assert_eq!(party.q1.len(), 7);
        assert!(party.q2.len() >= 7);
    }

    let key = report.agreed_group_key().expect("parties disagree");
    assert_eq!(reference.get(), Some(key));
    assert_eq!(report.mismatches(), 0);

    let established = report
        .successes()
        .filter(|p| p.reconstruction.outcome == ReferenceOutcome::Established)
        .count();
    assert_eq!(established, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_liveness_without_shared_poller() {
    let mut config = fast_config(6, 10, 1);
    config.use_dealer_poller = false;

    let board: Arc<dyn BulletinBoard> = Arc::new(InMemoryBoard::new());
    let report = run_ceremony(config, board, Arc::new(GroupKeyReference::new()))
        .await
        .unwrap();

    assert_eq!(report.successes().count(), 10);
    assert!(report.agreed_group_key().is_some());
}

#[tokio::test]
async fn test_secret_shares_match_group_key() {
    let mut ceremony = Ceremony::new(fast_config(2, 6, 1));
    ceremony.setup().await;
    for party in &ceremony.parties {
        party.sharing().await.unwrap();
    }
    ceremony.verify_all().await;
    for party in ceremony.parties.iter_mut() {
        party.publish_threshold_output().await.unwrap();
    }

    let mut keys = Vec::new();
    for party in ceremony.parties.iter_mut() {
        party.collect_threshold_outputs().await.unwrap();
        keys.push(party.final_reconstruction().unwrap().group_key);
    }
    assert!(keys.windows(2).all(|w| w[0] == w[1]));

    // Any t + 1 secret shares interpolate to the discrete log of Y
    let pp = napdkg_core::ProtocolParameters::derive(napdkg_core::GroupParameters::secp256k1(), 2, 6)
        .unwrap();
    let subset: [PartyIndex; 3] = [5, 1, 3];
    let shares: Vec<_> = subset
        .iter()
        .map(|&i| ceremony.parties[i as usize].secret_share().unwrap())
        .collect();
    let xs: Vec<_> = subset.iter().map(|&i| pp.alpha_for_party(i)).collect();
    let secret = napdkg_core::reconstruct_scalar(&shares, &xs).unwrap();
    assert_eq!(ProjectivePoint::GENERATOR * secret, keys[0]);
    assert_eq!(ceremony.reference.get(), Some(keys[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_board_traffic_is_counted_per_phase() {
    let counting = Arc::new(CountingBoard::new(Arc::new(InMemoryBoard::new())));
    let metrics = counting.metrics();
    let board: Arc<dyn BulletinBoard> = counting;

    let report = run_ceremony(fast_config(2, 6, 1), board, Arc::new(GroupKeyReference::new()))
        .await
        .unwrap();
    assert_eq!(report.successes().count(), 6);

    for phase in [Phase::Setup, Phase::Sharing, Phase::Threshold] {
        assert_eq!(metrics.phase(phase).msgs_out, 6, "{}", phase.name());
    }
    assert_eq!(metrics.phase(Phase::Verification).msgs_out, 0);
    assert!(metrics.phase(Phase::Verification).fetches > 0);
    assert!(metrics.phase(Phase::Sharing).bytes_out > metrics.phase(Phase::Setup).bytes_out);
    assert!(metrics.total().bytes_in > 0);
}

// ==========================================
// Byzantine dealer
// ==========================================

#[tokio::test]
async fn test_corrupted_column_excludes_dealer_for_victim_only() {
    const BYZANTINE: PartyIndex = 0;
    const VICTIM: PartyIndex = 3;

    // the victim can never reach t + fa valid outputs and waits out the timeout
    let mut config = fast_config(6, 10, 2);
    config.collect_timeout_ms = 500;

    let mut ceremony = Ceremony::new(config);
    ceremony.setup().await;

    let mut dealing = ceremony.parties[BYZANTINE as usize].mask_shares().unwrap();
    dealing.masked_shares[VICTIM as usize] = MaskedShare([0xa5; 32]);
    let forged = ceremony.parties[BYZANTINE as usize].seal(dealing).unwrap();
    ceremony.parties[BYZANTINE as usize]
        .publish_sharing(&forged)
        .await
        .unwrap();
    for party in &ceremony.parties[1..] {
        party.sharing().await.unwrap();
    }

    let q1s = ceremony.verify_all().await;
    for (i, q1) in q1s.iter().enumerate() {
        if i as PartyIndex == VICTIM {
            assert_eq!(q1, &(1..=8).collect::<Vec<PartyIndex>>());
        } else {
            assert_eq!(q1, &(0..8).collect::<Vec<PartyIndex>>());
        }
    }

    let victim_rejections = ceremony.parties[VICTIM as usize].state().rejected_dealers();
    assert_eq!(victim_rejections.len(), 1);
    assert_eq!(victim_rejections[0].party, BYZANTINE);
    assert_eq!(victim_rejections[0].kind, RejectionKind::MaskConsistency);
    assert!(ceremony.parties[0].state().rejected_dealers().is_empty());

    for party in ceremony.parties.iter_mut() {
        party.publish_threshold_output().await.unwrap();
    }

    let mut keys = Vec::new();
    for party in ceremony.parties.iter_mut() {
        let collected = party.collect_threshold_outputs().await;
        if party.index() == VICTIM {
            assert!(matches!(
                collected,
                Err(PartyError::InsufficientQuorum { .. })
            ));
            continue;
        }
        let q2 = collected.unwrap();
        assert!(q2.len() >= 8);
        assert!(!q2.contains(&VICTIM));
        keys.push(party.final_reconstruction().unwrap().group_key);
    }
    assert_eq!(keys.len(), 9);
    assert!(keys.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_tampered_commitment_rejected_by_everyone() {
    let mut ceremony = Ceremony::new(fast_config(2, 6, 1));
    ceremony.setup().await;

    let dealer = &ceremony.parties[0];
    let mut forged = dealer.seal(dealer.mask_shares().unwrap()).unwrap();
    forged.commitments[4] += ProjectivePoint::GENERATOR;
    ceremony.parties[0].publish_sharing(&forged).await.unwrap();
    for party in &ceremony.parties[1..] {
        party.sharing().await.unwrap();
    }

    for q1 in ceremony.verify_all().await {
        assert_eq!(q1, vec![1, 2, 3]);
    }
    for party in &ceremony.parties {
        let rejections = party.state().rejected_dealers();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].kind, RejectionKind::ProofVerification);
    }
}

// ==========================================
// Insufficient participation
// ==========================================

#[tokio::test]
async fn test_too_few_threshold_outputs_is_insufficient_quorum() {
    let mut config = fast_config(6, 10, 1);
    config.collect_timeout_ms = 200;

    let mut ceremony = Ceremony::new(config);
    ceremony.setup().await;
    for party in &ceremony.parties {
        party.sharing().await.unwrap();
    }
    ceremony.verify_all().await;

    // only t parties publish
    for party in ceremony.parties[..6].iter_mut() {
        party.publish_threshold_output().await.unwrap();
    }

    let result = ceremony.parties[0].collect_threshold_outputs().await;
    assert!(matches!(
        result,
        Err(PartyError::InsufficientQuorum { have: 6, need: 7 })
    ));
    assert!(ceremony.parties[0].final_reconstruction().is_err());
    assert_eq!(ceremony.reference.get(), None);
    ceremony.board.clear().await;
}

#[tokio::test]
async fn test_junk_threshold_records_do_not_end_collection() {
    let mut config = fast_config(1, 5, 1);
    config.collect_timeout_ms = 5_000;

    let mut ceremony = Ceremony::new(config);
    ceremony.setup().await;
    for party in &ceremony.parties {
        party.sharing().await.unwrap();
    }
    ceremony.verify_all().await;

    let theta = ceremony.parties[0].publish_threshold_output().await.unwrap();
    let outputs = ceremony.board.threshold_outputs();
    for index in 100..105 {
        let mut record = ShareVerificationRecord::from(&theta);
        record.verifier_index = index;
        outputs.publish(record).await.unwrap();
    }
    let mut garbled = ShareVerificationRecord::from(&theta);
    garbled.verifier_index = 2;
    garbled.tau = "zz".to_string();
    outputs.publish(garbled).await.unwrap();
    let mut replayed = ShareVerificationRecord::from(&theta);
    replayed.verifier_index = 3;
    outputs.publish(replayed).await.unwrap();

    // honest outputs only show up after the junk
    let mut late: Vec<Party> = ceremony.parties.drain(1..).collect();
    let publisher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        for party in late.iter_mut() {
            party.publish_threshold_output().await.unwrap();
        }
        late
    });

    let collector = &mut ceremony.parties[0];
    let q2 = collector.collect_threshold_outputs().await.unwrap();
    assert!(q2.len() >= 2);
    assert!(q2.iter().all(|&i| i < 5));
    assert!(collector
        .state()
        .rejected_outputs()
        .iter()
        .any(|r| r.party >= 100));
    let key = collector.final_reconstruction().unwrap().group_key;

    for mut party in publisher.await.unwrap() {
        party.collect_threshold_outputs().await.unwrap();
        assert_eq!(party.final_reconstruction().unwrap().group_key, key);
    }
}
