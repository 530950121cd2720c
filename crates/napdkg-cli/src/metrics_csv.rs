//! One CSV row per run: parameters, mean phase timings and board traffic

use std::fs::OpenOptions;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use napdkg_party::{DkgConfig, PhaseTimings};
use napdkg_pbb::{BoardMetrics, Phase};

use crate::stats::Summary;

#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    pub n: usize,
    pub t: usize,
    pub fa: usize,
    pub iteration: usize,
    pub run_id: String,
    pub parties_ok: usize,
    pub setup_ms: f64,
    pub sharing_ms: f64,
    pub verification_ms: f64,
    pub threshold_ms: f64,
    pub reconstruction_ms: f64,
    pub bytes_in_setup: u64,
    pub bytes_out_setup: u64,
    pub msgs_in_setup: u64,
    pub msgs_out_setup: u64,
    pub bytes_in_sharing: u64,
    pub bytes_out_sharing: u64,
    pub msgs_in_sharing: u64,
    pub msgs_out_sharing: u64,
    pub bytes_in_verification: u64,
    pub bytes_out_verification: u64,
    pub msgs_in_verification: u64,
    pub msgs_out_verification: u64,
    pub bytes_in_threshold: u64,
    pub bytes_out_threshold: u64,
    pub msgs_in_threshold: u64,
    pub msgs_out_threshold: u64,
}

fn mean_ms(timings: &[PhaseTimings], phase: impl Fn(&PhaseTimings) -> Duration) -> f64 {
    let samples: Vec<Duration> = timings.iter().map(phase).collect();
    Summary::of(&samples).map_or(0.0, |s| s.mean_ms)
}

impl RunRow {
    /// Timings are averaged over the parties that completed the run
    pub fn new(
        config: &DkgConfig,
        iteration: usize,
        run_id: String,
        timings: &[PhaseTimings],
        metrics: &BoardMetrics,
    ) -> Self {
        let setup = metrics.phase(Phase::Setup);
        let sharing = metrics.phase(Phase::Sharing);
        let verification = metrics.phase(Phase::Verification);
        let threshold = metrics.phase(Phase::Threshold);
        Self {
            n: config.n,
            t: config.t,
            fa: config.fa,
            iteration,
            run_id,
            parties_ok: timings.len(),
            setup_ms: mean_ms(timings, |t| t.setup),
            sharing_ms: mean_ms(timings, |t| t.sharing),
            verification_ms: mean_ms(timings, |t| t.verification),
            threshold_ms: mean_ms(timings, |t| t.threshold),
            reconstruction_ms: mean_ms(timings, |t| t.reconstruction),
            bytes_in_setup: setup.bytes_in,
            bytes_out_setup: setup.bytes_out,
            msgs_in_setup: setup.msgs_in,
            msgs_out_setup: setup.msgs_out,
            bytes_in_sharing: sharing.bytes_in,
            bytes_out_sharing: sharing.bytes_out,
            msgs_in_sharing: sharing.msgs_in,
            msgs_out_sharing: sharing.msgs_out,
            bytes_in_verification: verification.bytes_in,
            bytes_out_verification: verification.bytes_out,
            msgs_in_verification: verification.msgs_in,
            msgs_out_verification: verification.msgs_out,
            bytes_in_threshold: threshold.bytes_in,
            bytes_out_threshold: threshold.bytes_out,
            msgs_in_threshold: threshold.msgs_in,
            msgs_out_threshold: threshold.msgs_out,
        }
    }
}

/// Append `row` to `path`, writing the header only when the file is new or empty
pub fn append(path: &Path, row: &RunRow) -> Result<()> {
    let has_rows = path.exists() && std::fs::metadata(path)?.len() > 0;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!has_rows)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}
