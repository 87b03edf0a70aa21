use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::nova::StatusSnapshot;

/// Progress of a submission as seen through the status endpoint.
///
/// Ordered: a later variant means further progress. `None` is the
/// pre-submission sentinel and is never derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    None,
    RequestSubmitted,
    ImageAccepted,
    JobProcessing,
    Calibrated,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        self == Stage::Calibrated
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::None => "NONE",
            Stage::RequestSubmitted => "REQUEST_SUBMITTED",
            Stage::ImageAccepted => "IMAGE_ACCEPTED",
            Stage::JobProcessing => "JOB_PROCESSING",
            Stage::Calibrated => "CALIBRATED",
        };
        f.write_str(label)
    }
}

/// Infer the stage of a submission from the arrays the service has filled in.
///
/// First match wins:
/// 1. jobs present and every calibration id is one of the jobs: `Calibrated`
/// 2. jobs present: `JobProcessing`
/// 3. images present: `ImageAccepted`
/// 4. otherwise: `RequestSubmitted`
///
/// A snapshot with jobs but no calibration ids yet counts as `JobProcessing`.
pub fn derive_stage(snapshot: &StatusSnapshot) -> Stage {
    if !snapshot.jobs.is_empty() {
        let jobs: HashSet<i64> = snapshot.job_ids().collect();
        let mut calibrations = snapshot.calibration_ids().peekable();
        let has_calibrations = calibrations.peek().is_some();
        if has_calibrations && calibrations.all(|id| jobs.contains(&id)) {
            return Stage::Calibrated;
        }
        return Stage::JobProcessing;
    }

    if !snapshot.images.is_empty() {
        return Stage::ImageAccepted;
    }

    Stage::RequestSubmitted
}
