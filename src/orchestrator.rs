use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::cli::{RunConfig, RunMode};
use crate::credentials::Credentials;
use crate::error::NovaFetchError;
use crate::gallery::{self, GalleryRecord, GalleryStyle};
use crate::nova::{ApiError, CalibrationRecord, ImageKind, NovaApi, StatusSnapshot};
use crate::state_machine::{AuditRecord, RunRecord, RunState, Stage, derive_stage};
use crate::ui::RunProgress;

/// Waits that shape a run.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Pause between status checks.
    pub poll_interval: Duration,
    /// Deadline for reaching `Calibrated`, measured from the first status check.
    pub poll_timeout: Duration,
    /// Extra wait after calibration before the renderings are requested.
    pub settle: Duration,
    /// Backoff before the single whole-run retry.
    pub run_retry_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            poll_timeout: Duration::from_secs(15 * 60),
            settle: Duration::from_secs(10),
            run_retry_delay: Duration::from_secs(5),
        }
    }
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Submit-only: uploaded, not waited on.
    Submitted { submission_id: String },
    Solved { job_id: String, record_path: PathBuf },
    /// The polling deadline passed first.
    Unsolved { last_stage: Stage },
    ThumbnailOnly { record_path: PathBuf },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Unsolved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub audit: AuditRecord,
}

/// Result of the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Calibrated(StatusSnapshot),
    TimedOut { last_stage: Stage },
}

/// Poll `submission_id` until the plate is calibrated or the deadline passes.
///
/// A stage line is reported only when the stage moves past the best one seen
/// so far; equal or earlier stages are ignored. The deadline is checked
/// between polls, never mid-request.
pub async fn poll_until_calibrated(
    api: &impl NovaApi,
    submission_id: &str,
    pacing: &Pacing,
    progress: &RunProgress,
) -> Result<PollOutcome, ApiError> {
    let deadline = Instant::now() + pacing.poll_timeout;
    let mut best = Stage::None;

    while Instant::now() < deadline {
        let snapshot = api.check_status(submission_id).await?;
        let stage = derive_stage(&snapshot);
        if stage > best {
            best = stage;
            info!(submission_id, %stage, "stage changed");
            progress.stage(stage);
        } else if stage < best {
            debug!(submission_id, %stage, %best, "status reported an earlier stage");
        }

        if stage.is_terminal() {
            sleep(pacing.settle).await;
            return Ok(PollOutcome::Calibrated(snapshot));
        }
        sleep(pacing.poll_interval).await;
    }

    warn!(submission_id, last_stage = %best, "polling deadline passed");
    Ok(PollOutcome::TimedOut { last_stage: best })
}

/// Drives one job from login to the written gallery entry.
pub struct JobOrchestrator<A> {
    api: A,
    credentials: Credentials,
    pacing: Pacing,
    style: GalleryStyle,
    progress: RunProgress,
}

impl<A: NovaApi> JobOrchestrator<A> {
    pub fn new(
        api: A,
        credentials: Credentials,
        pacing: Pacing,
        style: GalleryStyle,
        progress: RunProgress,
    ) -> Self {
        Self {
            api,
            credentials,
            pacing,
            style,
            progress,
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn progress(&self) -> &RunProgress {
        &self.progress
    }

    /// Run the lifecycle, retrying once after a backoff in existing-job mode.
    ///
    /// First-time submissions are never retried: a second upload would
    /// create a duplicate job on the service.
    pub async fn run_with_retry(&self, run: &RunConfig) -> Result<RunReport, NovaFetchError> {
        match self.run_job(run, 1).await {
            Ok(report) => Ok(report),
            Err(err) if run.mode.is_existing() => {
                warn!(error = %err, "run failed, retrying existing job once");
                self.progress
                    .retry(1, 1, &err.to_string(), self.pacing.run_retry_delay);
                sleep(self.pacing.run_retry_delay).await;
                self.run_job(run, 2).await
            }
            Err(err) => Err(err),
        }
    }

    /// A single pass through the run state machine.
    pub async fn run_job(&self, run: &RunConfig, attempt: u32) -> Result<RunReport, NovaFetchError> {
        let mut record = RunRecord::new(&run.name, attempt);

        if run.mode == RunMode::ThumbnailOnly {
            self.enter(&mut record, RunState::Collecting)?;
            let record_path = self.assemble(run, None, &[]).await?;
            self.enter(&mut record, RunState::Done)?;
            return Ok(self.report(RunOutcome::ThumbnailOnly { record_path }, &record));
        }

        let session = self.api.login(self.credentials.api_key()).await?;
        self.enter(&mut record, RunState::LoggedIn)?;
        self.progress
            .success(format!("Established session with id {session}."));

        let submission_id = match &run.mode {
            RunMode::Existing { job_id } => {
                self.progress
                    .info(format!("Will query existing job id: {job_id}"));
                job_id.clone()
            }
            _ => {
                self.progress
                    .info(format!("Uploading {} to Nova...", run.file.display()));
                let id = self.api.upload(&session, &run.file, &run.name).await?;
                self.enter(&mut record, RunState::Uploaded)?;
                self.progress
                    .success(format!("Success! Submission id is {id}"));
                id
            }
        };
        record.submission_id = Some(submission_id.clone());

        if run.mode == RunMode::SubmitOnly {
            self.enter(&mut record, RunState::Done)?;
            return Ok(self.report(RunOutcome::Submitted { submission_id }, &record));
        }

        self.enter(&mut record, RunState::Polling)?;
        self.progress
            .info(format!("Getting status for job {submission_id}..."));
        let snapshot =
            match poll_until_calibrated(&self.api, &submission_id, &self.pacing, &self.progress)
                .await?
            {
                PollOutcome::Calibrated(snapshot) => snapshot,
                PollOutcome::TimedOut { last_stage } => {
                    record.last_stage = last_stage;
                    self.enter(&mut record, RunState::TimedOut)?;
                    return Ok(self.report(RunOutcome::Unsolved { last_stage }, &record));
                }
            };
        record.last_stage = Stage::Calibrated;
        self.enter(&mut record, RunState::Calibrated)?;

        let job_id = snapshot
            .solved_job_id()
            .ok_or_else(|| NovaFetchError::MissingJobId(submission_id.clone()))?;
        record.job_id = Some(job_id.clone());

        self.enter(&mut record, RunState::Collecting)?;
        let calibration = self.api.fetch_calibration(&job_id).await?;
        let objects = self.api.fetch_objects(&job_id).await?;
        debug!(job_id, objects = objects.len(), "calibration fetched");

        tokio::fs::create_dir_all(&run.target_dir).await?;
        self.progress.info("Downloading result files...");
        for kind in ImageKind::ALL {
            let dest = gallery::artifact_path(&run.target_dir, &run.name, kind);
            self.progress
                .info(format!("Downloading {}...", dest.display()));
            self.api.download_image(&job_id, kind, &dest).await?;
        }

        let record_path = self.assemble(run, Some(&calibration), &objects).await?;
        self.enter(&mut record, RunState::Done)?;
        Ok(self.report(RunOutcome::Solved { job_id, record_path }, &record))
    }

    /// Copy the original, write the thumbnail and the metadata record.
    async fn assemble(
        &self,
        run: &RunConfig,
        calibration: Option<&CalibrationRecord>,
        tags: &[String],
    ) -> Result<PathBuf, NovaFetchError> {
        tokio::fs::create_dir_all(&run.target_dir).await?;

        self.progress.info("Copying original file...");
        let copy = gallery::copy_original(&run.file, &run.target_dir, &run.name).await?;

        self.progress.info("Creating thumbnail...");
        gallery::make_thumbnail(
            &copy,
            &gallery::thumbnail_path(&run.target_dir),
            self.style.thumbnail_width,
        )
        .await?;

        let entry = GalleryRecord::new(&run.name, &run.target_dir, tags, calibration, &self.style);
        let path = gallery::record_path(&run.target_dir, &run.name);
        self.progress.print_record(&entry.render());
        self.progress
            .info(format!("Writing data to {}", path.display()));
        gallery::write_record(&path, &entry).await?;
        Ok(path)
    }

    fn enter(&self, record: &mut RunRecord, next: RunState) -> Result<(), NovaFetchError> {
        record.advance(next)?;
        self.progress.update_state(next);
        Ok(())
    }

    fn report(&self, outcome: RunOutcome, record: &RunRecord) -> RunReport {
        debug_assert!(record.state.is_terminal());
        RunReport {
            outcome,
            audit: AuditRecord::from_run(record),
        }
    }
}
