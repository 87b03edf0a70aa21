use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stage::Stage;
use crate::error::NovaFetchError;

/// The states of a single run, from login to written gallery entry.
///
/// Happy path: IDLE → LOGGED_IN → UPLOADED → POLLING → CALIBRATED → COLLECTING → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    LoggedIn,
    Uploaded,
    Polling,
    Calibrated,
    Collecting,
    Done,
    /// Polling deadline passed before the plate was solved.
    TimedOut,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "IDLE"),
            RunState::LoggedIn => write!(f, "LOGGED_IN"),
            RunState::Uploaded => write!(f, "UPLOADED"),
            RunState::Polling => write!(f, "POLLING"),
            RunState::Calibrated => write!(f, "CALIBRATED"),
            RunState::Collecting => write!(f, "COLLECTING"),
            RunState::Done => write!(f, "DONE"),
            RunState::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

impl RunState {
    /// Whether `next` may follow `self`.
    ///
    /// Existing-job runs skip `Uploaded`, submit-only runs stop after it, and
    /// thumbnail-only runs go straight from `Idle` to `Collecting`.
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, LoggedIn)
                | (Idle, Collecting)
                | (LoggedIn, Uploaded)
                | (LoggedIn, Polling)
                | (Uploaded, Polling)
                | (Uploaded, Done)
                | (Polling, Calibrated)
                | (Polling, TimedOut)
                | (Calibrated, Collecting)
                | (Collecting, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::TimedOut)
    }
}

/// Mutable progress of one run attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub name: String,
    pub attempt: u32,
    pub state: RunState,
    pub state_history: Vec<RunState>,
    pub submission_id: Option<String>,
    pub job_id: Option<String>,
    pub last_stage: Stage,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn new(name: impl Into<String>, attempt: u32) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            attempt,
            state: RunState::Idle,
            state_history: Vec::new(),
            submission_id: None,
            job_id: None,
            last_stage: Stage::None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, rejecting transitions the run graph does not allow.
    pub fn advance(&mut self, next: RunState) -> Result<(), NovaFetchError> {
        if !self.state.can_advance_to(next) {
            return Err(NovaFetchError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state_history.push(self.state);
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Structured record produced when a run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub name: String,
    pub attempt: u32,
    pub final_state: RunState,
    pub state_transitions: Vec<RunState>,
    pub submission_id: Option<String>,
    pub job_id: Option<String>,
    pub last_stage: Stage,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl AuditRecord {
    pub fn from_run(run: &RunRecord) -> Self {
        let now = Utc::now();
        let mut transitions = run.state_history.clone();
        transitions.push(run.state);

        Self {
            name: run.name.clone(),
            attempt: run.attempt,
            final_state: run.state,
            state_transitions: transitions,
            submission_id: run.submission_id.clone(),
            job_id: run.job_id.clone(),
            last_stage: run.last_stage,
            started_at: run.started_at,
            completed_at: now,
            duration_ms: (now - run.started_at).num_milliseconds(),
        }
    }
}
