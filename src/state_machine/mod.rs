mod run;
mod stage;

pub use run::{AuditRecord, RunRecord, RunState};
pub use stage::{Stage, derive_stage};
