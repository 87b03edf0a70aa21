pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientSettings, NovaApi, NovaClient};
pub use error::ApiError;
pub use types::{CalibrationRecord, ImageKind, StatusSnapshot};
