// src/lib.rs
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod session;

pub use config::ClientConfig;
pub use errors::{OsintError, SubmissionFailure};
pub use session::{AnalysisReport, AnalysisSession, SessionPhase};
