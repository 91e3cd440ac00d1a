// src/services/mod.rs
pub mod api_client;
pub mod consent;
pub mod id_generator;
pub mod intake;
pub mod presenter;
pub mod progress;

pub use api_client::{AnalysisService, ApiClient};
pub use consent::{ConsentService, ConsentState, ConsentWorkflow};
pub use intake::{CandidateFile, FileIntakeGate};
pub use presenter::{PresentOptions, ResultPresenter, ResultView};
pub use progress::{ProgressState, ProgressStatus, ProgressTracker};
