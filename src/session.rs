// src/session.rs
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::errors::OsintError;
use crate::models::*;
use crate::services::api_client::AnalysisService;
use crate::services::consent::{ConsentService, ConsentState, ConsentWorkflow};
use crate::services::intake::{CandidateFile, FileIntakeGate};
use crate::services::presenter::{PresentOptions, ResultPresenter, ResultView};
use crate::services::progress::{ProgressState, ProgressTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing selected yet.
    Idle,
    /// A file is waiting on face-recognition consent.
    AwaitingConsent,
    /// A file can be submitted.
    Ready,
    /// The last submission finished (either way) and no new file is selected.
    Settled,
}

/// Everything a finished submission produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub view: ResultView,
    pub progress: ProgressState,
    pub options: AnalysisOptions,
}

impl AnalysisReport {
    /// Re-renders the result, e.g. after the user toggles sensitive detail.
    pub fn present(&self, reveal_sensitive: bool) -> ResultView {
        ResultPresenter::new(PresentOptions {
            consent_on_record: self.options.consent_provided,
            reveal_sensitive,
        })
        .present(&self.result)
    }
}

/// One user's analysis workflow: file intake, optional consent, submission
/// with progress, and presentation.
///
/// `analyze` borrows the session mutably for the whole submission, so a
/// second submission cannot start while one is pending.
pub struct AnalysisSession<B>
where
    B: AnalysisService + ConsentService,
{
    backend: Arc<B>,
    gate: FileIntakeGate,
    consent: ConsentWorkflow,
    tracker: ProgressTracker,
    face_recognition: bool,
    reveal_sensitive: bool,
    pending: Option<FileDescriptor>,
    settled: bool,
}

impl<B> AnalysisSession<B>
where
    B: AnalysisService + ConsentService,
{
    pub fn new(backend: Arc<B>, config: &ClientConfig) -> Self {
        Self {
            backend,
            gate: FileIntakeGate::new(),
            consent: ConsentWorkflow::new(),
            tracker: ProgressTracker::with_default_stages(config.progress_interval),
            face_recognition: false,
            reveal_sensitive: false,
            pending: None,
            settled: false,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.pending, self.face_recognition, self.consent.state()) {
            (None, _, _) if self.settled => SessionPhase::Settled,
            (None, _, _) => SessionPhase::Idle,
            (Some(_), false, _) | (Some(_), true, ConsentState::Granted(_)) => SessionPhase::Ready,
            (Some(_), true, _) => SessionPhase::AwaitingConsent,
        }
    }

    pub fn consent_state(&self) -> &ConsentState {
        self.consent.state()
    }

    pub fn pending_file(&self) -> Option<&FileDescriptor> {
        self.pending.as_ref()
    }

    /// Live progress of the current or last submission.
    pub fn progress(&self) -> watch::Receiver<ProgressState> {
        self.tracker.subscribe()
    }

    pub fn set_reveal_sensitive(&mut self, reveal: bool) {
        self.reveal_sensitive = reveal;
    }

    /// Runs the intake gate. An accepted file replaces any pending one.
    pub fn select_file(&mut self, candidate: CandidateFile) -> Result<SessionPhase, OsintError> {
        let file = self.gate.accept(candidate)?;
        if let Some(previous) = self.pending.replace(file) {
            info!("Replacing pending file {}", previous.name());
        }

        if self.face_recognition {
            self.consent.begin_collecting();
        }
        Ok(self.phase())
    }

    pub fn set_face_recognition(&mut self, enabled: bool) -> SessionPhase {
        if enabled == self.face_recognition {
            return self.phase();
        }
        self.face_recognition = enabled;
        info!(
            "Face recognition {}",
            if enabled { "enabled" } else { "disabled" }
        );

        if enabled {
            if self.pending.is_some() {
                self.consent.begin_collecting();
            }
        } else {
            self.consent.invalidate();
        }
        self.phase()
    }

    pub async fn submit_consent(
        &mut self,
        request: &ConsentRequest,
    ) -> Result<&ConsentRecord, OsintError> {
        if !self.face_recognition {
            return Err(OsintError::Workflow(
                "Consent is only collected when face recognition is enabled".to_string(),
            ));
        }
        self.consent.submit(request, self.backend.as_ref()).await
    }

    /// Closes the consent dialog. Nothing is sent.
    pub fn cancel_consent(&mut self) {
        self.consent.cancel();
    }

    pub async fn revoke_consent(&mut self) -> Result<RevocationReceipt, OsintError> {
        self.consent.revoke(self.backend.as_ref()).await
    }

    /// Submits the pending file and waits for the result while the progress
    /// tracker animates. Every outcome settles the tracker before returning.
    pub async fn analyze(&mut self) -> Result<AnalysisReport, OsintError> {
        if self.pending.is_none() {
            return Err(OsintError::Workflow("No file selected".to_string()));
        }
        if self.face_recognition && !self.consent.is_granted() {
            return Err(OsintError::Workflow(
                "Face recognition requires granted consent before submission".to_string(),
            ));
        }

        let Some(file) = self.pending.take() else {
            return Err(OsintError::Workflow("No file selected".to_string()));
        };
        let options = match self.consent.take_record() {
            Some(record) if self.face_recognition => AnalysisOptions::with_consent(&record),
            _ => AnalysisOptions::without_face_recognition(),
        };
        debug_assert!(options.is_consistent());
        self.settled = true;

        info!(
            "Submitting {} (face recognition: {}, consent: {})",
            file.name(),
            options.enable_face_recognition,
            options.consent_provided
        );

        let outcome = self
            .tracker
            .track(self.backend.analyze_image(&file, &options))
            .await;
        let progress = self.tracker.state();

        match outcome {
            Ok(result) => {
                info!("Analysis of {} complete", file.name());
                let view = ResultPresenter::new(PresentOptions {
                    consent_on_record: options.consent_provided,
                    reveal_sensitive: self.reveal_sensitive,
                })
                .present(&result);
                if result.face_recognition().is_some() && !options.consent_provided {
                    warn!("Service returned face data for a submission without consent");
                }
                Ok(AnalysisReport {
                    result,
                    view,
                    progress,
                    options,
                })
            }
            Err(failure) => {
                error!("Analysis of {} failed: {}", file.name(), failure);
                Err(failure.into())
            }
        }
    }
}
