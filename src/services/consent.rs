// src/services/consent.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;

use crate::errors::{ConsentViolation, ConsentViolations, OsintError};
use crate::models::{ConsentRecord, ConsentRequest, ConsentSubmission, ConsentVerdict, RevocationReceipt};
use crate::services::id_generator::UserIdGenerator;

pub const CONSENT_DURATION_DAYS: u32 = 30;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"\S+@\S+\.\S+").unwrap();
}

/// The remote service that records and revokes consent.
#[async_trait]
pub trait ConsentService: Send + Sync {
    async fn validate_consent(
        &self,
        submission: &ConsentSubmission,
    ) -> Result<ConsentVerdict, OsintError>;

    async fn revoke_consent(
        &self,
        user_id: &str,
        consent_id: &str,
    ) -> Result<RevocationReceipt, OsintError>;
}

impl ConsentRequest {
    /// Checks the whole form and reports every problem at once.
    pub fn validate(&self) -> Result<(), ConsentViolations> {
        let mut violations = Vec::new();

        if self.full_name.trim().is_empty() {
            violations.push(ConsentViolation::FullNameMissing);
        }

        let email = self.email.trim();
        if email.is_empty() {
            violations.push(ConsentViolation::EmailMissing);
        } else if !EMAIL_PATTERN.is_match(email) {
            violations.push(ConsentViolation::EmailMalformed);
        }

        if self.purpose.trim().is_empty() {
            violations.push(ConsentViolation::PurposeMissing);
        }

        if self.consent_types.is_empty() {
            violations.push(ConsentViolation::NoConsentTypes);
        }

        if !self.agreed_to_terms {
            violations.push(ConsentViolation::TermsNotAccepted);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConsentViolations(violations))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentState {
    Idle,
    Collecting,
    Validating,
    Granted(ConsentRecord),
    Denied { reason: String },
}

impl ConsentState {
    pub fn name(&self) -> &'static str {
        match self {
            ConsentState::Idle => "idle",
            ConsentState::Collecting => "collecting",
            ConsentState::Validating => "validating",
            ConsentState::Granted(_) => "granted",
            ConsentState::Denied { .. } => "denied",
        }
    }
}

/// Gathers and verifies consent for face recognition.
///
/// `Idle -> Collecting -> Validating -> Granted | Denied`. The workflow never
/// submits an image; it only hands a [`ConsentRecord`] to whoever does.
#[derive(Debug)]
pub struct ConsentWorkflow {
    state: ConsentState,
    ids: UserIdGenerator,
}

impl Default for ConsentWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentWorkflow {
    pub fn new() -> Self {
        Self {
            state: ConsentState::Idle,
            ids: UserIdGenerator::new(),
        }
    }

    pub fn state(&self) -> &ConsentState {
        &self.state
    }

    pub fn is_granted(&self) -> bool {
        matches!(self.state, ConsentState::Granted(_))
    }

    pub fn record(&self) -> Option<&ConsentRecord> {
        match &self.state {
            ConsentState::Granted(record) => Some(record),
            _ => None,
        }
    }

    fn transition(&mut self, next: ConsentState) {
        info!("Consent workflow: {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    /// Face recognition was switched on with a file in hand.
    ///
    /// Idempotent while collecting or granted. A denied workflow starts over,
    /// as does one left in `Validating` by a dropped `submit`.
    pub fn begin_collecting(&mut self) -> &ConsentState {
        match self.state {
            ConsentState::Idle | ConsentState::Denied { .. } => {
                self.transition(ConsentState::Collecting)
            }
            ConsentState::Validating => self.recover_abandoned_validation(),
            ConsentState::Collecting | ConsentState::Granted(_) => {}
        }
        &self.state
    }

    /// `submit` holds `&mut self` until it settles, so `Validating` seen from
    /// outside a call belongs to a submit future that was dropped mid-flight.
    fn recover_abandoned_validation(&mut self) {
        warn!("Consent validation was abandoned before the service answered");
        self.transition(ConsentState::Collecting);
    }

    /// Validates the form locally, then with the consent service.
    ///
    /// Local problems keep the workflow in `Collecting` so the form can be fixed.
    /// A remote refusal or transport failure ends in `Denied`.
    pub async fn submit<S>(
        &mut self,
        request: &ConsentRequest,
        service: &S,
    ) -> Result<&ConsentRecord, OsintError>
    where
        S: ConsentService + ?Sized,
    {
        if self.state == ConsentState::Validating {
            self.recover_abandoned_validation();
        }
        if self.state != ConsentState::Collecting {
            return Err(OsintError::Workflow(format!(
                "Consent can only be submitted while collecting (currently {})",
                self.state.name()
            )));
        }

        request.validate()?;

        let submission = ConsentSubmission::new(self.ids.next_id(), request, CONSENT_DURATION_DAYS);
        self.transition(ConsentState::Validating);

        let verdict = match service.validate_consent(&submission).await {
            Ok(verdict) => verdict,
            Err(e) => {
                let reason = match e {
                    OsintError::ServerRejected(detail) => detail,
                    other => format!("Consent validation request failed: {}", other),
                };
                return Err(self.deny(reason));
            }
        };

        if !verdict.valid {
            let reason = verdict
                .error
                .or(verdict.message)
                .unwrap_or_else(|| "Consent was not accepted".to_string());
            return Err(self.deny(reason));
        }

        let record = grant(submission, verdict, Utc::now());
        info!(
            "Consent granted for {} ({} days)",
            record.user_id, record.duration_days
        );
        self.transition(ConsentState::Granted(record));
        self.record()
            .ok_or_else(|| OsintError::Workflow("Consent record missing after grant".to_string()))
    }

    fn deny(&mut self, reason: String) -> OsintError {
        warn!("Consent denied: {}", reason);
        self.transition(ConsentState::Denied {
            reason: reason.clone(),
        });
        OsintError::ConsentDenied(reason)
    }

    /// Dialog closed before completion. No network traffic, nothing kept.
    pub fn cancel(&mut self) {
        match self.state {
            ConsentState::Collecting | ConsentState::Validating | ConsentState::Denied { .. } => {
                self.transition(ConsentState::Idle)
            }
            ConsentState::Idle | ConsentState::Granted(_) => {}
        }
    }

    /// Face recognition switched off: drop whatever consent exists, locally only.
    pub fn invalidate(&mut self) {
        if self.state != ConsentState::Idle {
            if let ConsentState::Granted(record) = &self.state {
                info!("Discarding consent record for {}", record.user_id);
            }
            self.transition(ConsentState::Idle);
        }
    }

    /// Hands the granted record to a submission. The workflow returns to `Idle`.
    pub fn take_record(&mut self) -> Option<ConsentRecord> {
        match std::mem::replace(&mut self.state, ConsentState::Idle) {
            ConsentState::Granted(record) => {
                info!("Consent workflow: granted -> idle (record used)");
                Some(record)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Revokes a granted record with the consent service.
    pub async fn revoke<S>(&mut self, service: &S) -> Result<RevocationReceipt, OsintError>
    where
        S: ConsentService + ?Sized,
    {
        let record = self
            .record()
            .ok_or_else(|| OsintError::Workflow("No granted consent to revoke".to_string()))?;
        let consent_id = record.consent_id.clone().ok_or_else(|| {
            OsintError::Workflow("Consent record has no consent id to revoke".to_string())
        })?;
        let user_id = record.user_id.clone();

        let receipt = service.revoke_consent(&user_id, &consent_id).await?;
        info!("Consent {} revoked for {}", consent_id, user_id);
        self.transition(ConsentState::Idle);
        Ok(receipt)
    }
}

fn grant(submission: ConsentSubmission, verdict: ConsentVerdict, now: DateTime<Utc>) -> ConsentRecord {
    let fallback_expiry = now + Duration::days(i64::from(submission.duration_days));
    let expires_at = verdict
        .expires_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(fallback_expiry);

    ConsentRecord {
        user_id: submission.user_id,
        valid: true,
        duration_days: submission.duration_days,
        consent_id: verdict.consent_id,
        granted_at: now,
        expires_at,
        full_name: submission.full_name,
        email: submission.email,
        purpose: submission.purpose,
        consent_types: submission.consent_types.into_iter().collect(),
        agreed_to_terms: submission.agreed_to_terms,
    }
}

/// Accepts RFC 3339 and the offset-less ISO form the consent service emits.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
