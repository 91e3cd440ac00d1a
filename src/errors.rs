// src/errors.rs
use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OsintError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Consent denied: {0}")]
    ConsentDenied(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    ServerRejected(String),

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<IntakeRejection> for OsintError {
    fn from(rejection: IntakeRejection) -> Self {
        OsintError::Validation(ValidationError::Intake(rejection))
    }
}

impl From<ConsentViolations> for OsintError {
    fn from(violations: ConsentViolations) -> Self {
        OsintError::Validation(ValidationError::Consent(violations))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0}")]
    Intake(#[from] IntakeRejection),

    #[error("{0}")]
    Consent(#[from] ConsentViolations),
}

/// Why the intake gate refused a candidate file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeRejection {
    #[error("Unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("File is too large: {size} bytes (max {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConsentField {
    FullName,
    Email,
    Purpose,
    ConsentTypes,
    AgreedToTerms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentViolation {
    FullNameMissing,
    EmailMissing,
    EmailMalformed,
    PurposeMissing,
    NoConsentTypes,
    TermsNotAccepted,
}

impl ConsentViolation {
    pub fn field(&self) -> ConsentField {
        match self {
            ConsentViolation::FullNameMissing => ConsentField::FullName,
            ConsentViolation::EmailMissing | ConsentViolation::EmailMalformed => {
                ConsentField::Email
            }
            ConsentViolation::PurposeMissing => ConsentField::Purpose,
            ConsentViolation::NoConsentTypes => ConsentField::ConsentTypes,
            ConsentViolation::TermsNotAccepted => ConsentField::AgreedToTerms,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConsentViolation::FullNameMissing => "Full name is required",
            ConsentViolation::EmailMissing => "Email is required",
            ConsentViolation::EmailMalformed => "Please enter a valid email",
            ConsentViolation::PurposeMissing => "Purpose is required",
            ConsentViolation::NoConsentTypes => "Please select at least one consent type",
            ConsentViolation::TermsNotAccepted => "You must agree to the terms",
        }
    }
}

impl fmt::Display for ConsentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Every problem found in a consent form, in form order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ConsentViolations(pub Vec<ConsentViolation>);

impl ConsentViolations {
    pub fn messages(&self) -> Vec<&'static str> {
        self.0.iter().map(ConsentViolation::message).collect()
    }

    pub fn for_field(&self, field: ConsentField) -> Option<&ConsentViolation> {
        self.0.iter().find(|v| v.field() == field)
    }
}

impl fmt::Display for ConsentViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered with an error; its detail goes to the user verbatim.
    ServerRejected,
    /// The request went out but nothing came back (network, timeout).
    NoResponse,
    /// The request could not be built or sent.
    RequestFailed,
}

pub const NO_RESPONSE_MESSAGE: &str = "No response from server. Please check your connection.";
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";
pub const ANALYSIS_FAILED_MESSAGE: &str = "Analysis failed";

/// Typed failure of a single analysis submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SubmissionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SubmissionFailure {
    pub fn server_rejected(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ServerRejected,
            message: detail.into(),
        }
    }

    pub fn no_response() -> Self {
        Self {
            kind: FailureKind::NoResponse,
            message: NO_RESPONSE_MESSAGE.to_string(),
        }
    }

    pub fn request_failed() -> Self {
        Self {
            kind: FailureKind::RequestFailed,
            message: REQUEST_FAILED_MESSAGE.to_string(),
        }
    }
}

impl From<SubmissionFailure> for OsintError {
    fn from(failure: SubmissionFailure) -> Self {
        match failure.kind {
            FailureKind::ServerRejected => OsintError::ServerRejected(failure.message),
            FailureKind::NoResponse | FailureKind::RequestFailed => {
                OsintError::Transport(failure.message)
            }
        }
    }
}
