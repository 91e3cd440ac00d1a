// src/services/api_client.rs
use async_trait::async_trait;
use log::{error, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::errors::{ANALYSIS_FAILED_MESSAGE, OsintError, SubmissionFailure};
use crate::models::*;
use crate::services::consent::ConsentService;

pub const ANALYZE_PATH: &str = "/api/analyze-image";
pub const CONSENT_VALIDATE_PATH: &str = "/api/consent/validate";
pub const CONSENT_REVOKE_PATH: &str = "/api/consent/revoke";
pub const HEALTH_PATH: &str = "/health";

/// The remote service that runs the image analysis.
///
/// Stateless per call; callers make sure only one submission is outstanding.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze_image(
        &self,
        file: &FileDescriptor,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, SubmissionFailure>;
}

/// HTTP client for the analysis and consent endpoints.
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, OsintError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| OsintError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        info!("API Request: {} {}", method, path);
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    pub async fn health_check(&self) -> Result<HealthStatus, OsintError> {
        let response = self
            .request(Method::GET, HEALTH_PATH)
            .send()
            .await
            .map_err(|e| {
                error!("API Request Error: {}", e);
                OsintError::Transport("Health check failed".to_string())
            })?;
        log_response(&response, HEALTH_PATH);

        if !response.status().is_success() {
            return Err(OsintError::Transport("Health check failed".to_string()));
        }

        // Any 2xx counts as alive, even with an unexpected body.
        Ok(response.json().await.unwrap_or_default())
    }
}

fn log_response(response: &Response, path: &str) {
    info!("API Response: {} {}", response.status().as_u16(), path);
}

/// Multipart body of an analysis submission.
pub fn build_analysis_form(
    file: &FileDescriptor,
    options: &AnalysisOptions,
) -> Result<Form, SubmissionFailure> {
    let part = Part::bytes(file.bytes().to_vec())
        .file_name(file.name().to_string())
        .mime_str(file.mime_type())
        .map_err(|e| {
            error!("API Request Error: invalid content type {}: {}", file.mime_type(), e);
            SubmissionFailure::request_failed()
        })?;

    let mut form = Form::new()
        .part("file", part)
        .text(
            "enable_face_recognition",
            options.enable_face_recognition.to_string(),
        )
        .text("consent_provided", options.consent_provided.to_string());

    if let Some(purpose) = &options.analysis_purpose {
        form = form.text("analysis_purpose", purpose.clone());
    }
    if let Some(user_id) = &options.user_id {
        form = form.text("user_id", user_id.clone());
    }

    Ok(form)
}

/// `detail` of a FastAPI-style error body, when it is a plain string.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("detail")?.as_str().map(str::to_string)
}

fn classify_send_error(e: &reqwest::Error) -> SubmissionFailure {
    error!("API Response Error: {}", e);
    if e.is_builder() {
        SubmissionFailure::request_failed()
    } else {
        // Sent (or attempted) without an answer: connect errors, resets, timeouts.
        SubmissionFailure::no_response()
    }
}

#[async_trait]
impl AnalysisService for ApiClient {
    async fn analyze_image(
        &self,
        file: &FileDescriptor,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult, SubmissionFailure> {
        let form = build_analysis_form(file, options)?;

        let response = self
            .request(Method::POST, ANALYZE_PATH)
            .multipart(form)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;
        log_response(&response, ANALYZE_PATH);

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_send_error(&e))?;

        if !status.is_success() {
            let detail = error_detail(&body).unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string());
            error!("API Response Error: {} {}", status.as_u16(), detail);
            return Err(SubmissionFailure::server_rejected(detail));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse analysis response: {}", e);
            SubmissionFailure::server_rejected(format!("{}: malformed response", ANALYSIS_FAILED_MESSAGE))
        })
    }
}

#[async_trait]
impl ConsentService for ApiClient {
    async fn validate_consent(
        &self,
        submission: &ConsentSubmission,
    ) -> Result<ConsentVerdict, OsintError> {
        let response = self
            .request(Method::POST, CONSENT_VALIDATE_PATH)
            .json(submission)
            .send()
            .await
            .map_err(|e| {
                error!("API Request Error: {}", e);
                OsintError::Transport("Consent validation request failed".to_string())
            })?;
        log_response(&response, CONSENT_VALIDATE_PATH);

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OsintError::Transport(format!("Consent validation request failed: {}", e)))?;

        if !status.is_success() {
            let detail =
                error_detail(&body).unwrap_or_else(|| "Consent validation failed".to_string());
            return Err(OsintError::ServerRejected(detail));
        }

        serde_json::from_str(&body).map_err(|e| {
            OsintError::ServerRejected(format!("Consent validation failed: malformed response ({})", e))
        })
    }

    async fn revoke_consent(
        &self,
        user_id: &str,
        consent_id: &str,
    ) -> Result<RevocationReceipt, OsintError> {
        let response = self
            .request(Method::POST, CONSENT_REVOKE_PATH)
            .json(&json!({
                "user_id": user_id,
                "consent_id": consent_id
            }))
            .send()
            .await
            .map_err(|e| {
                error!("API Request Error: {}", e);
                OsintError::Transport("Consent revocation request failed".to_string())
            })?;
        log_response(&response, CONSENT_REVOKE_PATH);

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OsintError::Transport(format!("Consent revocation request failed: {}", e)))?;

        if !status.is_success() {
            let detail =
                error_detail(&body).unwrap_or_else(|| "Consent revocation failed".to_string());
            return Err(OsintError::ServerRejected(detail));
        }

        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}
