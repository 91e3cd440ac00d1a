// src/models.rs
use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An image that passed the intake gate. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    name: String,
    byte_size: u64,
    mime_type: String,
    bytes: Bytes,
}

impl FileDescriptor {
    pub(crate) fn new(name: String, mime_type: String, bytes: Bytes) -> Self {
        Self {
            name,
            byte_size: bytes.len() as u64,
            mime_type,
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub enable_face_recognition: bool,
    pub consent_provided: bool,
    pub analysis_purpose: Option<String>,
    pub user_id: Option<String>,
}

impl AnalysisOptions {
    pub fn without_face_recognition() -> Self {
        Self::default()
    }

    /// Options for a face-recognition run backed by a granted consent.
    pub fn with_consent(record: &ConsentRecord) -> Self {
        Self {
            enable_face_recognition: true,
            consent_provided: true,
            analysis_purpose: Some(record.purpose.clone()),
            user_id: Some(record.user_id.clone()),
        }
    }

    /// consent_provided implies face recognition, and a user id travels with consent only.
    pub fn is_consistent(&self) -> bool {
        (!self.consent_provided || self.enable_face_recognition)
            && (self.consent_provided == self.user_id.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    FaceDetection,
    DemographicAnalysis,
    EmotionAnalysis,
}

impl ConsentType {
    pub const ALL: [ConsentType; 3] = [
        ConsentType::FaceDetection,
        ConsentType::DemographicAnalysis,
        ConsentType::EmotionAnalysis,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ConsentType::FaceDetection => "Face Detection",
            ConsentType::DemographicAnalysis => "Demographic Analysis",
            ConsentType::EmotionAnalysis => "Emotion Analysis",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConsentType::FaceDetection => "Detect and count faces in the image",
            ConsentType::DemographicAnalysis => "Estimate age and gender (approximate)",
            ConsentType::EmotionAnalysis => "Analyze facial expressions and emotions",
        }
    }
}

/// Consent form as filled in by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub full_name: String,
    pub email: String,
    pub purpose: String,
    pub consent_types: BTreeSet<ConsentType>,
    pub agreed_to_terms: bool,
}

/// Body of `POST /api/consent/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSubmission {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub purpose: String,
    pub consent_types: Vec<ConsentType>,
    pub agreed_to_terms: bool,
    pub duration_days: u32,
}

impl ConsentSubmission {
    pub fn new(user_id: String, request: &ConsentRequest, duration_days: u32) -> Self {
        Self {
            user_id,
            full_name: request.full_name.trim().to_string(),
            email: request.email.trim().to_string(),
            purpose: request.purpose.trim().to_string(),
            consent_types: request.consent_types.iter().copied().collect(),
            agreed_to_terms: request.agreed_to_terms,
            duration_days,
        }
    }
}

/// What the consent service answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentVerdict {
    pub valid: bool,
    #[serde(default)]
    pub consent_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRecord {
    pub user_id: String,
    pub valid: bool,
    pub duration_days: u32,
    pub consent_id: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    pub purpose: String,
    pub consent_types: BTreeSet<ConsentType>,
    pub agreed_to_terms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevocationReceipt {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

// ---------------------------------------------------------------------------
// Analysis result tree. Every section is optional on the wire.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub image_analysis: Option<ImageAnalysis>,
    #[serde(default)]
    pub metadata: Option<ImageMetadata>,
    #[serde(default)]
    pub geolocation: Option<Geolocation>,
    #[serde(default)]
    pub reverse_search_results: Option<Vec<ReverseSearchHit>>,
    #[serde(default)]
    pub report_summary: Option<String>,
    #[serde(default)]
    pub privacy_compliance: Option<PrivacyCompliance>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    pub fn face_recognition_performed(&self) -> bool {
        self.privacy_compliance
            .as_ref()
            .is_some_and(|p| p.face_recognition_performed)
    }

    pub fn face_recognition(&self) -> Option<&FaceRecognitionResult> {
        self.image_analysis
            .as_ref()
            .and_then(|a| a.face_recognition.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub objects_detected: Vec<String>,
    #[serde(default)]
    pub text_extracted: Vec<String>,
    #[serde(default)]
    pub scene_description: Option<String>,
    #[serde(default)]
    pub image_quality: Option<String>,
    #[serde(default)]
    pub faces_count: u32,
    #[serde(default)]
    pub face_recognition: Option<FaceRecognitionResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    #[serde(default)]
    pub camera_make: Option<String>,
    #[serde(default)]
    pub camera_model: Option<String>,
    #[serde(default)]
    pub software: Option<String>,
    #[serde(default)]
    pub date_taken: Option<String>,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub gps_coordinates: Option<Coordinates>,
    /// Server order is kept.
    #[serde(default)]
    pub exif: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationSource {
    #[serde(rename = "GPS_EXIF")]
    GpsExif,
    #[serde(rename = "Visual_Analysis")]
    VisualAnalysis,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub landmarks: Vec<String>,
    #[serde(default)]
    pub source: Option<LocationSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReverseSearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivacyCompliance {
    #[serde(default)]
    pub face_recognition_performed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceRecognitionResult {
    #[serde(default)]
    pub consent_verified: bool,
    #[serde(default)]
    pub total_faces: u32,
    #[serde(default)]
    pub processing_notes: Vec<String>,
    #[serde(default)]
    pub faces_detected: Vec<Face>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Face {
    #[serde(default)]
    pub face_id: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: FaceBox,
    #[serde(default)]
    pub age_estimate: Option<AgeEstimate>,
    #[serde(default)]
    pub gender_estimate: Option<GenderEstimate>,
    #[serde(default)]
    pub emotion_analysis: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub similar_faces_found: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub top: i64,
    pub left: i64,
    pub right: i64,
    pub bottom: i64,
}

impl FaceBox {
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }
}

/// Age may come back as a number or as a string such as "unknown".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgeEstimate {
    #[serde(default)]
    pub estimated_age: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenderEstimate {
    #[serde(default)]
    pub predicted_gender: Option<String>,
}
