//! In-process stand-in for the Analysis and Consent services.
//!
//! Every request is recorded so tests can assert on what went over the wire.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{App, Error, HttpResponse, HttpServer, web};
use futures_util::TryStreamExt;
use serde_json::{Value, json};

use osint_client::services::{ApiClient, CandidateFile};
use osint_client::{AnalysisSession, ClientConfig};

/// Status and JSON body the stub answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn status(status: u16, body: Value) -> Self {
        Self { status, body }
    }
}

#[derive(Debug, Clone)]
pub struct Replies {
    pub analyze: Reply,
    pub consent: Reply,
    pub revoke: Reply,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            analyze: Reply::ok(plain_result()),
            consent: Reply::ok(json!({
                "valid": true,
                "consent_id": "consent_42",
                "expires_at": "2030-01-01T00:00:00",
                "message": "Consent validated successfully"
            })),
            revoke: Reply::ok(json!({"message": "Consent revoked successfully"})),
        }
    }
}

/// One multipart submission as the service received it.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeCall {
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: usize,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub analyze: Vec<AnalyzeCall>,
    pub consent: Vec<Value>,
    pub revoke: Vec<Value>,
}

pub struct StubState {
    replies: Replies,
    recorded: Mutex<Recorded>,
}

pub struct StubBackend {
    addr: SocketAddr,
    state: web::Data<StubState>,
}

impl StubBackend {
    pub async fn start(replies: Replies) -> std::io::Result<Self> {
        let state = web::Data::new(StubState {
            replies,
            recorded: Mutex::new(Recorded::default()),
        });

        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .route("/health", web::get().to(health))
                .service(
                    web::scope("/api")
                        .route("/analyze-image", web::post().to(analyze_image))
                        .route("/consent/validate", web::post().to(validate_consent))
                        .route("/consent/revoke", web::post().to(revoke_consent)),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());

        Ok(Self { addr, state })
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: format!("http://{}", self.addr),
            request_timeout: Duration::from_secs(10),
            progress_interval: Duration::from_millis(50),
        }
    }

    pub fn analyze_calls(&self) -> Vec<AnalyzeCall> {
        self.state.recorded.lock().unwrap().analyze.clone()
    }

    pub fn consent_calls(&self) -> Vec<Value> {
        self.state.recorded.lock().unwrap().consent.clone()
    }

    pub fn revoke_calls(&self) -> Vec<Value> {
        self.state.recorded.lock().unwrap().revoke.clone()
    }
}

fn respond(reply: &Reply) -> HttpResponse {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(&reply.body)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "healthy", "service": "OSINT Image Analysis"}))
}

async fn analyze_image(
    mut payload: Multipart,
    data: web::Data<StubState>,
) -> Result<HttpResponse, Error> {
    let mut call = AnalyzeCall::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.content_disposition().get_name().unwrap_or_default().to_string();
        let file_name = field.content_disposition().get_filename().map(str::to_string);
        let file_type = field.content_type().map(|ct| ct.to_string());

        let mut content = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            content.extend_from_slice(&chunk);
        }

        if name == "file" {
            call.file_name = file_name;
            call.file_type = file_type;
            call.file_size = content.len();
        } else {
            call.fields
                .insert(name, String::from_utf8_lossy(&content).into_owned());
        }
    }

    data.recorded.lock().unwrap().analyze.push(call);
    Ok(respond(&data.replies.analyze))
}

async fn validate_consent(body: web::Json<Value>, data: web::Data<StubState>) -> HttpResponse {
    data.recorded.lock().unwrap().consent.push(body.into_inner());
    respond(&data.replies.consent)
}

async fn revoke_consent(body: web::Json<Value>, data: web::Data<StubState>) -> HttpResponse {
    data.recorded.lock().unwrap().revoke.push(body.into_inner());
    respond(&data.replies.revoke)
}

/// A session talking HTTP to `stub`.
pub fn session_for(stub: &StubBackend) -> AnalysisSession<ApiClient> {
    let config = stub.config();
    AnalysisSession::new(Arc::new(ApiClient::new(&config).unwrap()), &config)
}

/// A JPEG-looking file of the given size.
pub fn jpeg_of_size(name: &str, size: usize) -> CandidateFile {
    let mut bytes = vec![0u8; size];
    bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    CandidateFile::new(name, "image/jpeg", bytes)
}

/// A result with no face data and sparse sections.
pub fn plain_result() -> Value {
    json!({
        "image_analysis": {
            "objects_detected": [],
            "text_extracted": [],
            "faces_count": 0
        },
        "metadata": {
            "format": "JPEG",
            "mode": "RGB",
            "image_size": {"width": 1920, "height": 1080},
            "exif": {}
        },
        "geolocation": {},
        "reverse_search_results": [],
        "report_summary": "Nothing notable was found.",
        "privacy_compliance": {"face_recognition_performed": false},
        "processing_time": 45.2
    })
}

/// A result from a consented face-recognition run.
pub fn face_result() -> Value {
    json!({
        "image_analysis": {
            "objects_detected": ["person", "bicycle"],
            "text_extracted": ["MAIN ST"],
            "scene_description": "A person with a bicycle on a city street",
            "image_quality": "high",
            "faces_count": 1,
            "face_recognition": {
                "consent_verified": true,
                "total_faces": 1,
                "processing_notes": ["Face recognition performed with valid user consent"],
                "faces_detected": [{
                    "face_id": "3f1c9a52-0d7e-4c1b-9a57-6a2f0f1f8e10",
                    "confidence": 0.93,
                    "bounding_box": {"top": 10, "right": 110, "bottom": 130, "left": 20},
                    "age_estimate": {"estimated_age": 34},
                    "gender_estimate": {"predicted_gender": "Woman"},
                    "emotion_analysis": {"happy": 0.81, "neutral": 0.12, "sad": 0.05, "angry": 0.02},
                    "similar_faces_found": []
                }]
            }
        },
        "metadata": {
            "camera_make": "Canon",
            "camera_model": "EOS 5D",
            "exif": {"Make": "Canon", "Model": "EOS 5D", "FNumber": "2.8"}
        },
        "geolocation": {
            "latitude": 40.712776,
            "longitude": -74.005974,
            "confidence": 0.9,
            "source": "GPS_EXIF"
        },
        "reverse_search_results": [
            {"title": "Street photo", "url": "https://example.com/a", "source": "Example"}
        ],
        "report_summary": "One person identified with consent.",
        "privacy_compliance": {"face_recognition_performed": true},
        "risk_assessment": {"level": "low"},
        "processing_time": 125.4
    })
}
