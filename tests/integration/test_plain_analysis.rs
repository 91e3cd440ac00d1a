//! Submissions without face recognition

use osint_client::services::ApiClient;
use osint_client::services::presenter::{
    FaceSection, NO_LOCATION, NO_OBJECTS, NO_REVERSE_RESULTS, Section,
};
use osint_client::services::progress::ProgressStatus;
use osint_client::SessionPhase;

use crate::fixtures::{Replies, Reply, StubBackend, face_result, jpeg_of_size, session_for};

#[actix_web::test]
async fn test_two_megabyte_jpeg_single_submission() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let mut session = session_for(&stub);

    let phase = session
        .select_file(jpeg_of_size("street.jpg", 2 * 1024 * 1024))
        .unwrap();
    assert_eq!(phase, SessionPhase::Ready);

    let report = session.analyze().await.unwrap();

    let calls = stub.analyze_calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.fields["enable_face_recognition"], "false");
    assert_eq!(call.fields["consent_provided"], "false");
    assert!(!call.fields.contains_key("analysis_purpose"));
    assert!(!call.fields.contains_key("user_id"));
    assert_eq!(call.file_name.as_deref(), Some("street.jpg"));
    assert_eq!(call.file_type.as_deref(), Some("image/jpeg"));
    assert_eq!(call.file_size, 2 * 1024 * 1024);

    assert!(stub.consent_calls().is_empty());
    assert_eq!(report.progress.status, ProgressStatus::Complete);
    assert_eq!(session.phase(), SessionPhase::Settled);

    let view = &report.view;
    assert_eq!(view.processing_time.as_deref(), Some("Processed in 45.20 seconds"));
    assert_eq!(view.geolocation, Section::NoData(NO_LOCATION));
    assert_eq!(view.reverse_search, Section::NoData(NO_REVERSE_RESULTS));
    assert_eq!(view.face_recognition, FaceSection::NotRequested);
    let analysis = view.image_analysis.available().unwrap();
    assert_eq!(analysis.objects, Section::NoData(NO_OBJECTS));

    let text = view.to_string();
    assert!(text.contains(NO_LOCATION));
    assert!(text.contains("Face Recognition: Not performed"));
}

#[actix_web::test]
async fn test_progress_receiver_sees_completion() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let mut session = session_for(&stub);
    let progress = session.progress();
    assert_eq!(progress.borrow().status, ProgressStatus::Idle);

    session.select_file(jpeg_of_size("b.jpg", 4096)).unwrap();
    session.analyze().await.unwrap();

    let state = progress.borrow().clone();
    assert_eq!(state.status, ProgressStatus::Complete);
    assert_eq!(state.stage_index, state.last_index());
    assert_eq!(state.percent(), 100.0);
}

#[actix_web::test]
async fn test_face_data_without_consent_is_suppressed() {
    // The service misbehaves and returns face data for a plain submission.
    let stub = StubBackend::start(Replies {
        analyze: Reply::ok(face_result()),
        ..Replies::default()
    })
    .await
    .unwrap();
    let mut session = session_for(&stub);
    session.set_reveal_sensitive(true);

    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();
    let report = session.analyze().await.unwrap();

    assert_eq!(report.view.face_recognition, FaceSection::ConsentMissing);
    let text = report.view.to_string();
    assert!(!text.contains("Woman"));
    assert!(!text.contains("Estimated Age"));

    // The raw tree is still returned untouched.
    assert!(report.result.face_recognition().is_some());
    assert_eq!(report.result.extra["risk_assessment"]["level"], "low");
}

#[actix_web::test]
async fn test_exif_keeps_server_order() {
    let stub = StubBackend::start(Replies {
        analyze: Reply::ok(face_result()),
        ..Replies::default()
    })
    .await
    .unwrap();
    let mut session = session_for(&stub);

    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();
    let report = session.analyze().await.unwrap();

    let metadata = report.view.metadata.available().unwrap();
    let exif = metadata.exif.available().unwrap();
    let keys: Vec<&str> = exif.entries.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["Make", "Model", "FNumber"]);
    assert_eq!(exif.overflow, 0);
}

#[actix_web::test]
async fn test_health_check() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let client = ApiClient::new(&stub.config()).unwrap();
    let health = client.health_check().await.unwrap();
    assert_eq!(health.status.as_deref(), Some("healthy"));
}
