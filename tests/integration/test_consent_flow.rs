//! Face recognition submissions and the consent gate in front of them

use osint_client::models::{ConsentRequest, ConsentType};
use osint_client::services::ConsentState;
use osint_client::services::presenter::FaceSection;
use osint_client::{OsintError, SessionPhase};
use serde_json::json;

use crate::fixtures::{Replies, Reply, StubBackend, face_result, jpeg_of_size, session_for};

fn consent_form() -> ConsentRequest {
    ConsentRequest {
        full_name: "Ada Lovelace".into(),
        email: "ada@example.org".into(),
        purpose: "Missing person investigation".into(),
        consent_types: [ConsentType::FaceDetection, ConsentType::EmotionAnalysis]
            .into_iter()
            .collect(),
        agreed_to_terms: true,
    }
}

#[actix_web::test]
async fn test_empty_purpose_never_reaches_network() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();

    let form = ConsentRequest {
        purpose: "   ".into(),
        ..consent_form()
    };
    let err = session.submit_consent(&form).await.unwrap_err();
    assert!(matches!(err, OsintError::Validation(_)));
    assert!(err.to_string().contains("Purpose is required"));

    assert_eq!(session.consent_state(), &ConsentState::Collecting);
    assert!(session.analyze().await.is_err());
    assert!(stub.consent_calls().is_empty());
    assert!(stub.analyze_calls().is_empty());
}

#[actix_web::test]
async fn test_refused_consent_blocks_submission() {
    let stub = StubBackend::start(Replies {
        consent: Reply::ok(json!({"valid": false, "error": "Consent expired"})),
        ..Replies::default()
    })
    .await
    .unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();

    let err = session.submit_consent(&consent_form()).await.unwrap_err();
    assert!(matches!(err, OsintError::ConsentDenied(ref reason) if reason == "Consent expired"));
    assert!(matches!(session.consent_state(), ConsentState::Denied { .. }));
    assert_eq!(session.phase(), SessionPhase::AwaitingConsent);

    assert!(session.analyze().await.is_err());
    assert_eq!(stub.consent_calls().len(), 1);
    assert!(stub.analyze_calls().is_empty());
}

#[actix_web::test]
async fn test_consent_service_error_detail_denies() {
    let stub = StubBackend::start(Replies {
        consent: Reply::status(400, json!({"detail": "Invalid consent data"})),
        ..Replies::default()
    })
    .await
    .unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();

    let err = session.submit_consent(&consent_form()).await.unwrap_err();
    assert_eq!(err.to_string(), "Consent denied: Invalid consent data");
    assert!(stub.analyze_calls().is_empty());
}

#[actix_web::test]
async fn test_granted_consent_flows_into_submission() {
    let stub = StubBackend::start(Replies {
        analyze: Reply::ok(face_result()),
        ..Replies::default()
    })
    .await
    .unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    assert_eq!(
        session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap(),
        SessionPhase::AwaitingConsent
    );

    let record = session.submit_consent(&consent_form()).await.unwrap();
    assert_eq!(record.consent_id.as_deref(), Some("consent_42"));
    assert_eq!(record.duration_days, 30);
    let user_id = record.user_id.clone();
    assert!(user_id.starts_with("user_"));
    assert_eq!(session.phase(), SessionPhase::Ready);

    let consent_calls = stub.consent_calls();
    assert_eq!(consent_calls.len(), 1);
    let body = &consent_calls[0];
    assert_eq!(body["user_id"], user_id.as_str());
    assert_eq!(body["purpose"], "Missing person investigation");
    assert_eq!(body["duration_days"], 30);
    assert_eq!(body["agreed_to_terms"], true);
    assert_eq!(body["consent_types"], json!(["face_detection", "emotion_analysis"]));

    session.set_reveal_sensitive(true);
    let report = session.analyze().await.unwrap();

    let calls = stub.analyze_calls();
    assert_eq!(calls.len(), 1);
    let fields = &calls[0].fields;
    assert_eq!(fields["enable_face_recognition"], "true");
    assert_eq!(fields["consent_provided"], "true");
    assert_eq!(fields["analysis_purpose"], "Missing person investigation");
    assert_eq!(fields["user_id"], user_id);

    let FaceSection::Shown(faces) = &report.view.face_recognition else {
        panic!("face section hidden: {:?}", report.view.face_recognition);
    };
    assert_eq!(faces.faces.len(), 1);
    assert_eq!(faces.faces[0].label, "Face 1");
    let text = report.view.to_string();
    assert!(text.contains("Woman"));
    assert!(text.contains("Face Recognition: Performed with consent"));

    // Hiding sensitive detail again only changes the rendering.
    let hidden = report.present(false);
    let FaceSection::Shown(faces) = &hidden.face_recognition else {
        panic!("face section hidden");
    };
    assert!(faces.faces[0].sensitive.is_none());

    // The record was used up by the submission.
    assert_eq!(session.consent_state(), &ConsentState::Idle);
}

#[actix_web::test]
async fn test_revoke_granted_consent() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();
    let user_id = session
        .submit_consent(&consent_form())
        .await
        .unwrap()
        .user_id
        .clone();

    let receipt = session.revoke_consent().await.unwrap();
    assert_eq!(receipt.message.as_deref(), Some("Consent revoked successfully"));
    assert_eq!(session.consent_state(), &ConsentState::Idle);
    assert_eq!(session.phase(), SessionPhase::AwaitingConsent);

    let revokes = stub.revoke_calls();
    assert_eq!(revokes.len(), 1);
    assert_eq!(revokes[0], json!({"user_id": user_id, "consent_id": "consent_42"}));
}

#[actix_web::test]
async fn test_cancel_sends_nothing() {
    let stub = StubBackend::start(Replies::default()).await.unwrap();
    let mut session = session_for(&stub);
    session.set_face_recognition(true);
    session.select_file(jpeg_of_size("p.jpg", 1024)).unwrap();

    session.cancel_consent();
    assert_eq!(session.consent_state(), &ConsentState::Idle);

    // Switching face recognition off makes the file submittable as-is.
    assert_eq!(session.set_face_recognition(false), SessionPhase::Ready);
    session.analyze().await.unwrap();

    assert!(stub.consent_calls().is_empty());
    let calls = stub.analyze_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].fields["consent_provided"], "false");
}
