//! Integration tests for the webhook endpoint, driven in-process through the router.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use meetboard_server::{
    domain::{MeetingId, MeetingRepository, MeetingStatus},
    infrastructure::{
        broadcaster::BroadcasterConfig,
        signature::{SIGNATURE_HEADER, SignatureMode, SignatureVerifier, TIMESTAMP_HEADER},
    },
    ui::{AppState, MAX_WEBHOOK_BODY_BYTES, build_router},
};
use tower::ServiceExt;

use common::{Fixture, SECRET, default_fixture, fixture, meeting_event, participant_event, sign};

fn router((fixture, state): (Fixture, AppState)) -> (Router, Fixture) {
    (build_router(Arc::new(state)), fixture)
}

fn signed_request(verifier: &SignatureVerifier, body: String) -> Request<Body> {
    let (signature, timestamp) = sign(verifier, &body);
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, timestamp)
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn meeting_id(id: &str) -> MeetingId {
    MeetingId::new(id.to_string()).unwrap()
}

#[tokio::test]
async fn test_signed_lifecycle_updates_store() {
    // テスト項目: 署名付きの started → joined → ended が Store に反映される
    // given (前提条件):
    let (app, fixture) = router(default_fixture());
    let verifier = fixture.verifier.clone();

    // when (操作):
    let (status, body) = send(
        &app,
        signed_request(&verifier, meeting_event("meeting.started", "m1", Some("Standup"))),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "ok"}));
    let meeting = fixture.repository.get(&meeting_id("m1")).await.unwrap();
    assert_eq!(meeting.status, MeetingStatus::Started);
    assert_eq!(meeting.topic.as_deref(), Some("Standup"));

    // when (操作): participant_joined
    let (status, _) = send(
        &app,
        signed_request(
            &verifier,
            participant_event("meeting.participant_joined", "m1", "p1"),
        ),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        fixture
            .repository
            .count_participants(&meeting_id("m1"))
            .await
            .unwrap(),
        1
    );

    // when (操作): ended
    let (status, _) = send(
        &app,
        signed_request(&verifier, meeting_event("meeting.ended", "m1", None)),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    let meeting = fixture.repository.get(&meeting_id("m1")).await.unwrap();
    assert_eq!(meeting.status, MeetingStatus::Ended);
    assert!(meeting.participants.is_empty());
    assert!(fixture.repository.list_active().await.unwrap().is_empty());
    assert_eq!(fixture.repository.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    // テスト項目: 署名が一致しない・ヘッダが無いリクエストは 401 で、Store は変化しない
    // given (前提条件):
    let (app, fixture) = router(default_fixture());
    let body = meeting_event("meeting.started", "m1", None);
    let other = SignatureVerifier::new("wrong-secret", SignatureMode::Timestamped);

    // when (操作):
    let (wrong_status, _) = send(&app, signed_request(&other, body.clone())).await;
    let (missing_status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    // then (期待する結果):
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing_status, StatusCode::UNAUTHORIZED);
    assert!(fixture.repository.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    // テスト項目: 許容範囲外のタイムスタンプは正しく署名されていても 401
    // given (前提条件):
    let (app, fixture) = router(default_fixture());
    let body = meeting_event("meeting.started", "m1", None);
    let stale = (common::NOW_MILLIS / 1000 - 3600).to_string();
    let signature = fixture
        .verifier
        .sign(Some(&stale), body.as_bytes())
        .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(SIGNATURE_HEADER, signature)
        .header(TIMESTAMP_HEADER, stale)
        .body(Body::from(body))
        .unwrap();

    // when (操作):
    let (status, _) = send(&app, request).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_envelope_is_bad_request() {
    // テスト項目: 正しく署名された不正な JSON は 400
    let (app, fixture) = router(default_fixture());

    let (status, body) = send(
        &app,
        signed_request(&fixture.verifier, "{not json".to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_undecodable_event_is_acknowledged_and_dropped() {
    // テスト項目: 既知の種別でも payload が解釈できなければ 200 で捨てる
    // given (前提条件): object が無い
    let (app, fixture) = router(default_fixture());
    let body = serde_json::json!({
        "event": "meeting.started",
        "payload": { "account_id": "acc" },
    })
    .to_string();

    // when (操作):
    let (status, _) = send(&app, signed_request(&fixture.verifier, body)).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert!(fixture.repository.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_participant_event_for_unknown_meeting_is_acknowledged() {
    // テスト項目: 未知のミーティングへの参加はミーティングを作らず 200
    let (app, fixture) = router(default_fixture());

    let (status, _) = send(
        &app,
        signed_request(
            &fixture.verifier,
            participant_event("meeting.participant_joined", "ghost", "p1"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(fixture.repository.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_event_is_acknowledged() {
    // テスト項目: 扱わない種別は 200 で何もしない
    let (app, fixture) = router(default_fixture());

    let (status, _) = send(
        &app,
        signed_request(
            &fixture.verifier,
            meeting_event("meeting.sharing_started", "m1", None),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(fixture.repository.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_url_validation_challenge() {
    // テスト項目: URL 検証チャレンジに HMAC 付きで応答し、Store には触れない
    // given (前提条件):
    let (app, fixture) = router(default_fixture());
    let body = serde_json::json!({
        "event": "endpoint.url_validation",
        "payload": { "plainToken": "qgg8vlvZRS6UYooatFL8Aw" },
    })
    .to_string();

    // when (操作):
    let (status, response) = send(&app, signed_request(&fixture.verifier, body)).await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["plainToken"], "qgg8vlvZRS6UYooatFL8Aw");
    assert_eq!(
        response["encryptedToken"],
        SignatureVerifier::new(SECRET, SignatureMode::Timestamped)
            .challenge_response("qgg8vlvZRS6UYooatFL8Aw")
            .unwrap()
    );
    assert!(fixture.repository.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_url_validation_without_secret_is_unavailable() {
    // テスト項目: シークレット未設定ではチャレンジに答えられない
    let (app, _) = router(fixture(
        SignatureVerifier::new("", SignatureMode::Timestamped),
        BroadcasterConfig::default(),
    ));
    let body = serde_json::json!({
        "event": "endpoint.url_validation",
        "payload": { "plainToken": "token" },
    })
    .to_string();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_verification_skipped_without_secret() {
    // テスト項目: シークレット未設定なら署名ヘッダ無しでも受理される
    // given (前提条件):
    let (app, fixture) = router(fixture(
        SignatureVerifier::new("", SignatureMode::Timestamped),
        BroadcasterConfig::default(),
    ));

    // when (操作):
    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .body(Body::from(meeting_event("meeting.created", "m1", None)))
            .unwrap(),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    let meeting = fixture.repository.get(&meeting_id("m1")).await.unwrap();
    assert_eq!(meeting.status, MeetingStatus::Created);
}

#[tokio::test]
async fn test_legacy_mode_signs_body_only() {
    // テスト項目: legacy モードではタイムスタンプ無しの署名を受け付ける
    // given (前提条件):
    let verifier = SignatureVerifier::new(SECRET, SignatureMode::Legacy);
    let (app, fixture) = router(fixture(verifier.clone(), BroadcasterConfig::default()));
    let body = meeting_event("meeting.created", "m1", None);
    let signature = verifier.sign(None, body.as_bytes()).unwrap();

    // when (操作):
    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    // then (期待する結果):
    assert_eq!(status, StatusCode::OK);
    assert!(fixture.repository.get(&meeting_id("m1")).await.is_ok());
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    // テスト項目: POST 以外は 405
    let (app, _) = router(default_fixture());

    let (status, _) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/webhook")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_oversize_body_is_rejected() {
    // テスト項目: 上限を超える本文は 413
    let (app, fixture) = router(default_fixture());
    let body = "x".repeat(MAX_WEBHOOK_BODY_BYTES + 1);

    let (status, _) = send(&app, signed_request(&fixture.verifier, body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_meetings_api_reflects_state() {
    // テスト項目: GET /api/meetings が表示用の状態を返し、include_ended で絞り込める
    // given (前提条件):
    let (app, fixture) = router(default_fixture());
    let verifier = fixture.verifier.clone();
    for body in [
        meeting_event("meeting.started", "a", Some("Standup")),
        participant_event("meeting.participant_joined", "a", "p1"),
        meeting_event("meeting.ended", "b", None),
    ] {
        let (status, _) = send(&app, signed_request(&verifier, body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    // when (操作):
    let get = |uri: &'static str| {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };
    let (all_status, all) = send(&app, get("/api/meetings")).await;
    let (_, active) = send(&app, get("/api/meetings?include_ended=false")).await;

    // then (期待する結果):
    assert_eq!(all_status, StatusCode::OK);
    let all = all["meetings"].as_array().unwrap().clone();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"], "a");
    assert_eq!(all[0]["status"], "in_progress");
    assert_eq!(all[0]["participant_count"], 1);
    assert_eq!(all[1]["id"], "b");
    assert_eq!(all[1]["status"], "ended");
    assert_eq!(all[1]["participant_count"], 0);
    assert_eq!(active["meetings"].as_array().unwrap().len(), 1);
    assert_eq!(active["generated_at"], "2023-11-14T22:13:20.000Z");
}

#[tokio::test]
async fn test_health_check() {
    // テスト項目: ヘルスチェック
    let (app, _) = router(default_fixture());

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}
