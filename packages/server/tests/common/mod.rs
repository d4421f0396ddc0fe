//! Shared fixtures for the server integration tests.
#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use meetboard_server::{
    infrastructure::{
        broadcaster::{BroadcasterConfig, SseBroadcaster},
        repository::InMemoryMeetingRepository,
        signature::{SignatureMode, SignatureVerifier},
    },
    ui::AppState,
    usecase::MeetingService,
};
use meetboard_shared::time::{Clock, FixedClock};

pub const SECRET: &str = "test-webhook-secret";

/// テスト全体で使う固定時刻（ミリ秒）
pub const NOW_MILLIS: i64 = 1_700_000_000_000;

/// テストから直接触る依存（AppState は router / Server に渡す）
pub struct Fixture {
    pub repository: Arc<InMemoryMeetingRepository>,
    pub broadcaster: Arc<SseBroadcaster>,
    pub verifier: SignatureVerifier,
}

pub fn fixture(
    verifier: SignatureVerifier,
    broadcaster_config: BroadcasterConfig,
) -> (Fixture, AppState) {
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(NOW_MILLIS));
    let repository = Arc::new(InMemoryMeetingRepository::new());
    let broadcaster = Arc::new(SseBroadcaster::new(
        repository.clone(),
        clock.clone(),
        broadcaster_config,
    ));

    let mut meeting_service = MeetingService::new(repository.clone(), clock.clone());
    meeting_service.register_update_callback(broadcaster.clone());

    let state = AppState {
        meeting_service: Arc::new(meeting_service),
        broadcaster: broadcaster.clone(),
        verifier: verifier.clone(),
        clock,
    };

    (
        Fixture {
            repository,
            broadcaster,
            verifier,
        },
        state,
    )
}

pub fn default_fixture() -> (Fixture, AppState) {
    fixture(
        SignatureVerifier::new(SECRET, SignatureMode::Timestamped)
            .with_max_skew(Duration::from_secs(300)),
        BroadcasterConfig::default(),
    )
}

/// 現在時刻（秒）のタイムスタンプヘッダ値
pub fn request_timestamp() -> String {
    (NOW_MILLIS / 1000).to_string()
}

/// 署名ヘッダ値とタイムスタンプヘッダ値
pub fn sign(verifier: &SignatureVerifier, body: &str) -> (String, String) {
    let timestamp = request_timestamp();
    let signature = verifier
        .sign(Some(&timestamp), body.as_bytes())
        .expect("verifier must have a secret");
    (signature, timestamp)
}

pub fn meeting_event(event: &str, meeting_id: &str, topic: Option<&str>) -> String {
    let mut object = serde_json::json!({ "id": meeting_id });
    if let Some(topic) = topic {
        object["topic"] = serde_json::json!(topic);
    }
    serde_json::json!({
        "event": event,
        "event_ts": NOW_MILLIS,
        "payload": { "object": object },
    })
    .to_string()
}

pub fn participant_event(event: &str, meeting_id: &str, participant_uuid: &str) -> String {
    serde_json::json!({
        "event": event,
        "event_ts": NOW_MILLIS,
        "payload": {
            "object": {
                "id": meeting_id,
                "participant": {
                    "participant_uuid": participant_uuid,
                    "user_name": "Alice",
                    "email": "alice@example.com",
                },
            },
        },
    })
    .to_string()
}
