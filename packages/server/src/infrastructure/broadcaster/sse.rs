//! SSE を使った Broadcast Manager
//!
//! ## 責務
//!
//! - 長時間接続のクライアントを登録し、クライアントごとに有界の送信キューを持たせる
//! - Meeting Service からの通知でスナップショットを 1 回だけシリアライズし、全クライアントに配る
//! - 送信は `try_send` のみ。キューが詰まったクライアントにはその更新を配らない（ログのみ）
//!
//! ## 設計ノート
//!
//! レジストリのロックはメンバーシップの保護にだけ使う。登録・解除は write、配信は read を取り、
//! ロック保持中にブロックする操作はしない。クライアント側のタスクはロックを持ったまま待機しない。
//!
//! 接続の状態遷移は `Connecting → Active → Closed`。
//! `subscribe` で登録（Active）、ストリームが破棄されると `RegistrationGuard` が解除する（Closed）。

use std::{collections::HashMap, convert::Infallible, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::response::sse::Event;
use futures_util::{Stream, StreamExt};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use meetboard_shared::time::Clock;

use crate::{
    domain::{
        ClientId, Meeting, MeetingRepository, MeetingSubscriber, Timestamp, build_status_snapshot,
    },
    infrastructure::dto::{
        snapshot::SnapshotDto,
        sse::{CONNECTED_EVENT, ConnectedDto, KEEP_ALIVE_COMMENT, UPDATE_EVENT},
    },
};

/// クライアントごとの送信キューの既定容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// keep-alive コメントの既定間隔
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// keep-alive 間隔の下限（`interval` は 0 を受け付けない）
pub const MIN_KEEP_ALIVE: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    pub queue_capacity: usize,
    pub keep_alive: Duration,
    /// `update` フレームに終了済みミーティングを含めるか
    pub include_ended: bool,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            keep_alive: DEFAULT_KEEP_ALIVE,
            include_ended: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("broadcaster is shutting down")]
    ShuttingDown,
}

/// クライアントに送るフレーム
///
/// payload は 1 回だけシリアライズし、`Arc<str>` で全クライアントに共有する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Connected(Arc<str>),
    Update(Arc<str>),
    Ping,
}

impl OutboundFrame {
    pub fn into_event(self) -> Event {
        match self {
            Self::Connected(data) => Event::default().event(CONNECTED_EVENT).data(data),
            Self::Update(data) => Event::default().event(UPDATE_EVENT).data(data),
            Self::Ping => Event::default().comment(KEEP_ALIVE_COMMENT),
        }
    }
}

/// 1 回の配信結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// キューが満杯で落としたクライアント数
    pub dropped: usize,
    /// 受信側が既に閉じていたクライアント数
    pub closed: usize,
}

struct ClientHandle {
    sender: mpsc::Sender<OutboundFrame>,
}

type ClientRegistry = Arc<RwLock<HashMap<ClientId, ClientHandle>>>;

/// SSE Broadcast Manager
pub struct SseBroadcaster {
    clients: ClientRegistry,
    repository: Arc<dyn MeetingRepository>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    config: BroadcasterConfig,
}

impl SseBroadcaster {
    pub fn new(
        repository: Arc<dyn MeetingRepository>,
        clock: Arc<dyn Clock>,
        mut config: BroadcasterConfig,
    ) -> Self {
        config.keep_alive = config.keep_alive.max(MIN_KEEP_ALIVE);
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            repository,
            clock,
            shutdown: CancellationToken::new(),
            config,
        }
    }

    /// 新しいクライアントを登録する
    ///
    /// 登録直後のキューには `connected` フレームが入っている。
    pub fn subscribe(&self) -> Result<ClientSubscription, BroadcastError> {
        if self.shutdown.is_cancelled() {
            return Err(BroadcastError::ShuttingDown);
        }

        let id = ClientId::generate();
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let cancel = self.shutdown.child_token();

        match serde_json::to_string(&ConnectedDto::from(&id)) {
            Ok(json) => {
                // 空のキューなので失敗しない
                let _ = sender.try_send(OutboundFrame::Connected(Arc::from(json)));
            }
            Err(e) => tracing::warn!(client_id = %id, error = %e, "Failed to serialize connected frame"),
        }

        self.clients.write().insert(
            id.clone(),
            ClientHandle { sender },
        );
        tracing::debug!(client_id = %id, "SSE client registered");

        Ok(ClientSubscription {
            id: id.clone(),
            receiver,
            cancel,
            keep_alive: self.config.keep_alive,
            guard: RegistrationGuard {
                id,
                clients: self.clients.clone(),
            },
        })
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// 全接続を終了させる（冪等）
    ///
    /// 書き込み中のフレームの完了待ちと猶予時間は呼び出し側の責務。
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!(
            clients = self.client_count(),
            "Shutting down SSE broadcaster"
        );
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// 全クライアントへ非ブロッキングで配信する
    pub fn broadcast(&self, frame: OutboundFrame) -> BroadcastReport {
        let clients = self.clients.read();
        let mut report = BroadcastReport::default();

        for (id, handle) in clients.iter() {
            match handle.sender.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::warn!(client_id = %id, "SSE client queue full, dropping update");
                }
                Err(TrySendError::Closed(_)) => {
                    report.closed += 1;
                    tracing::debug!(client_id = %id, "SSE client queue closed, skipping");
                }
            }
        }

        report
    }

    /// 現在のスナップショットを計算して配信する
    pub async fn publish_snapshot(&self) -> Option<BroadcastReport> {
        if self.client_count() == 0 {
            return None;
        }

        let meetings = match self.repository.list_all().await {
            Ok(meetings) => meetings,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load meetings for snapshot");
                return None;
            }
        };
        let snapshot = build_status_snapshot(
            &meetings,
            self.config.include_ended,
            Timestamp::new(self.clock.now_millis()),
        );
        let payload = match serde_json::to_string(&SnapshotDto::from(snapshot)) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize snapshot");
                return None;
            }
        };

        let report = self.broadcast(OutboundFrame::Update(Arc::from(payload)));
        tracing::debug!(
            delivered = report.delivered,
            dropped = report.dropped,
            closed = report.closed,
            "Broadcasted snapshot"
        );
        Some(report)
    }
}

#[async_trait]
impl MeetingSubscriber for SseBroadcaster {
    async fn on_meeting_changed(&self, _meeting: &Meeting) {
        self.publish_snapshot().await;
    }
}

/// ストリームの破棄（切断・終了シグナル・書き込み失敗）でレジストリから外す
struct RegistrationGuard {
    id: ClientId,
    clients: ClientRegistry,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.clients.write().remove(&self.id);
        tracing::debug!(client_id = %self.id, "SSE client deregistered");
    }
}

/// 登録済みクライアント 1 接続分
pub struct ClientSubscription {
    id: ClientId,
    receiver: mpsc::Receiver<OutboundFrame>,
    cancel: CancellationToken,
    keep_alive: Duration,
    guard: RegistrationGuard,
}

impl ClientSubscription {
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// 送信キュー・keep-alive・終了シグナルを待ち合わせるフレーム列
    pub fn into_frames(self) -> impl Stream<Item = OutboundFrame> + Send + 'static {
        let Self {
            id,
            mut receiver,
            cancel,
            keep_alive,
            guard,
        } = self;

        async_stream::stream! {
            let _guard = guard;
            let mut ticker = tokio::time::interval_at(Instant::now() + keep_alive, keep_alive);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let frame = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!(client_id = %id, "SSE client terminated");
                        break;
                    }
                    frame = receiver.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                    _ = ticker.tick() => OutboundFrame::Ping,
                };
                yield frame;
            }
        }
    }

    /// axum の `Sse` にそのまま渡せるイベント列
    pub fn into_event_stream(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        self.into_frames().map(|frame| Ok(frame.into_event()))
    }
}
