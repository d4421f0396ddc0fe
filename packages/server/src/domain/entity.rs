//! Entities

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{MeetingId, ParticipantId, Timestamp};

/// ミーティングのライフサイクル
///
/// 宣言順がそのまま前進方向（`Created < Updated < Started < Ended`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Created,
    Updated,
    Started,
    Ended,
}

impl MeetingStatus {
    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// ミーティング Entity
///
/// `participants` には ID のみを保持する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub topic: Option<String>,
    pub status: MeetingStatus,
    pub start_time: Option<Timestamp>,
    /// `Ended` のときのみ値を持つ
    pub end_time: Option<Timestamp>,
    #[serde(default)]
    pub participants: BTreeSet<ParticipantId>,
}

impl Meeting {
    /// 新しいミーティングを作成（参加者は空）
    pub fn new(
        id: MeetingId,
        status: MeetingStatus,
        topic: Option<String>,
        start_time: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            topic: topic.filter(|t| !t.is_empty()),
            status,
            start_time,
            end_time: None,
            participants: BTreeSet::new(),
        }
    }

    /// 終了時刻を設定する（`Ended` 以外では無視される）
    pub fn with_end_time(mut self, end_time: Option<Timestamp>) -> Self {
        if self.status.is_ended() {
            self.end_time = end_time;
        }
        self
    }

    /// Store の `save` で新規作成するときの形に揃える
    ///
    /// 参加者は空、終了時刻は `Ended` のときのみ残す。空の topic は `None`。
    pub fn into_new_record(self) -> Self {
        let end_time = if self.status.is_ended() {
            self.end_time
        } else {
            None
        };
        Self {
            topic: self.topic.filter(|t| !t.is_empty()),
            end_time,
            participants: BTreeSet::new(),
            ..self
        }
    }

    /// Store の `save` で既存レコードに受信した状態をマージする
    ///
    /// - status は前進のみ。`Started` だけは無条件に適用する（終了済みの再開）
    /// - topic は空でない場合のみ上書き
    /// - `Started` で開始時刻が来ていれば開始時刻を更新、未設定なら補完
    /// - マージ後が `Ended` なら終了時刻を記録、それ以外なら終了時刻を消す
    /// - 参加者集合には触れない
    ///
    /// Store は読み出しから書き戻しまでを 1 つのロック（または 1 回の read-merge-write）で行うこと。
    pub fn merge_from(&mut self, incoming: &Meeting) {
        self.status = match incoming.status {
            MeetingStatus::Started => MeetingStatus::Started,
            other => self.status.max(other),
        };

        if let Some(topic) = incoming.topic.as_ref().filter(|t| !t.is_empty()) {
            self.topic = Some(topic.clone());
        }

        match (incoming.status, incoming.start_time) {
            (MeetingStatus::Started, Some(start)) => self.start_time = Some(start),
            (_, Some(start)) if self.start_time.is_none() => self.start_time = Some(start),
            _ => {}
        }

        if self.status.is_ended() {
            if incoming.status.is_ended() && incoming.end_time.is_some() {
                self.end_time = incoming.end_time;
            }
        } else {
            self.end_time = None;
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}
