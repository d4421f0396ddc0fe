//! Redis Meeting Repository 実装
//!
//! # Key Patterns
//!
//! - `{ns}meeting:{id}` - ミーティング本体（JSON、参加者は含まない）
//! - `{ns}meeting:{id}:participants` - 参加者 ID の SET
//! - `{ns}meetings` - 既知のミーティング ID の SET（一覧用インデックス）
//!
//! キー単位の原子性のみを前提とする。`save` は GET → マージ → SET で、
//! 複数キーにまたがるトランザクションは張らない（最終的整合）。
//! 同一プロセス内の `save` は `save_lock` で直列化し、status の巻き戻りを防ぐ。
//! 新規作成時は残っている参加者 SET を同じパイプラインで消す。
//!
//! # Connection Pattern
//!
//! `ConnectionManager` は安価に clone でき、並行利用できる。操作ごとに clone して使う。

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::sync::Mutex;

use crate::domain::{Meeting, MeetingId, MeetingRepository, ParticipantId, RepositoryError};

const DEFAULT_NAMESPACE: &str = "meetboard:";

/// 外部キャッシュ（Redis）を使った Meeting Repository
pub struct RedisMeetingRepository {
    connection: ConnectionManager,
    namespace: String,
    /// read-merge-write を 1 つずつ実行する
    save_lock: Mutex<()>,
}

impl RedisMeetingRepository {
    /// Redis に接続する
    ///
    /// # Errors
    ///
    /// 接続できない場合は `RepositoryError::Backend`
    pub async fn connect(redis_url: &str) -> Result<Self, RepositoryError> {
        // redis_url は認証情報を含みうるのでログに出さない
        let client = Client::open(redis_url).map_err(|e| {
            tracing::error!(error = %e, "Failed to open Redis client");
            backend("open client", e)
        })?;
        let connection = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to Redis");
            backend("connect", e)
        })?;

        Ok(Self {
            connection,
            namespace: DEFAULT_NAMESPACE.to_string(),
            save_lock: Mutex::new(()),
        })
    }

    /// キーの名前空間を差し替える（テストや同居環境向け）
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    fn meeting_key(&self, id: &MeetingId) -> String {
        meeting_key(&self.namespace, id)
    }

    fn participants_key(&self, id: &MeetingId) -> String {
        participants_key(&self.namespace, id)
    }

    fn index_key(&self) -> String {
        index_key(&self.namespace)
    }

    async fn load_record(&self, id: &MeetingId) -> Result<Option<Meeting>, RepositoryError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn
            .get(self.meeting_key(id))
            .await
            .map_err(|e| backend("get meeting", e))?;

        raw.map(|json| {
            serde_json::from_str::<Meeting>(&json).map_err(|e| {
                RepositoryError::Backend(format!("corrupt meeting record: {e}"))
            })
        })
        .transpose()
    }

    async fn load_participants(
        &self,
        id: &MeetingId,
    ) -> Result<Vec<ParticipantId>, RepositoryError> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn
            .smembers(self.participants_key(id))
            .await
            .map_err(|e| backend("list participants", e))?;

        Ok(members
            .into_iter()
            .filter_map(|m| ParticipantId::new(m).ok())
            .collect())
    }

    async fn ensure_exists(&self, id: &MeetingId) -> Result<(), RepositoryError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn
            .exists(self.meeting_key(id))
            .await
            .map_err(|e| backend("check meeting", e))?;
        if exists {
            Ok(())
        } else {
            Err(RepositoryError::MeetingNotFound(id.as_str().to_string()))
        }
    }

    /// `created` のときは前回の削除で取り残された参加者 SET も消す
    async fn store_record(&self, meeting: &Meeting, created: bool) -> Result<(), RepositoryError> {
        let record = Meeting {
            participants: Default::default(),
            ..meeting.clone()
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| RepositoryError::Backend(format!("serialize meeting: {e}")))?;

        let mut pipe = redis::pipe();
        pipe.set(self.meeting_key(&meeting.id), json)
            .ignore()
            .sadd(self.index_key(), meeting.id.as_str())
            .ignore();
        if created {
            pipe.del(self.participants_key(&meeting.id)).ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| backend("store meeting", e))?;
        Ok(())
    }
}

fn meeting_key(namespace: &str, id: &MeetingId) -> String {
    format!("{namespace}meeting:{}", id.as_str())
}

fn participants_key(namespace: &str, id: &MeetingId) -> String {
    format!("{namespace}meeting:{}:participants", id.as_str())
}

fn index_key(namespace: &str) -> String {
    format!("{namespace}meetings")
}

fn backend(operation: &str, error: redis::RedisError) -> RepositoryError {
    RepositoryError::Backend(format!("{operation}: {error}"))
}

#[async_trait]
impl MeetingRepository for RedisMeetingRepository {
    async fn save(&self, meeting: Meeting) -> Result<Meeting, RepositoryError> {
        let _guard = self.save_lock.lock().await;
        let (stored, created) = match self.load_record(&meeting.id).await? {
            Some(mut existing) => {
                existing.merge_from(&meeting);
                (existing, false)
            }
            None => (meeting.into_new_record(), true),
        };
        self.store_record(&stored, created).await?;

        let mut result = stored;
        result.participants = self
            .load_participants(&result.id)
            .await?
            .into_iter()
            .collect();
        Ok(result)
    }

    async fn get(&self, id: &MeetingId) -> Result<Meeting, RepositoryError> {
        let mut meeting = self
            .load_record(id)
            .await?
            .ok_or_else(|| RepositoryError::MeetingNotFound(id.as_str().to_string()))?;
        meeting.participants = self.load_participants(id).await?.into_iter().collect();
        Ok(meeting)
    }

    async fn list_active(&self) -> Result<Vec<Meeting>, RepositoryError> {
        let all = self.list_all().await?;
        Ok(all.into_iter().filter(|m| !m.status.is_ended()).collect())
    }

    async fn list_all(&self) -> Result<Vec<Meeting>, RepositoryError> {
        let mut conn = self.connection.clone();
        let ids: Vec<String> = conn
            .smembers(self.index_key())
            .await
            .map_err(|e| backend("list meetings", e))?;

        let mut meetings = Vec::with_capacity(ids.len());
        for raw_id in ids {
            let Ok(id) = MeetingId::new(raw_id) else {
                continue;
            };
            // インデックスと本体の間は最終的整合なので、消えたものは飛ばす
            match self.get(&id).await {
                Ok(meeting) => meetings.push(meeting),
                Err(RepositoryError::MeetingNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(meetings)
    }

    async fn delete(&self, id: &MeetingId) -> Result<(), RepositoryError> {
        self.ensure_exists(id).await?;

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .del(self.meeting_key(id))
            .ignore()
            .del(self.participants_key(id))
            .ignore()
            .srem(self.index_key(), id.as_str())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| backend("delete meeting", e))?;
        Ok(())
    }

    async fn add_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: ParticipantId,
    ) -> Result<(), RepositoryError> {
        self.ensure_exists(meeting_id).await?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .sadd(self.participants_key(meeting_id), participant_id.as_str())
            .await
            .map_err(|e| backend("add participant", e))?;
        Ok(())
    }

    async fn remove_participant(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> Result<(), RepositoryError> {
        self.ensure_exists(meeting_id).await?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .srem(self.participants_key(meeting_id), participant_id.as_str())
            .await
            .map_err(|e| backend("remove participant", e))?;
        Ok(())
    }

    async fn count_participants(&self, meeting_id: &MeetingId) -> Result<usize, RepositoryError> {
        self.ensure_exists(meeting_id).await?;

        let mut conn = self.connection.clone();
        conn.scard(self.participants_key(meeting_id))
            .await
            .map_err(|e| backend("count participants", e))
    }

    async fn clear_participants(&self, meeting_id: &MeetingId) -> Result<(), RepositoryError> {
        self.ensure_exists(meeting_id).await?;

        let mut conn = self.connection.clone();
        let _: () = conn
            .del(self.participants_key(meeting_id))
            .await
            .map_err(|e| backend("clear participants", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MeetingStatus, Timestamp};

    // MEETBOARD_TEST_REDIS_URL が設定されている場合のみ実行する
    async fn repository() -> Option<RedisMeetingRepository> {
        let url = std::env::var("MEETBOARD_TEST_REDIS_URL").ok()?;
        let namespace = format!("meetboard-test:{}:", uuid::Uuid::new_v4());
        let repo = RedisMeetingRepository::connect(&url)
            .await
            .expect("redis should be reachable")
            .with_namespace(namespace);
        Some(repo)
    }

    fn meeting_id(id: &str) -> MeetingId {
        MeetingId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_key_layout() {
        // テスト項目: キーが名前空間付きで組み立てられる
        let id = meeting_id("m1");
        assert_eq!(meeting_key(DEFAULT_NAMESPACE, &id), "meetboard:meeting:m1");
        assert_eq!(
            participants_key(DEFAULT_NAMESPACE, &id),
            "meetboard:meeting:m1:participants"
        );
        assert_eq!(index_key("ns:"), "ns:meetings");
    }

    #[tokio::test]
    async fn test_redis_lifecycle() {
        // テスト項目: Redis 実装がインプロセス実装と同じ契約を満たす
        let Some(repo) = repository().await else {
            return;
        };
        let id = meeting_id("m1");

        // given (前提条件):
        repo.save(Meeting::new(
            id.clone(),
            MeetingStatus::Started,
            Some("Standup".to_string()),
            Some(Timestamp::new(1_000)),
        ))
        .await
        .unwrap();

        // when (操作):
        repo.add_participant(&id, ParticipantId::new("p1".to_string()).unwrap())
            .await
            .unwrap();
        repo.add_participant(&id, ParticipantId::new("p1".to_string()).unwrap())
            .await
            .unwrap();
        let ended = Meeting::new(id.clone(), MeetingStatus::Ended, None, None)
            .with_end_time(Some(Timestamp::new(2_000)));
        let saved = repo.save(ended).await.unwrap();

        // then (期待する結果):
        assert_eq!(saved.topic.as_deref(), Some("Standup"));
        assert_eq!(saved.end_time, Some(Timestamp::new(2_000)));
        assert_eq!(repo.count_participants(&id).await.unwrap(), 1);
        assert!(repo.list_active().await.unwrap().is_empty());
        assert_eq!(repo.list_all().await.unwrap().len(), 1);

        repo.clear_participants(&id).await.unwrap();
        assert_eq!(repo.count_participants(&id).await.unwrap(), 0);

        repo.delete(&id).await.unwrap();
        assert_eq!(
            repo.get(&id).await,
            Err(RepositoryError::MeetingNotFound("m1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_redis_create_discards_orphaned_participants() {
        // テスト項目: 削除と参加者追加が交差して残った参加者 SET を、新規作成で引き継がない
        let Some(repo) = repository().await else {
            return;
        };
        let id = meeting_id("m1");

        // given (前提条件): 本体の無い参加者 SET
        let mut conn = repo.connection.clone();
        let _: () = conn
            .sadd(repo.participants_key(&id), "p9")
            .await
            .unwrap();

        // when (操作):
        let saved = repo
            .save(Meeting::new(id.clone(), MeetingStatus::Created, None, None))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(saved.participants.is_empty());
        assert_eq!(repo.count_participants(&id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_redis_save_never_regresses_status() {
        // テスト項目: 終了済みのミーティングに updated が来ても Ended のまま
        let Some(repo) = repository().await else {
            return;
        };
        let id = meeting_id("m1");
        repo.save(
            Meeting::new(id.clone(), MeetingStatus::Ended, None, None)
                .with_end_time(Some(Timestamp::new(2_000))),
        )
        .await
        .unwrap();

        let saved = repo
            .save(Meeting::new(id.clone(), MeetingStatus::Updated, None, None))
            .await
            .unwrap();

        assert_eq!(saved.status, MeetingStatus::Ended);
        assert_eq!(saved.end_time, Some(Timestamp::new(2_000)));
    }
}
