//! Server configuration from CLI flags and `MEETBOARD_*` environment variables.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::infrastructure::{
    broadcaster::BroadcasterConfig,
    signature::{SignatureMode, SignatureVerifier},
};

/// State Store の実装
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Memory,
    Redis,
}

/// 署名対象メッセージの組み立て方（CLI 用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SignatureModeArg {
    /// `v0:{timestamp}:{body}`
    Timestamped,
    /// 本文のみ
    Legacy,
}

impl From<SignatureModeArg> for SignatureMode {
    fn from(value: SignatureModeArg) -> Self {
        match value {
            SignatureModeArg::Timestamped => SignatureMode::Timestamped,
            SignatureModeArg::Legacy => SignatureMode::Legacy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "meetboard-server")]
#[command(about = "Meeting webhook receiver with live SSE status updates", long_about = None)]
pub struct ServerArgs {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "MEETBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "MEETBOARD_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Shared secret for webhook signatures (empty disables verification)
    #[arg(long, env = "MEETBOARD_WEBHOOK_SECRET", default_value = "", hide_env_values = true)]
    pub webhook_secret: String,

    /// How the signed message is built
    #[arg(long, env = "MEETBOARD_SIGNATURE_MODE", value_enum, default_value_t = SignatureModeArg::Timestamped)]
    pub signature_mode: SignatureModeArg,

    /// Maximum accepted request timestamp skew in seconds (0 disables the check)
    #[arg(long, env = "MEETBOARD_MAX_TIMESTAMP_SKEW_SECS", default_value_t = 0)]
    pub max_timestamp_skew_secs: u64,

    /// State store backend
    #[arg(long, env = "MEETBOARD_STORE", value_enum, default_value_t = StoreKind::Memory)]
    pub store: StoreKind,

    /// Redis connection URL (used with `--store redis`)
    #[arg(long, env = "MEETBOARD_REDIS_URL", default_value = "redis://127.0.0.1:6379", hide_env_values = true)]
    pub redis_url: String,

    /// Pending frames per SSE client before updates are dropped
    #[arg(long, env = "MEETBOARD_CLIENT_QUEUE_CAPACITY", default_value_t = 10)]
    pub client_queue_capacity: usize,

    /// Interval between SSE keep-alive comments in seconds
    #[arg(long, env = "MEETBOARD_KEEP_ALIVE_SECS", default_value_t = 15)]
    pub keep_alive_secs: u64,

    /// Time allowed for in-flight requests after a shutdown signal in seconds
    #[arg(long, env = "MEETBOARD_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    pub shutdown_grace_secs: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "MEETBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// 起動時に確定する設定
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub webhook_secret: String,
    pub signature_mode: SignatureMode,
    pub max_timestamp_skew: Option<Duration>,
    pub store: StoreKind,
    pub redis_url: String,
    pub client_queue_capacity: usize,
    pub keep_alive: Duration,
    pub shutdown_grace: Duration,
    pub log_level: String,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("webhook_secret", &"<redacted>")
            .field("signature_mode", &self.signature_mode)
            .field("max_timestamp_skew", &self.max_timestamp_skew)
            .field("store", &self.store)
            .field("client_queue_capacity", &self.client_queue_capacity)
            .field("keep_alive", &self.keep_alive)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            webhook_secret: args.webhook_secret,
            signature_mode: args.signature_mode.into(),
            max_timestamp_skew: (args.max_timestamp_skew_secs > 0)
                .then(|| Duration::from_secs(args.max_timestamp_skew_secs)),
            store: args.store,
            redis_url: args.redis_url,
            client_queue_capacity: args.client_queue_capacity.max(1),
            keep_alive: Duration::from_secs(args.keep_alive_secs.max(1)),
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
            log_level: args.log_level,
        }
    }
}

impl ServerConfig {
    pub fn parse() -> Self {
        ServerArgs::parse().into()
    }

    pub fn signature_verifier(&self) -> SignatureVerifier {
        let verifier = SignatureVerifier::new(self.webhook_secret.clone(), self.signature_mode);
        match self.max_timestamp_skew {
            Some(skew) => verifier.with_max_skew(skew),
            None => verifier,
        }
    }

    pub fn broadcaster_config(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            queue_capacity: self.client_queue_capacity,
            keep_alive: self.keep_alive,
            include_ended: true,
        }
    }
}
