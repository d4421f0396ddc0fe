//! Webhook 署名の検証
//!
//! 共有シークレットをキーにした HMAC-SHA256 で、リクエスト本文が Webhook 送信元から
//! 来たものかを判定する。
//!
//! ## 正規化メッセージ
//!
//! - `Timestamped`: `"v0:" + timestamp + ":" + body`
//! - `Legacy`: `body` のみ
//!
//! 署名ヘッダは `v0=<hex>` 形式。比較は `Mac::verify_slice` による定数時間比較。
//!
//! シークレットが未設定の場合は検証をスキップする（ローカル実行向け）。

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-zm-signature";
pub const TIMESTAMP_HEADER: &str = "x-zm-request-timestamp";

const SIGNATURE_VERSION: &str = "v0";

/// 署名対象メッセージの組み立て方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureMode {
    #[default]
    Timestamped,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("missing required header '{0}'")]
    MissingHeader(&'static str),

    #[error("signature is not in 'v0=<hex>' form")]
    MalformedSignature,

    #[error("signature mismatch")]
    Mismatch,

    #[error("request timestamp is not a valid integer")]
    InvalidTimestamp,

    #[error("request timestamp is outside the accepted window")]
    StaleTimestamp,

    #[error("webhook secret is not configured")]
    SecretNotConfigured,
}

/// Webhook 署名検証器
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    mode: SignatureMode,
    max_skew: Option<Duration>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .field("mode", &self.mode)
            .field("max_skew", &self.max_skew)
            .finish()
    }
}

impl SignatureVerifier {
    /// 空のシークレットを渡すと検証は無効になる
    pub fn new(secret: impl Into<String>, mode: SignatureMode) -> Self {
        Self {
            secret: secret.into().into_bytes(),
            mode,
            max_skew: None,
        }
    }

    /// タイムスタンプの許容ずれを設定する（`Timestamped` のときのみ有効）
    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = Some(max_skew);
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// 署名を検証する
    ///
    /// 検証が無効な場合は常に `Ok(())`。
    pub fn verify(
        &self,
        signature: Option<&str>,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;
        let expected = parse_signature(signature)?;
        let message = self.canonical_message(timestamp, body)?;

        let mut mac = self.mac()?;
        mac.update(&message);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// リクエストタイムスタンプ（epoch 秒）が許容範囲内かを確認する
    pub fn check_freshness(
        &self,
        timestamp: Option<&str>,
        now_secs: i64,
    ) -> Result<(), SignatureError> {
        let Some(max_skew) = self.max_skew else {
            return Ok(());
        };
        if !self.is_enabled() || self.mode != SignatureMode::Timestamped {
            return Ok(());
        }

        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        let skew = now_secs.abs_diff(sent_at);
        if skew > max_skew.as_secs() {
            return Err(SignatureError::StaleTimestamp);
        }
        Ok(())
    }

    /// 同じ手順で署名ヘッダ値（`v0=<hex>`）を計算する
    pub fn sign(&self, timestamp: Option<&str>, body: &[u8]) -> Result<String, SignatureError> {
        if !self.is_enabled() {
            return Err(SignatureError::SecretNotConfigured);
        }
        let message = self.canonical_message(timestamp, body)?;
        let mut mac = self.mac()?;
        mac.update(&message);
        Ok(format!(
            "{SIGNATURE_VERSION}={}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// URL 検証チャレンジへの応答トークン（`hex(HMAC(secret, plain_token))`）
    pub fn challenge_response(&self, plain_token: &str) -> Result<String, SignatureError> {
        if !self.is_enabled() {
            return Err(SignatureError::SecretNotConfigured);
        }
        let mut mac = self.mac()?;
        mac.update(plain_token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        // HMAC は任意長のキーを受け付けるので、ここで失敗することはない
        HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::SecretNotConfigured)
    }

    fn canonical_message(
        &self,
        timestamp: Option<&str>,
        body: &[u8],
    ) -> Result<Vec<u8>, SignatureError> {
        match self.mode {
            SignatureMode::Legacy => Ok(body.to_vec()),
            SignatureMode::Timestamped => {
                let timestamp =
                    timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
                let mut message =
                    Vec::with_capacity(SIGNATURE_VERSION.len() + timestamp.len() + body.len() + 2);
                message.extend_from_slice(SIGNATURE_VERSION.as_bytes());
                message.push(b':');
                message.extend_from_slice(timestamp.as_bytes());
                message.push(b':');
                message.extend_from_slice(body);
                Ok(message)
            }
        }
    }
}

/// `v0=<hex>` をバイト列に変換する
fn parse_signature(value: &str) -> Result<Vec<u8>, SignatureError> {
    let hex_part = value
        .strip_prefix(SIGNATURE_VERSION)
        .and_then(|rest| rest.strip_prefix('='))
        .ok_or(SignatureError::MalformedSignature)?;
    if hex_part.is_empty() {
        return Err(SignatureError::MalformedSignature);
    }
    hex::decode(hex_part).map_err(|_| SignatureError::MalformedSignature)
}
