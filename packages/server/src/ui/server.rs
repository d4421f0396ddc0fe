//! Server execution logic.

use std::{future::IntoFuture, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::{
    handler::{health_check, list_meetings, receive_webhook, reject_method, stream_events},
    signal::shutdown_signal,
    state::AppState,
};

/// Webhook 本文の上限（1 MiB）
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

/// ルーティングを組み立てる
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Webhook エンドポイント
        .route(
            "/webhook",
            post(receive_webhook)
                .fallback(reject_method)
                .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY_BYTES)),
        )
        // SSE エンドポイント
        .route("/events", get(stream_events))
        // HTTP エンドポイント
        .route("/api/meetings", get(list_meetings))
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Meetboard server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state, Duration::from_secs(5));
/// server.run("127.0.0.1", 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    /// シャットダウン開始から強制終了までの猶予
    shutdown_grace: Duration,
}

impl Server {
    pub fn new(state: AppState, shutdown_grace: Duration) -> Self {
        Self {
            state: Arc::new(state),
            shutdown_grace,
        }
    }

    /// Bind to `host:port` and serve until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: &str, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Meetboard server listening on {}", listener.local_addr()?);
        tracing::info!("Webhook endpoint: http://{}/webhook", bind_addr);
        tracing::info!("SSE endpoint: http://{}/events", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// `shutdown` が完了すると SSE 接続に終了シグナルを送り、処理中のリクエストを
    /// `shutdown_grace` まで待つ。猶予を過ぎたら残りの接続を待たずに戻る。
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(self.state.clone());
        let broadcaster = self.state.broadcaster.clone();
        let draining = CancellationToken::new();
        let draining_signal = draining.clone();

        let graceful = async move {
            shutdown.await;
            broadcaster.shutdown();
            draining_signal.cancel();
        };

        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .into_future();
        tokio::pin!(serve);

        let grace = self.shutdown_grace;
        tokio::select! {
            result = &mut serve => result,
            _ = async {
                draining.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Graceful shutdown timed out, dropping remaining connections"
                );
                Ok(())
            }
        }
    }
}
