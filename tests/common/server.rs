//! Test server lifecycle management
//!
//! Each test gets an isolated server wired to fakes of its choosing.

use super::constants::*;
use super::fakes::{FakeCatalog, FakeLlmProvider, FakeVideo, UpstreamMode};
use moodlist_server::enrichment::Enricher;
use moodlist_server::generation::PlaylistGenerator;
use moodlist_server::llm::{CompletionOptions, LlmProvider};
use moodlist_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use moodlist_server::upstream::{CatalogLookup, VideoLookup};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Which fakes the server is wired to.
pub struct Fakes {
    pub llm: Arc<FakeLlmProvider>,
    pub catalog: Arc<FakeCatalog>,
    pub video: Arc<FakeVideo>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            llm: Arc::new(FakeLlmProvider::replying(TWO_TRACKS_JSON)),
            catalog: Arc::new(FakeCatalog::new(UpstreamMode::Healthy)),
            video: Arc::new(FakeVideo::new(UpstreamMode::Healthy)),
        }
    }
}

impl Fakes {
    pub fn with_llm(mut self, llm: FakeLlmProvider) -> Self {
        self.llm = Arc::new(llm);
        self
    }

    pub fn with_catalog(mut self, mode: UpstreamMode) -> Self {
        self.catalog = Arc::new(FakeCatalog::new(mode));
        self
    }

    pub fn with_video(mut self, mode: UpstreamMode) -> Self {
        self.video = Arc::new(FakeVideo::new(mode));
        self
    }
}

/// Test server instance bound to a random local port
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The fakes behind this server, for call-count assertions
    pub llm: Arc<FakeLlmProvider>,
    pub catalog: Arc<FakeCatalog>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with healthy fakes and a two-track model reply
    pub async fn spawn() -> Self {
        Self::spawn_with(Fakes::default()).await
    }

    /// Spawns a server on a random port wired to `fakes`
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready in time.
    pub async fn spawn_with(fakes: Fakes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            ..ServerConfig::default()
        };
        let generator = PlaylistGenerator::new(
            fakes.llm.clone() as Arc<dyn LlmProvider>,
            CompletionOptions::default(),
            10,
        );
        let enricher = Enricher::new(
            fakes.catalog.clone() as Arc<dyn CatalogLookup>,
            fakes.video.clone() as Arc<dyn VideoLookup>,
            Duration::from_millis(UPSTREAM_TIMEOUT_MS),
            5,
        );
        let app = make_app(ServerState::new(config, generator, enricher));

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            llm: fakes.llm,
            catalog: fakes.catalog,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home route
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
