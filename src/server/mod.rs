//! HTTP server for the transcription service.
//!
//! Three endpoints: `POST /ocr` (multipart upload → transcription payload),
//! `GET /health` (liveness), `POST /export` (text → rendered attachment).
//! The engine handle and the document renderer are injected through
//! [`AppState`], so tests drive the exact same router with a stub engine
//! and an in-memory renderer.

mod handlers;
mod routes;

pub use routes::create_router;

use crate::config::ServiceConfig;
use crate::engine::EngineHandle;
use crate::export::external::ExternalRenderer;
use crate::export::DocumentRenderer;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the web server. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Production wiring: the external renderer from the config.
    pub fn new(config: ServiceConfig, engine: EngineHandle) -> Self {
        let renderer = Arc::new(ExternalRenderer::new(
            config.renderer_command.clone(),
            config.render_timeout_secs,
        ));
        Self {
            engine,
            renderer,
            config: Arc::new(config),
        }
    }
}

/// Start the server and run until the listener fails.
///
/// The engine must already be loaded — it is created once at process start
/// and shared across every request for the lifetime of the process.
pub async fn serve(config: ServiceConfig, engine: EngineHandle) -> Result<(), std::io::Error> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{e}")))?;

    let state = AppState::new(config, engine);
    let app = create_router(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
