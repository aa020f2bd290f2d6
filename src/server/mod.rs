//! HTTP API server: the RAG endpoints plus index management routes.

pub mod routes;

pub use routes::create_router;

use crate::config::ServerConfig;
use crate::embedding::create_embedder;
use crate::error::{EngineError, Result};
use crate::manager::IndexManager;
use crate::metrics::MetricsCollector;
use crate::persistence::SnapshotManager;
use crate::rag::RagService;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Shared application state for the HTTP server.
#[derive(Debug)]
pub struct AppState {
    pub manager: Arc<IndexManager>,
    pub rag: RagService,
    pub metrics: MetricsCollector,
    /// Present when the server was started with a data directory.
    pub snapshots: Option<SnapshotManager>,
}

impl AppState {
    pub fn new(manager: Arc<IndexManager>, rag: RagService) -> Self {
        Self {
            manager,
            rag,
            metrics: MetricsCollector::new(),
            snapshots: None,
        }
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotManager) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Build the state for `config`, restoring the last snapshot if one exists.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let manager = Arc::new(IndexManager::new());
        let embedder = create_embedder(&config.embedding)?;
        info!(
            embedder = embedder.name(),
            dimension = embedder.dimension(),
            index = %config.index_name,
            "configured RAG service"
        );
        let rag = RagService::new(Arc::clone(&manager), embedder, config.index_name.clone())
            .with_backend(config.backend.clone());
        let mut state = Self::new(Arc::clone(&manager), rag);

        if let Some(dir) = &config.data_dir {
            let snapshots = SnapshotManager::new(dir)?;
            if let Some(snapshot) = snapshots.load()? {
                let records = snapshot.record_count();
                manager.restore(snapshot)?;
                info!(dir = %dir.display(), records, "restored snapshot");
            }
            state = state.with_snapshots(snapshots);
        }
        Ok(state)
    }

    /// Write every index to the data directory. Returns the number of
    /// records saved.
    pub fn save_snapshot(&self) -> Result<usize> {
        let snapshots = self
            .snapshots
            .as_ref()
            .ok_or_else(|| EngineError::invalid("snapshots are disabled; start the server with --data-dir"))?;
        snapshots.capture_and_save(|| self.manager.snapshot())
    }
}

/// Bind `config.addr` and serve until Ctrl+C or SIGTERM, then save a
/// final snapshot if a data directory is configured.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if state.snapshots.is_some() {
        let records = state.save_snapshot()?;
        info!(records, "saved snapshot on shutdown");
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("received terminate signal, starting graceful shutdown");
        }
    }
}
