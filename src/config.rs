//! Server configuration, read from command-line flags with environment fallbacks.

use crate::embedding::{EmbedderKind, EmbeddingConfig};
use crate::hnsw::HnswParams;
use crate::schema::IndexBackend;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Flat,
    Hnsw,
}

impl BackendKind {
    pub fn into_backend(self) -> IndexBackend {
        match self {
            BackendKind::Flat => IndexBackend::Flat,
            BackendKind::Hnsw => IndexBackend::Hnsw(HnswParams::default()),
        }
    }
}

/// Flags for `ragdb serve`.
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, env = "RAGDB_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: String,

    /// Name of the index the RAG endpoints use
    #[arg(long, env = "RAGDB_INDEX_NAME", default_value = "test_index")]
    pub index_name: String,

    /// Embedding provider
    #[arg(long, env = "RAGDB_EMBEDDER", value_enum, default_value = "trigram")]
    pub embedder: EmbedderKind,

    /// Embedding dimension; also the dimension of the RAG index
    #[arg(long, env = "RAGDB_DIMENSION", default_value_t = 384)]
    pub dimension: usize,

    /// Base URL of the embedding server (http embedder)
    #[arg(long, env = "RAGDB_EMBED_URL", default_value = "http://localhost:11434")]
    pub embed_url: String,

    /// Model requested from the embedding server (http embedder)
    #[arg(long, env = "RAGDB_EMBED_MODEL", default_value = "all-minilm")]
    pub embed_model: String,

    /// Search backend for the RAG index
    #[arg(long, env = "RAGDB_BACKEND", value_enum, default_value = "flat")]
    pub backend: BackendKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
    /// Snapshot directory; in-memory only when unset
    pub data_dir: Option<PathBuf>,
    pub index_name: String,
    pub embedding: EmbeddingConfig,
    pub backend: IndexBackend,
}

impl ServerConfig {
    pub fn from_args(args: ServeArgs, data_dir: Option<PathBuf>) -> Self {
        Self {
            addr: args.addr,
            data_dir,
            index_name: args.index_name,
            embedding: EmbeddingConfig {
                kind: args.embedder,
                dimension: args.dimension,
                url: args.embed_url,
                model: args.embed_model,
            },
            backend: args.backend.into_backend(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            data_dir: None,
            index_name: "test_index".to_string(),
            embedding: EmbeddingConfig::default(),
            backend: IndexBackend::Flat,
        }
    }
}
