//! EximDesk Infer — the embedding generator behind registry semantic search.
//!
//! The `Embedder` trait is the collaborator contract: text in, fixed-length
//! vector out, or `None` on failure. With the `onnx` feature enabled and
//! model files present, `OnnxEmbedder` runs all-MiniLM-L6-v2 for 384-dim
//! vectors; otherwise `DisabledEmbedder` is used and imports proceed without
//! vectors (keyword search only).

pub mod embedder;
pub mod onnx_embedder;

pub use embedder::{DisabledEmbedder, Embedder};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Create the best available embedder for the given model directory.
pub fn create_embedder(model_dir: &Path) -> Arc<dyn Embedder> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(embedder);
            }
            Err(e) => {
                tracing::warn!(
                    "ONNX embedder unavailable: {}. Imports will run without embeddings.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::info!("ONNX feature disabled. Imports will run without embeddings.");
    }

    Arc::new(DisabledEmbedder::new(384))
}
