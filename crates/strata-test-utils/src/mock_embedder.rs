// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding provider returning scripted vectors.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use strata_core::{EmbeddingProvider, StrataError};

/// A mock embedder that pops scripted vectors in FIFO order, falling back
/// to a fixed vector when the queue is empty.
pub struct MockEmbedder {
    queue: Arc<Mutex<VecDeque<Vec<f32>>>>,
    fallback: Vec<f32>,
}

impl MockEmbedder {
    /// Always return `fallback` once the queue is drained.
    pub fn fixed(fallback: Vec<f32>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
        }
    }

    /// Pre-load scripted vectors, with `fallback` after they run out.
    pub fn with_vectors(vectors: Vec<Vec<f32>>, fallback: Vec<f32>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::from(vectors))),
            fallback,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, StrataError> {
        Ok(self
            .queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
