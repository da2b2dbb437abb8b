// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock language model with pre-configured replies.
//!
//! Replies are popped from a FIFO queue. When the queue is empty, a default
//! "mock response" text is returned. Every received prompt is recorded so
//! tests can assert on prompt construction.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use strata_core::{LanguageModel, StrataError};

/// One scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer immediately with this text.
    Text(String),
    /// Fail with a provider error carrying this message.
    Fail(String),
    /// Sleep for the duration, then answer. Used to trigger call timeouts.
    Hang(Duration, String),
}

/// A mock LLM that returns pre-configured replies in FIFO order.
pub struct MockLanguageModel {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockLanguageModel {
    /// Create a mock with an empty reply queue.
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock pre-loaded with text replies.
    pub fn with_responses(texts: Vec<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(
                texts.into_iter().map(MockReply::Text).collect(),
            )),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a reply to the queue.
    pub async fn push_reply(&self, reply: MockReply) {
        self.replies.lock().await.push_back(reply);
    }

    /// All prompts received so far, in call order.
    pub async fn received_prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    /// Number of calls made against this mock.
    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

impl Default for MockLanguageModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, StrataError> {
        self.prompts.lock().await.push(prompt.to_string());
        let reply = self.replies.lock().await.pop_front();
        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(StrataError::Provider {
                message,
                source: None,
            }),
            Some(MockReply::Hang(duration, text)) => {
                tokio::time::sleep(duration).await;
                Ok(text)
            }
            None => Ok("mock response".to_string()),
        }
    }
}
