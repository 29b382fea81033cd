#![allow(dead_code)]

use async_trait::async_trait;
use motomi_core::client::{CompletionClient, CompletionRequest, CompletionResponse, MemoryProvider};
use motomi_core::error::{MotomiError, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Completion client replaying scripted outcomes in order
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<CompletionResponse>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(CompletionResponse::from_text(text)));
        self
    }

    pub fn fail(self) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(MotomiError::Timeout("scripted failure".to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(MotomiError::EmptyCompletion))
    }
}

pub struct FixedMemory(pub &'static str);

impl MemoryProvider for FixedMemory {
    fn format_for_context(&self, _max_memories: usize) -> String {
        self.0.to_string()
    }
}

/// Text of roughly `reps * 9` tokens
pub fn filler(reps: usize) -> String {
    "the quick brown fox jumps over the lazy dog ".repeat(reps)
}
