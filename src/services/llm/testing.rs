//! Scripted [`ChatBackend`] for tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::client::ChatBackend;
use super::models::*;

type Embedder = Box<dyn Fn(&str) -> Option<Vec<f32>> + Send + Sync>;

/// Replays queued chat completions in order and records every request
pub struct ScriptedBackend {
    chats: Mutex<VecDeque<Result<ChatCompletion, LLMError>>>,
    requests: Mutex<Vec<Value>>,
    embedded: Mutex<Vec<String>>,
    embedder: Option<Embedder>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            chats: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            embedded: Mutex::new(Vec::new()),
            embedder: None,
        }
    }

    pub fn with_embedder<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<Vec<f32>> + Send + Sync + 'static,
    {
        self.embedder = Some(Box::new(f));
        self
    }

    pub fn push_chat(&self, completion: ChatCompletion) {
        self.chats.lock().unwrap().push_back(Ok(completion));
    }

    pub fn push_chat_error(&self, err: LLMError) {
        self.chats.lock().unwrap().push_back(Err(err));
    }

    pub fn chat_requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    pub fn embedded_texts(&self) -> Vec<String> {
        self.embedded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatCompletion, LLMError> {
        self.requests.lock().unwrap().push(serde_json::to_value(request)?);
        self.chats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::ApiError("no scripted response left".to_string())))
    }

    async fn embed(
        &self,
        _model: &str,
        inputs: &[String],
    ) -> Result<Vec<Option<Vec<f32>>>, LLMError> {
        self.embedded.lock().unwrap().extend(inputs.iter().cloned());
        Ok(inputs
            .iter()
            .map(|text| self.embedder.as_ref().and_then(|f| f(text)))
            .collect())
    }
}

/// 1536-dimensional vector with the given leading components
pub fn vector(head: &[f32]) -> Vec<f32> {
    let mut v = vec![0.0; 1536];
    v[..head.len()].copy_from_slice(head);
    v
}
