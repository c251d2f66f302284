use async_trait::async_trait;
use std::sync::Arc;

use super::Command;
use crate::models::TextToSqlAnswer;
use crate::services::TextToSqlService;
use crate::utils::{ApiError, ApiResult};

pub struct TextToSqlCommand {
    question: String,
    service: Arc<TextToSqlService>,
}

impl TextToSqlCommand {
    pub fn new(question: impl Into<String>, service: Arc<TextToSqlService>) -> Self {
        Self { question: question.into(), service }
    }
}

#[async_trait]
impl Command for TextToSqlCommand {
    type Output = TextToSqlAnswer;

    fn name(&self) -> &'static str {
        "TextToSqlCommand"
    }

    fn validate(&self) -> ApiResult<()> {
        if self.question.trim().is_empty() {
            return Err(ApiError::validation_error("Missing 'question' in request"));
        }
        Ok(())
    }

    async fn execute(self) -> ApiResult<TextToSqlAnswer> {
        self.service.answer(self.question.trim()).await
    }
}
