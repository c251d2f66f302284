use std::sync::Arc;

use crate::commands::{CommandExecutor, TextToSqlCommand};
use crate::models::TextToSqlAnswer;
use crate::services::TextToSqlService;
use crate::utils::ApiResult;

pub struct TextToSqlController {
    executor: CommandExecutor,
    service: Arc<TextToSqlService>,
}

impl TextToSqlController {
    pub fn new(service: Arc<TextToSqlService>) -> Self {
        Self { executor: CommandExecutor::new(), service }
    }

    pub async fn ask(&self, question: &str) -> ApiResult<TextToSqlAnswer> {
        self.executor
            .execute_read(TextToSqlCommand::new(question, Arc::clone(&self.service)))
            .await
    }
}
