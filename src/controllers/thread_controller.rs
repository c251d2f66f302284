use std::sync::Arc;

use crate::commands::{CommandExecutor, ProcessChatMessageCommand};
use crate::models::ChatMessage;
use crate::services::{LLMSession, SchemaRetriever, Toolkit};
use crate::utils::ApiResult;

pub struct ThreadController {
    executor: CommandExecutor,
    session: Arc<LLMSession>,
    toolkit: Toolkit,
    retriever: Arc<SchemaRetriever>,
    schema_top_k: usize,
}

impl ThreadController {
    pub fn new(
        session: Arc<LLMSession>,
        toolkit: Toolkit,
        retriever: Arc<SchemaRetriever>,
        schema_top_k: usize,
    ) -> Self {
        Self { executor: CommandExecutor::new(), session, toolkit, retriever, schema_top_k }
    }

    pub async fn process_chat_message(
        &self,
        chat_messages: Vec<ChatMessage>,
    ) -> ApiResult<Vec<ChatMessage>> {
        let command = ProcessChatMessageCommand::new(
            chat_messages,
            Arc::clone(&self.session),
            self.toolkit.clone(),
            Arc::clone(&self.retriever),
            self.schema_top_k,
        );
        self.executor.execute_write(command).await
    }
}
