//! Commands: one unit of business work, validated then executed.

pub mod text_to_sql;
pub mod threads;

pub use text_to_sql::TextToSqlCommand;
pub use threads::ProcessChatMessageCommand;

use async_trait::async_trait;
use std::time::Instant;

use crate::utils::ApiResult;

#[async_trait]
pub trait Command: Send + Sized {
    type Output: Send;

    fn name(&self) -> &'static str;

    fn validate(&self) -> ApiResult<()> {
        Ok(())
    }

    async fn execute(self) -> ApiResult<Self::Output>;
}

/// Runs commands, logging name, kind and duration
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute_read<C: Command>(&self, command: C) -> ApiResult<C::Output> {
        self.run("read", command).await
    }

    pub async fn execute_write<C: Command>(&self, command: C) -> ApiResult<C::Output> {
        self.run("write", command).await
    }

    async fn run<C: Command>(&self, kind: &str, command: C) -> ApiResult<C::Output> {
        let name = command.name();
        let start = Instant::now();
        tracing::debug!("Command {} ({}) started", name, kind);

        command.validate()?;
        let result = command.execute().await;

        match &result {
            Ok(_) => tracing::debug!(
                "Command {} ({}) finished in {}ms",
                name,
                kind,
                start.elapsed().as_millis()
            ),
            Err(e) => tracing::warn!(
                "Command {} ({}) failed after {}ms: {}",
                name,
                kind,
                start.elapsed().as_millis(),
                e
            ),
        }
        result
    }
}
