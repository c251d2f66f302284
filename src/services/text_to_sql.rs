//! Natural-language questions answered with SQL
//!
//! 1. pick relevant tables and sample rows
//! 2. ask the model for SQL (plus a draft summary)
//! 3. run the SQL
//! 4. ask the model to judge the result, optionally with better SQL
//! 5. summarise

use std::sync::Arc;

use crate::config::DatastoreConfig;
use crate::models::{TextToSqlAnswer, TextToSqlDebug};
use crate::services::datastore::{QueryResult, SqlDatastore};
use crate::services::llm::prompts::{self, TableContext};
use crate::services::llm::{LLMSession, SchemaRetriever, summarize_result};
use crate::utils::{ApiError, ApiResult, parse_judge_response, parse_sql_response};

const SQL_TEMPERATURE: f64 = 0.2;
const SQL_MAX_TOKENS: u32 = 700;

pub struct TextToSqlService {
    session: Arc<LLMSession>,
    datastore: Arc<SqlDatastore>,
    retriever: Arc<SchemaRetriever>,
    top_k: usize,
    sample_rows: usize,
}

impl TextToSqlService {
    pub fn new(
        session: Arc<LLMSession>,
        datastore: Arc<SqlDatastore>,
        retriever: Arc<SchemaRetriever>,
        config: &DatastoreConfig,
    ) -> Self {
        Self {
            session,
            datastore,
            retriever,
            top_k: config.schema_top_k,
            sample_rows: config.sample_rows,
        }
    }

    /// Answer as markdown: summary, the SQL that ran, and the result table
    pub async fn text_to_sql(&self, question: &str) -> ApiResult<String> {
        Ok(self.answer(question).await?.to_markdown())
    }

    pub async fn answer(&self, question: &str) -> ApiResult<TextToSqlAnswer> {
        let context = self.table_context(question).await?;
        let llm_prompt = prompts::build_sql_prompt(&context, question);

        let sql_response = self
            .session
            .complete(&llm_prompt, SQL_TEMPERATURE, SQL_MAX_TOKENS)
            .await
            .map_err(|e| ApiError::internal_error(format!("LLM SQL generation failed: {}", e)))?;
        let (sql_query, draft_summary) = parse_sql_response(&sql_response);
        tracing::debug!("Generated SQL: {}", sql_query);

        let result = self
            .run(&sql_query)
            .await
            .map_err(|e| ApiError::internal_error(format!("SQL execution failed: {}", e.message())))?;
        let mut result_markdown = result.to_markdown();

        let judge_prompt = prompts::build_judge_prompt(&result_markdown);
        let judge_response =
            match self.session.complete(&judge_prompt, SQL_TEMPERATURE, SQL_MAX_TOKENS).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("Judge call failed, keeping first answer: {}", e);
                    None
                },
            };
        let (improved_sql, improved_summary) = match &judge_response {
            Some(text) => parse_judge_response(text),
            None => (None, String::new()),
        };

        let mut final_sql = sql_query.clone();
        if let Some(improved) = improved_sql.filter(|s| !s.is_empty() && *s != sql_query) {
            match self.run(&improved).await {
                Ok(better) => {
                    tracing::info!("Using judge-improved SQL");
                    result_markdown = better.to_markdown();
                    final_sql = improved;
                },
                Err(e) => {
                    tracing::warn!("Improved SQL failed, keeping previous result: {}", e.message())
                },
            }
        }

        let summary = if !improved_summary.is_empty() {
            improved_summary
        } else if !draft_summary.is_empty() {
            draft_summary
        } else {
            summarize_result(&self.session, question, &final_sql, &result_markdown).await
        };

        Ok(TextToSqlAnswer {
            question: question.to_string(),
            sql_query: final_sql,
            result_markdown,
            summary,
            debug: TextToSqlDebug { llm_prompt, sql_response, judge_prompt, judge_response },
        })
    }

    async fn run(&self, sql: &str) -> ApiResult<QueryResult> {
        self.datastore.execute(sql).await
    }

    async fn table_context(&self, question: &str) -> ApiResult<Vec<TableContext>> {
        let tables = self.retriever.retrieve_tables(question, self.top_k).await?;

        let mut context = Vec::with_capacity(tables.len());
        for schema in tables {
            let sample_rows = match self.datastore.get_sample_data(&schema.table, self.sample_rows).await {
                Ok(sample) => sample.row_lines(),
                Err(e) => {
                    tracing::warn!("No sample rows for {}: {}", schema.table, e.message());
                    Vec::new()
                },
            };
            context.push(TableContext { table: schema.table, columns: schema.columns, sample_rows });
        }
        Ok(context)
    }
}
