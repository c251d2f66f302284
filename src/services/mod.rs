pub mod datastore;
pub mod llm;
pub mod text_to_sql;

pub use datastore::{CellValue, ColumnInfo, QueryResult, SqlDatastore, TableSchema};
pub use llm::{LLMClient, LLMError, LLMSession, SchemaRetriever, Toolkit};
pub use text_to_sql::TextToSqlService;
