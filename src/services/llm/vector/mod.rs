mod schema_retriever;

pub use schema_retriever::{FlatL2Index, SchemaRetriever};
