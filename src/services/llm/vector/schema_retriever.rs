//! Schema retrieval over table descriptions
//!
//! Each table of the datastore is described in one line, embedded once, and
//! kept in an exact (brute-force) L2 index. Questions are embedded and matched
//! against it to pick the tables worth showing to the model.

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::services::datastore::{SqlDatastore, TableSchema};
use crate::services::llm::LLMSession;
use crate::utils::ApiResult;

/// Exact nearest-neighbour index using squared L2 distance
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, vectors: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vectors of the wrong dimension are replaced by zeros
    pub fn add(&mut self, vector: Vec<f32>) {
        if vector.len() == self.dimension {
            self.vectors.push(vector);
        } else {
            tracing::warn!(
                "Vector of dimension {} added to index of dimension {}; using zeros",
                vector.len(),
                self.dimension
            );
            self.vectors.push(vec![0.0; self.dimension]);
        }
    }

    /// Up to `k` `(position, distance)` pairs, closest first; ties keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, squared_l2(v, query)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter().chain(std::iter::repeat(&0.0)))
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

struct SchemaIndex {
    schemas: Vec<TableSchema>,
    index: FlatL2Index,
}

pub struct SchemaRetriever {
    session: Arc<LLMSession>,
    datastore: Arc<SqlDatastore>,
    index: OnceCell<SchemaIndex>,
}

impl SchemaRetriever {
    pub fn new(session: Arc<LLMSession>, datastore: Arc<SqlDatastore>) -> Self {
        Self { session, datastore, index: OnceCell::new() }
    }

    async fn index(&self) -> ApiResult<&SchemaIndex> {
        self.index.get_or_try_init(|| self.build_index()).await
    }

    async fn build_index(&self) -> ApiResult<SchemaIndex> {
        let schemas = self.datastore.table_schemas().await?;
        let descriptions: Vec<String> = schemas.iter().map(TableSchema::description).collect();
        let dimension = self.session.embedding_dimension();

        let embeddings = if descriptions.is_empty() {
            Vec::new()
        } else {
            self.embed_or_zeros(&descriptions).await
        };

        let mut index = FlatL2Index::new(dimension);
        for vector in embeddings {
            index.add(vector);
        }

        tracing::info!("Schema index built with {} tables", index.len());
        Ok(SchemaIndex { schemas, index })
    }

    async fn embed_or_zeros(&self, texts: &[String]) -> Vec<Vec<f32>> {
        match self.session.generate_embeddings(texts).await {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!("Embedding failed, falling back to zero vectors: {}", e);
                vec![vec![0.0; self.session.embedding_dimension()]; texts.len()]
            },
        }
    }

    /// The `top_k` tables closest to the question
    pub async fn retrieve_tables(&self, question: &str, top_k: usize) -> ApiResult<Vec<TableSchema>> {
        let index = self.index().await?;
        if index.index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embed_or_zeros(&[question.to_string()]).await;
        let query = query.into_iter().next().unwrap_or_default();

        Ok(index
            .index
            .search(&query, top_k)
            .into_iter()
            .filter_map(|(i, _)| index.schemas.get(i).cloned())
            .collect())
    }

    /// Descriptions of the `top_k` tables closest to the question
    pub async fn retrieve_schema_context(&self, question: &str, top_k: usize) -> ApiResult<Vec<String>> {
        Ok(self
            .retrieve_tables(question, top_k)
            .await?
            .iter()
            .map(TableSchema::description)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_orders_by_distance_then_position() {
        let mut index = FlatL2Index::new(2);
        index.add(vec![5.0, 5.0]);
        index.add(vec![1.0, 0.0]);
        index.add(vec![0.0, 1.0]);
        index.add(vec![9.0]);

        assert_eq!(index.len(), 4);
        let hits = index.search(&[1.0, 0.1], 3);
        assert_eq!(hits.iter().map(|h| h.0).collect::<Vec<_>>(), vec![1, 3, 2]);

        // all-zero query against equal norms keeps insertion order
        let hits = index.search(&[0.0, 0.0], 10);
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].0, 3);
        assert_eq!(hits[1].0, 1);
        assert_eq!(hits[2].0, 2);
    }
}
