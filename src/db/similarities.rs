use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{FilmId, SimilarityEdge},
    services::recommendations::GraphStore,
};

/// Rows per INSERT statement, well under the bind parameter limit
const INSERT_CHUNK: usize = 5_000;

/// PostgreSQL-backed similarity graph storage
#[derive(Clone)]
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GraphStore for PgGraphStore {
    async fn replace_all(&self, edges: &[SimilarityEdge]) -> AppResult<usize> {
        let ranked = with_ranks(edges);

        // Dropping the transaction without commit rolls everything back
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM similarities")
            .execute(&mut *tx)
            .await?;

        for chunk in ranked.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO similarities (source_id, target_id, neighbour_rank, score) ",
            );
            builder.push_values(chunk, |mut row, (edge, rank)| {
                row.push_bind(edge.source)
                    .push_bind(edge.target)
                    .push_bind(*rank)
                    .push_bind(edge.score);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        tracing::debug!(edges = edges.len(), "Similarity graph replaced");
        Ok(edges.len())
    }

    async fn load(&self) -> AppResult<Vec<SimilarityEdge>> {
        let edges = sqlx::query_as::<_, SimilarityEdge>(
            r#"
            SELECT source_id AS source, target_id AS target, score
            FROM similarities
            ORDER BY source_id, neighbour_rank
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }
}

/// Pairs each edge with its position among the edges of the same source
fn with_ranks(edges: &[SimilarityEdge]) -> Vec<(SimilarityEdge, i16)> {
    let mut next_rank: HashMap<FilmId, i16> = HashMap::new();
    edges
        .iter()
        .map(|edge| {
            let rank = next_rank.entry(edge.source).or_insert(0);
            let current = *rank;
            *rank += 1;
            (*edge, current)
        })
        .collect()
}
