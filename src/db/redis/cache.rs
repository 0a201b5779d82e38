use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{FilmId, PopularQuery, PopularSort};

const SEARCH_TTL: u64 = 1800; // 30 minutes
const METADATA_TTL: u64 = 7200; // 2 hours

#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Film(FilmId),
    /// Similar films, scoped to the graph snapshot they were computed from
    Similar {
        version: i64,
        id: FilmId,
        limit: usize,
    },
    Search {
        query: String,
        limit: u32,
    },
    Popular(PopularQuery),
    Metadata,
}

impl CacheKey {
    /// TTL for this kind of entry, falling back to `default_ttl`
    pub fn ttl(&self, default_ttl: u64) -> u64 {
        match self {
            CacheKey::Search { .. } => SEARCH_TTL,
            CacheKey::Metadata => METADATA_TTL,
            _ => default_ttl,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Film(id) => write!(f, "film:{}", id),
            CacheKey::Similar { version, id, limit } => {
                write!(f, "similar:{}:{}:{}", version, id, limit)
            }
            CacheKey::Search { query, limit } => {
                write!(f, "search:{}:{}", query.trim().to_lowercase(), limit)
            }
            CacheKey::Popular(q) => {
                let sort = match q.sort_by {
                    PopularSort::Popularity => "popularity",
                    PopularSort::RecentPopular => "recent_popular",
                };
                write!(
                    f,
                    "popular:{}:{}:{}:{}:{}:{}",
                    q.page,
                    q.limit,
                    q.genre.as_deref().unwrap_or("-"),
                    q.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
                    q.min_rating
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    sort
                )
            }
            CacheKey::Metadata => write!(f, "metadata:info"),
        }
    }
}

/// Creates a Redis client for caching
///
/// The client connects lazily; an unreachable server surfaces as
/// `AppError::Cache` on first use.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Queued cache write
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache over Redis with fire-and-forget writes
///
/// Reads distinguish a miss (`Ok(None)`) from an unavailable backend
/// (`Err(AppError::Cache)`); writes go through a background task so that a slow
/// or failing Redis never delays a response.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
    default_ttl: u64,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Asks the writer to flush queued writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates the cache and spawns its writer task
    pub fn new(redis_client: Client, default_ttl: u64) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(run_writer(redis_client.clone(), write_rx, shutdown_rx));

        let cache = Self {
            redis_client,
            write_tx,
            default_ttl,
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// TTL applied to `key` when it is stored
    pub fn ttl_for(&self, key: &CacheKey) -> u64 {
        key.ttl(self.default_ttl)
    }

    /// Looks up `key`
    ///
    /// `Ok(None)` is a miss. Connection and protocol failures are returned as
    /// `AppError::Cache`, and an undecodable entry as `AppError::Internal`.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error for {}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues `value` for storage under `key` and returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            value,
            ttl: self.ttl_for(key),
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

/// Drains queued writes into Redis until shutdown is requested
async fn run_writer(
    client: Client,
    mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tracing::info!("Cache writer task started");

    loop {
        tokio::select! {
            Some(write) = write_rx.recv() => {
                if let Err(e) = store(&client, write).await {
                    tracing::warn!(error = %e, "Failed to write to Redis cache");
                }
            }
            _ = shutdown_rx.recv() => {
                write_rx.close();
                let mut flushed = 0usize;
                while let Some(write) = write_rx.recv().await {
                    match store(&client, write).await {
                        Ok(()) => flushed += 1,
                        Err(e) => tracing::warn!(error = %e, "Failed to flush cache write"),
                    }
                }
                tracing::info!(flushed, "Cache writer task stopped");
                break;
            }
        }
    }
}

async fn store(client: &Client, write: PendingWrite) -> AppResult<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
    Ok(())
}
