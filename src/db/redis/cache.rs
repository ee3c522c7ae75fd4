use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::Metric;

/// Cache keys are scoped by dataset generation so a reload never serves
/// results computed from an older matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendations {
        generation: Uuid,
        user_id: String,
        metric: Metric,
        k: usize,
    },
    Neighbors {
        generation: Uuid,
        user_id: String,
        metric: Metric,
        k: usize,
    },
    SimilarItems {
        generation: Uuid,
        item_id: String,
        metric: Metric,
        k: usize,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations {
                generation,
                user_id,
                metric,
                k,
            } => write!(f, "recs:{}:{}:{}:{}", generation, metric, k, user_id),
            CacheKey::Neighbors {
                generation,
                user_id,
                metric,
                k,
            } => write!(f, "nbrs:{}:{}:{}:{}", generation, metric, k, user_id),
            CacheKey::SimilarItems {
                generation,
                item_id,
                metric,
                k,
            } => write!(f, "items:{}:{}:{}:{}", generation, metric, k, item_id),
        }
    }
}

/// Pending write handed to the background writer
struct PendingWrite {
    key: String,
    value: String,
}

/// Redis-backed cache for computed recommendation results
///
/// Reads go straight to Redis. Writes are queued on a channel and applied by a
/// background task so a slow Redis never delays a response.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer once queued writes are flushed
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> AppResult<(Self, CacheWriterHandle)> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::run_writer(
            conn.clone(),
            ttl_secs,
            write_rx,
            shutdown_rx,
        ));

        tracing::info!(ttl_secs, "Recommendation cache connected");

        Ok((
            Self { conn, write_tx },
            CacheWriterHandle { shutdown_tx, task },
        ))
    }

    async fn run_writer(
        mut conn: ConnectionManager,
        ttl_secs: u64,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    Self::apply(&mut conn, ttl_secs, write).await;
                }
                _ = shutdown_rx.recv() => {
                    // Refuse new writes, then drain whatever is already queued
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(write) = write_rx.recv().await {
                        Self::apply(&mut conn, ttl_secs, write).await;
                        flushed += 1;
                    }
                    tracing::info!(flushed, "Cache writer stopped");
                    break;
                }
            }
        }
    }

    async fn apply(conn: &mut ConnectionManager, ttl_secs: u64, write: PendingWrite) {
        let result: redis::RedisResult<()> = conn.set_ex(&write.key, write.value, ttl_secs).await;
        if let Err(e) = result {
            tracing::warn!(key = %write.key, error = %e, "Cache write failed");
        }
    }

    /// Looks up a cached value; `None` on a miss
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a value for writing with the cache's TTL; never blocks
    pub fn put_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        if self
            .write_tx
            .send(PendingWrite {
                key: key.to_string(),
                value,
            })
            .is_err()
        {
            tracing::warn!(key = %key, "Cache writer is stopped, dropping write");
        }
    }
}
