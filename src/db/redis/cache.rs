use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    /// Merged recommendations for one request shape against one model
    Recommendations {
        model: String,
        user_id: String,
        collab_weight: f64,
        num_recs: usize,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations {
                model,
                user_id,
                collab_weight,
                num_recs,
            } => write!(
                f,
                "recs:{}:{}:{}:{}",
                model, user_id, collab_weight, num_recs
            ),
        }
    }
}

/// Creates a Redis client for the result cache
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Result cache over Redis
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// request never waits on them.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for stopping the cache writer once queued writes are flushed
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Connects to Redis and spawns the background writer
    pub async fn connect(redis_client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(redis_client).await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(Self::cache_writer_task(conn.clone(), write_rx, shutdown_rx));

        Ok((Self { conn, write_tx }, CacheWriterHandle { shutdown_tx, task }))
    }

    async fn cache_writer_task(
        mut conn: ConnectionManager,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&mut conn, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        // Senders live in every Cache clone, so drain without waiting on them
        let mut flushed = 0usize;
        while let Ok(msg) = write_rx.try_recv() {
            if let Err(e) = Self::write_to_redis(&mut conn, msg).await {
                tracing::error!(error = %e, "Failed to flush cache write during shutdown");
            }
            flushed += 1;
        }

        tracing::info!(flushed, "Cache writer stopped");
    }

    async fn write_to_redis(conn: &mut ConnectionManager, msg: CacheWriteMessage) -> AppResult<()> {
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Looks up a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error for {}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues a write and returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if self.write_tx.send(msg).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}
