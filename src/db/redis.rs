//! Redis-backed cache with a background writer task
//!
//! Reads happen inline on a cloned multiplexed connection. Writes are queued
//! onto an unbounded channel and flushed by a dedicated task so a slow Redis
//! never adds latency to the request path. On shutdown the writer drains
//! whatever is still queued before exiting.

use std::sync::Arc;

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::cache::CacheBackend;
use crate::error::AppResult;

enum WriterMessage {
    Write { key: String, value: String, ttl: u64 },
    Shutdown,
}

pub struct RedisBackend {
    conn: MultiplexedConnection,
    write_tx: mpsc::UnboundedSender<WriterMessage>,
}

/// Owner of the background writer task; call [`shutdown`](Self::shutdown)
/// during graceful termination to flush pending writes
pub struct CacheWriterHandle {
    write_tx: mpsc::UnboundedSender<WriterMessage>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.write_tx.send(WriterMessage::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked during shutdown");
        }
    }
}

impl RedisBackend {
    /// Connects to Redis and spawns the writer task
    pub async fn connect(client: Client) -> AppResult<(Arc<Self>, CacheWriterHandle)> {
        let conn = client.get_multiplexed_async_connection().await?;
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(cache_writer_task(client, write_rx));
        let backend = Arc::new(Self {
            conn,
            write_tx: write_tx.clone(),
        });
        Ok((backend, CacheWriterHandle { write_tx, task }))
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    fn set_background(&self, key: String, value: String, ttl: u64) {
        if self
            .write_tx
            .send(WriterMessage::Write { key, value, ttl })
            .is_err()
        {
            tracing::warn!("Cache writer task is gone, dropping write");
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn
                .scan_match::<_, String>(format!("{}*", prefix))
                .await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }
        Ok(())
    }
}

pub fn create_redis_client(redis_url: &str) -> AppResult<Client> {
    Ok(Client::open(redis_url)?)
}

async fn cache_writer_task(client: Client, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    let mut conn: Option<MultiplexedConnection> = None;
    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Write { key, value, ttl } => {
                write_entry(&client, &mut conn, key, value, ttl).await;
            }
            WriterMessage::Shutdown => {
                // Flush whatever is still queued, then exit
                let mut drained = 0usize;
                while let Ok(message) = rx.try_recv() {
                    if let WriterMessage::Write { key, value, ttl } = message {
                        write_entry(&client, &mut conn, key, value, ttl).await;
                        drained += 1;
                    }
                }
                if drained > 0 {
                    tracing::debug!(drained, "Flushed pending cache writes on shutdown");
                }
                break;
            }
        }
    }
}

async fn write_entry(
    client: &Client,
    conn: &mut Option<MultiplexedConnection>,
    key: String,
    value: String,
    ttl: u64,
) {
    if conn.is_none() {
        match client.get_multiplexed_async_connection().await {
            Ok(c) => *conn = Some(c),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache writer cannot reach Redis, dropping write");
                return;
            }
        }
    }
    if let Some(active) = conn {
        if let Err(e) = active.set_ex::<_, _, ()>(&key, value, ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed, dropping connection");
            *conn = None;
        }
    }
}
