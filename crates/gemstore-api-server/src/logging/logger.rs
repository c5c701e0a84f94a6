use flume::{bounded, Receiver, Sender};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::types::AuditLog;

#[derive(Debug, Clone)]
pub struct AuditLoggerConfig {
    /// Queue capacity (max logs in memory before drops)
    pub queue_capacity: usize,
    pub batch_size: usize,
    /// Max wait before flushing a partial batch (milliseconds)
    pub batch_timeout_ms: u64,
}

impl Default for AuditLoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 4_096,
            batch_size: 50,
            batch_timeout_ms: 1000,
        }
    }
}

/// Async audit trail with a bounded queue. Handlers enqueue and move on;
/// a background worker batches inserts into audit_logs.
#[derive(Clone)]
pub struct AuditLogger {
    sender: Sender<AuditLog>,
}

impl AuditLogger {
    pub fn new(pool: PgPool, config: AuditLoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);

        info!(
            "Starting audit logger: queue={}, batch={}, timeout={}ms",
            config.queue_capacity, config.batch_size, config.batch_timeout_ms
        );

        tokio::spawn(async move {
            Self::worker_loop(pool, receiver, config).await;
        });

        Self { sender }
    }

    /// Enqueue an audit record (non-blocking, fire-and-forget). A full
    /// queue drops the record with a warning rather than stalling a request.
    pub fn log(&self, log: AuditLog) {
        if let Err(e) = self.sender.try_send(log) {
            warn!("Failed to enqueue audit log (queue full?): {}", e);
        }
    }

    async fn worker_loop(pool: PgPool, receiver: Receiver<AuditLog>, config: AuditLoggerConfig) {
        let mut batch: Vec<AuditLog> = Vec::with_capacity(config.batch_size);
        let batch_timeout = Duration::from_millis(config.batch_timeout_ms);

        loop {
            let deadline = tokio::time::Instant::now() + batch_timeout;

            while batch.len() < config.batch_size {
                match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                    Ok(Ok(log)) => batch.push(log),
                    Ok(Err(_)) => {
                        // Channel closed, flush and exit
                        if !batch.is_empty() {
                            Self::flush_batch(&pool, &batch).await;
                        }
                        info!("Audit logger shutting down (channel closed)");
                        return;
                    }
                    Err(_) => break, // timeout, flush what we have
                }
            }

            if !batch.is_empty() {
                Self::flush_batch(&pool, &batch).await;
                batch.clear();
            } else {
                sleep(Duration::from_millis(100)).await;
            }
        }
    }

    async fn flush_batch(pool: &PgPool, batch: &[AuditLog]) {
        debug!("Flushing {} audit logs", batch.len());

        if let Err(e) = Self::insert_batch(pool, batch).await {
            error!("Failed to insert audit batch: {}", e);
        }
    }

    async fn insert_batch(pool: &PgPool, logs: &[AuditLog]) -> Result<(), sqlx::Error> {
        let mut query_builder = sqlx::QueryBuilder::new(
            r#"
            INSERT INTO audit_logs (
                actor_id, action, entity, entity_id, status, detail, created_at
            )
            "#,
        );

        query_builder.push_values(logs, |mut b, log| {
            b.push_bind(log.actor_id)
                .push_bind(log.action.as_str())
                .push_bind(&log.entity)
                .push_bind(&log.entity_id)
                .push_bind(log.status.as_str())
                .push_bind(&log.detail)
                .push_bind(log.created_at);
        });

        query_builder.build().execute(pool).await?;
        Ok(())
    }

    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }
}
