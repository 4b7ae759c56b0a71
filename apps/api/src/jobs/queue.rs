//! Redis-backed durable task queue.
//!
//! At-least-once delivery over plain Redis structures:
//! - `{queue}:pending`     LIST — FIFO via LPUSH / RPOPLPUSH
//! - `{queue}:processing`  LIST — in-flight tasks, LREM'd on completion
//! - `delayed`             ZSET — retries scored by ready-time (ms)
//! - `dead`                LIST — tasks that exhausted their attempts
//! - `unique:{key}`        STRING with TTL — enqueue-time dedup
//!
//! A crash between dequeue and ack leaves the task on `processing`;
//! startup recovery pushes those back to `pending`, which is what makes
//! delivery at-least-once rather than at-most-once.

use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::jobs::task::{queues, Task};

const KEY_PREFIX: &str = "vitae:jobs";

fn pending_key(queue: &str) -> String {
    format!("{KEY_PREFIX}:{queue}:pending")
}

fn processing_key(queue: &str) -> String {
    format!("{KEY_PREFIX}:{queue}:processing")
}

fn delayed_key() -> String {
    format!("{KEY_PREFIX}:delayed")
}

fn dead_key() -> String {
    format!("{KEY_PREFIX}:dead")
}

fn unique_key(key: &str) -> String {
    format!("{KEY_PREFIX}:unique:{key}")
}

/// A task pulled off a queue, together with the exact payload string
/// sitting on the processing list (needed to LREM it on completion).
#[derive(Debug)]
pub struct DequeuedTask {
    pub task: Task,
    pub queue: &'static str,
    raw: String,
}

/// Cloneable handle to the queue. All operations are non-blocking; the
/// worker pool polls.
#[derive(Clone)]
pub struct TaskQueue {
    conn: MultiplexedConnection,
}

impl TaskQueue {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Queue(format!("Invalid Redis URL: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Queue(format!("Redis connection failed: {e}")))?;
        info!("Redis task queue connected");
        Ok(Self { conn })
    }

    /// Enqueues a task onto its queue.
    pub async fn enqueue(&self, task: &Task) -> Result<(), AppError> {
        let json = task.to_json().map_err(queue_serde_err)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .lpush(pending_key(task.kind.queue()), &json)
            .await
            .map_err(queue_redis_err)?;
        debug!(
            task_id = %task.id,
            task = task.kind.name(),
            queue = task.kind.queue(),
            "Task enqueued"
        );
        Ok(())
    }

    /// Enqueues only if `key` is not already held. Returns false when a
    /// duplicate is in flight. The key is released when the task finishes
    /// and expires after `ttl_secs` regardless.
    pub async fn enqueue_unique(
        &self,
        task: &Task,
        key: &str,
        ttl_secs: u64,
    ) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let taken: Option<String> = redis::cmd("SET")
            .arg(unique_key(key))
            .arg(task.id.to_string())
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(queue_redis_err)?;

        if taken.is_none() {
            return Ok(false);
        }
        self.enqueue(task).await?;
        Ok(true)
    }

    /// Pops the next task from a queue, moving it to the processing list.
    pub async fn dequeue(&self, queue: &'static str) -> Result<Option<DequeuedTask>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .rpoplpush(pending_key(queue), processing_key(queue))
            .await
            .map_err(queue_redis_err)?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match Task::from_json(&raw) {
            Ok(task) => Ok(Some(DequeuedTask { task, queue, raw })),
            Err(e) => {
                // A payload we cannot parse can never succeed; dead-letter
                // it as-is instead of poisoning the queue.
                warn!(queue, "Unparseable task payload moved to dead letter: {e}");
                let _: () = conn.lpush(dead_key(), &raw).await.map_err(queue_redis_err)?;
                let _: () = conn
                    .lrem(processing_key(queue), 1, &raw)
                    .await
                    .map_err(queue_redis_err)?;
                Ok(None)
            }
        }
    }

    /// Acknowledges successful completion.
    pub async fn ack(&self, dequeued: &DequeuedTask) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .lrem(processing_key(dequeued.queue), 1, &dequeued.raw)
            .await
            .map_err(queue_redis_err)?;
        self.release_unique(&dequeued.task).await?;
        Ok(())
    }

    /// Schedules a retry: the task (with bumped attempt and error) goes on
    /// the delayed set, the old payload leaves the processing list.
    pub async fn retry_later(
        &self,
        dequeued: &DequeuedTask,
        error: &str,
        delay: std::time::Duration,
    ) -> Result<(), AppError> {
        let mut retried = dequeued.task.clone();
        retried.attempt += 1;
        retried.last_error = Some(error.to_string());
        let json = retried.to_json().map_err(queue_serde_err)?;

        let ready_at = Utc::now().timestamp_millis() + delay.as_millis() as i64;
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .zadd(delayed_key(), &json, ready_at)
            .lrem(processing_key(dequeued.queue), 1, &dequeued.raw)
            .query_async(&mut conn)
            .await
            .map_err(queue_redis_err)?;

        warn!(
            task_id = %retried.id,
            task = retried.kind.name(),
            attempt = retried.attempt,
            max_attempts = retried.max_attempts,
            "Task scheduled for retry in {}ms",
            delay.as_millis()
        );
        Ok(())
    }

    /// Moves an exhausted task to the dead-letter list.
    pub async fn dead_letter(&self, dequeued: &DequeuedTask, error: &str) -> Result<(), AppError> {
        let mut dead = dequeued.task.clone();
        dead.attempt += 1;
        dead.last_error = Some(error.to_string());
        let json = dead.to_json().map_err(queue_serde_err)?;

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .lpush(dead_key(), &json)
            .lrem(processing_key(dequeued.queue), 1, &dequeued.raw)
            .query_async(&mut conn)
            .await
            .map_err(queue_redis_err)?;
        self.release_unique(&dead).await?;

        warn!(
            task_id = %dead.id,
            task = dead.kind.name(),
            "Task dead-lettered after {} attempts",
            dead.attempt
        );
        Ok(())
    }

    /// Moves due tasks from the delayed set back onto their queues.
    /// Returns how many were promoted.
    pub async fn promote_due(&self) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp_millis();
        let due: Vec<String> = conn
            .zrangebyscore(delayed_key(), 0i64, now)
            .await
            .map_err(queue_redis_err)?;

        let mut promoted = 0u64;
        for json in due {
            let Ok(task) = Task::from_json(&json) else {
                warn!("Dropping unparseable delayed payload");
                let _: () = conn.zrem(delayed_key(), &json).await.map_err(queue_redis_err)?;
                continue;
            };
            let _: () = redis::pipe()
                .zrem(delayed_key(), &json)
                .lpush(pending_key(task.kind.queue()), &json)
                .query_async(&mut conn)
                .await
                .map_err(queue_redis_err)?;
            promoted += 1;
            debug!(task_id = %task.id, queue = task.kind.queue(), "Promoted delayed task");
        }

        Ok(promoted)
    }

    /// Pushes tasks stranded on processing lists (crashed worker) back to
    /// pending. Called once at startup, before workers begin polling.
    pub async fn recover_stranded(&self) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();
        let mut recovered = 0u64;

        for queue in queues::POLL_ORDER {
            loop {
                let raw: Option<String> = conn
                    .rpoplpush(processing_key(queue), pending_key(queue))
                    .await
                    .map_err(queue_redis_err)?;
                if raw.is_none() {
                    break;
                }
                recovered += 1;
            }
        }

        if recovered > 0 {
            info!("Recovered {recovered} stranded in-flight tasks");
        }
        Ok(recovered)
    }

    /// Current pending depth of a queue.
    pub async fn depth(&self, queue: &str) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();
        conn.llen(pending_key(queue)).await.map_err(queue_redis_err)
    }

    async fn release_unique(&self, task: &Task) -> Result<(), AppError> {
        if let Some(key) = &task.unique_key {
            let mut conn = self.conn.clone();
            let _: () = conn.del(unique_key(key)).await.map_err(queue_redis_err)?;
        }
        Ok(())
    }
}

fn queue_redis_err(e: redis::RedisError) -> AppError {
    AppError::Queue(format!("Redis command failed: {e}"))
}

fn queue_serde_err(e: serde_json::Error) -> AppError {
    AppError::Queue(format!("Task serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout_is_prefixed_and_per_queue() {
        assert_eq!(pending_key("extract"), "vitae:jobs:extract:pending");
        assert_eq!(processing_key("matching"), "vitae:jobs:matching:processing");
        assert_eq!(delayed_key(), "vitae:jobs:delayed");
        assert_eq!(dead_key(), "vitae:jobs:dead");
        assert_eq!(unique_key("match:a:b"), "vitae:jobs:unique:match:a:b");
    }

    #[test]
    fn test_queues_do_not_share_pending_keys() {
        assert_ne!(pending_key("extract"), pending_key("analysis"));
    }
}
