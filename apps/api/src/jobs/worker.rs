//! Worker pool for the background pipeline.
//!
//! N polling loops pull tasks off the named queues in priority order and
//! dispatch on the task kind. A separate promoter loop moves due retries
//! back onto their queues. Failures retry with exponential backoff until
//! the attempt budget runs out, then the task is dead-lettered and the
//! owning row is marked failed.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::analysis;
use crate::errors::AppError;
use crate::extract;
use crate::jobs::queue::{DequeuedTask, TaskQueue};
use crate::jobs::retry::policy_for;
use crate::jobs::task::{queues, TaskKind};
use crate::matching;
use crate::models;
use crate::providers::ProviderRegistry;
use crate::storage::Storage;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PROMOTE_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a worker needs to process any task kind.
#[derive(Clone)]
pub struct WorkerContext {
    pub db: PgPool,
    pub queue: TaskQueue,
    pub storage: Storage,
    pub providers: Arc<ProviderRegistry>,
}

/// Recovers stranded tasks, then spawns the promoter and `concurrency`
/// worker loops. Handles are returned but the loops run until process
/// shutdown.
pub async fn start(ctx: WorkerContext, concurrency: usize) -> Result<Vec<JoinHandle<()>>, AppError> {
    ctx.queue.recover_stranded().await?;

    let mut handles = Vec::with_capacity(concurrency + 1);

    let promoter_queue = ctx.queue.clone();
    handles.push(tokio::spawn(async move {
        promoter_loop(promoter_queue).await;
    }));

    let ctx = Arc::new(ctx);
    for worker_id in 0..concurrency {
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, ctx).await;
        }));
    }

    info!("Worker pool started ({concurrency} workers)");
    Ok(handles)
}

async fn promoter_loop(queue: TaskQueue) {
    loop {
        if let Err(e) = queue.promote_due().await {
            error!("Promoter failed: {e}");
        }
        tokio::time::sleep(PROMOTE_INTERVAL).await;
    }
}

async fn worker_loop(worker_id: usize, ctx: Arc<WorkerContext>) {
    info!(worker_id, "Worker loop started");
    loop {
        let mut worked = false;

        for queue_name in queues::POLL_ORDER {
            match ctx.queue.dequeue(queue_name).await {
                Ok(Some(dequeued)) => {
                    process(&ctx, worker_id, dequeued).await;
                    worked = true;
                    break; // re-check higher-priority queues first
                }
                Ok(None) => {}
                Err(e) => {
                    error!(worker_id, queue = queue_name, "Dequeue failed: {e}");
                }
            }
        }

        if !worked {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

async fn process(ctx: &WorkerContext, worker_id: usize, dequeued: DequeuedTask) {
    let task = &dequeued.task;
    info!(
        worker_id,
        task_id = %task.id,
        task = task.kind.name(),
        attempt = task.attempt + 1,
        max_attempts = task.max_attempts,
        "Processing task"
    );

    match dispatch(ctx, &task.kind).await {
        Ok(()) => {
            if let Err(e) = ctx.queue.ack(&dequeued).await {
                error!(task_id = %task.id, "Failed to ack completed task: {e}");
            }
        }
        Err(e) => {
            let failed_attempts = task.attempt + 1;
            warn!(
                worker_id,
                task_id = %task.id,
                task = task.kind.name(),
                "Task failed on attempt {failed_attempts}: {e}"
            );

            if failed_attempts >= task.max_attempts {
                if let Err(dlq_err) = ctx.queue.dead_letter(&dequeued, &e.to_string()).await {
                    error!(task_id = %task.id, "Failed to dead-letter task: {dlq_err}");
                }
                mark_failed(ctx, &task.kind, &e).await;
            } else {
                let delay = policy_for(dequeued.queue).delay_for_attempt(failed_attempts);
                if let Err(retry_err) = ctx.queue.retry_later(&dequeued, &e.to_string(), delay).await
                {
                    error!(task_id = %task.id, "Failed to schedule retry: {retry_err}");
                }
            }
        }
    }
}

async fn dispatch(ctx: &WorkerContext, kind: &TaskKind) -> Result<(), AppError> {
    match kind {
        TaskKind::ExtractText { resume_id } => {
            extract::run_extraction(&ctx.db, &ctx.storage, &ctx.queue, *resume_id).await
        }
        TaskKind::AnalyzeResume { resume_id } => {
            analysis::run_analysis(&ctx.db, &ctx.providers, *resume_id).await
        }
        TaskKind::MatchJd { matching_id } => {
            matching::run_matching(&ctx.db, &ctx.providers, *matching_id).await
        }
    }
}

/// Marks the owning domain row failed once a task's attempts are spent.
async fn mark_failed(ctx: &WorkerContext, kind: &TaskKind, error: &AppError) {
    let message = error.to_string();
    let result = match kind {
        TaskKind::ExtractText { resume_id } | TaskKind::AnalyzeResume { resume_id } => {
            sqlx::query(
                "UPDATE resumes SET status = $1, error_message = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(models::resume::status::FAILED)
            .bind(&message)
            .bind(resume_id)
            .execute(&ctx.db)
            .await
        }
        TaskKind::MatchJd { matching_id } => {
            sqlx::query(
                "UPDATE jd_matchings SET status = $1, error_message = $2, updated_at = NOW() WHERE id = $3",
            )
            .bind(models::matching::status::FAILED)
            .bind(&message)
            .bind(matching_id)
            .execute(&ctx.db)
            .await
        }
    };

    if let Err(e) = result {
        error!("Failed to mark {} row as failed: {e}", kind.name());
    }
}
