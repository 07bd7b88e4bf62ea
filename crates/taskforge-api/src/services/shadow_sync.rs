//! Background synchronization of task shadow records.
//!
//! Shadow writes run after the relational write has committed, on their own
//! tasks, with their own retry policy. Their outcome never reaches the caller
//! of the board operation.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, warn};
use uuid::Uuid;

use taskforge_core::{
    defaults, EmbeddingBackend, Result, ShadowRecord, Task, Tenant, VectorStore,
};

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            defaults::SHADOW_SYNC_MAX_ATTEMPTS,
            Duration::from_millis(defaults::SHADOW_SYNC_BACKOFF_MS),
        )
    }
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// Run `op` until it succeeds or the attempts are used up.
    pub async fn run<F, Fut>(&self, label: &str, mut op: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        subsystem = "search",
                        component = "shadow",
                        op = label,
                        attempt,
                        error = %e,
                        "Shadow sync attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay_after(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Queues embed-and-upsert and delete jobs for task shadow records.
pub struct ShadowIndexer {
    embedder: Arc<dyn EmbeddingBackend>,
    vectors: Arc<dyn VectorStore>,
    policy: RetryPolicy,
    jobs: Mutex<JoinSet<()>>,
}

impl ShadowIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        vectors: Arc<dyn VectorStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            vectors,
            policy,
            jobs: Mutex::new(JoinSet::new()),
        }
    }

    fn jobs(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn<Fut>(&self, job: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut jobs = self.jobs();
        // Reap finished jobs so the set only holds pending work.
        while jobs.try_join_next().is_some() {}
        jobs.spawn(job);
    }

    /// Number of queued jobs not yet reaped.
    pub fn pending(&self) -> usize {
        self.jobs().len()
    }

    /// Refresh the shadow record for `task` in `tenant`'s index.
    pub fn schedule_upsert(&self, tenant: &Tenant, task: Task) {
        let Some(index) = tenant.search_index_name.clone() else {
            debug!(
                subsystem = "search",
                component = "shadow",
                tenant_id = tenant.id,
                task_id = %task.id,
                "Tenant has no search index, skipping shadow upsert"
            );
            return;
        };

        let embedder = self.embedder.clone();
        let vectors = self.vectors.clone();
        let policy = self.policy;
        let tenant_id = tenant.id;

        self.spawn(async move {
            let start = Instant::now();
            let namespace = task.group_id.to_string();
            let text = task.embedding_text();
            let (embedder, vectors, task_ref) = (&embedder, &vectors, &task);
            let (index_ref, namespace, text) = (&index, &namespace, &text);
            let result = policy
                .run("upsert", || async move {
                    let values = embedder.embed(text).await?;
                    vectors
                        .upsert(
                            index_ref,
                            namespace,
                            vec![ShadowRecord::for_task(task_ref, values)],
                        )
                        .await
                })
                .await;

            match result {
                Ok(()) => debug!(
                    subsystem = "search",
                    component = "shadow",
                    op = "upsert",
                    tenant_id,
                    task_id = %task.id,
                    index_name = %index,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Shadow record upserted"
                ),
                Err(e) => error!(
                    subsystem = "search",
                    component = "shadow",
                    op = "upsert",
                    tenant_id,
                    task_id = %task.id,
                    index_name = %index,
                    attempts = policy.max_attempts,
                    error = %e,
                    "Shadow record upsert abandoned"
                ),
            }
        });
    }

    /// Remove the shadow record of a deleted task.
    pub fn schedule_delete(&self, tenant: &Tenant, group_id: Uuid, task_id: Uuid) {
        let Some(index) = tenant.search_index_name.clone() else {
            debug!(
                subsystem = "search",
                component = "shadow",
                tenant_id = tenant.id,
                task_id = %task_id,
                "Tenant has no search index, skipping shadow delete"
            );
            return;
        };

        let vectors = self.vectors.clone();
        let policy = self.policy;
        let tenant_id = tenant.id;

        self.spawn(async move {
            let namespace = group_id.to_string();
            let ids = [task_id.to_string()];
            let (vectors, index_ref, namespace, ids) = (&vectors, &index, &namespace, &ids);
            let result = policy
                .run("delete", || vectors.delete_many(index_ref, namespace, ids))
                .await;

            match result {
                Ok(()) => debug!(
                    subsystem = "search",
                    component = "shadow",
                    op = "delete",
                    tenant_id,
                    task_id = %task_id,
                    "Shadow record deleted"
                ),
                Err(e) => error!(
                    subsystem = "search",
                    component = "shadow",
                    op = "delete",
                    tenant_id,
                    task_id = %task_id,
                    index_name = %index,
                    error = %e,
                    "Shadow record delete abandoned"
                ),
            }
        });
    }

    /// Wait for every job queued so far.
    pub async fn drain(&self) {
        let mut jobs = std::mem::take(&mut *self.jobs());
        while let Some(joined) = jobs.join_next().await {
            if let Err(e) = joined {
                error!(
                    subsystem = "search",
                    component = "shadow",
                    error = %e,
                    "Shadow job panicked"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use taskforge_core::Error;

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .run("test", || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::external("Pinecone", "503"))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .run("test", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::external("Pinecone", "503"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
