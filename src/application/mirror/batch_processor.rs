use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinSet;
use tracing::warn;

/// How many syncs run side by side
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub concurrent_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrent_batch_size: 5,
        }
    }
}

/// Outcome for one item. `result` holds the join error text when the task
/// panicked or was aborted.
#[derive(Debug)]
pub struct BatchItemResult<T, R = ()> {
    pub item: T,
    pub result: Result<R, String>,
}

/// Runs each item as its own tokio task with at most
/// `concurrent_batch_size` running. A finished task frees its slot for the
/// next item straight away, so one slow sync does not hold back the others.
pub struct BatchProcessor;

impl BatchProcessor {
    /// Results come back in input order.
    pub async fn process_concurrent<F, Fut, T, R>(
        items: Vec<T>,
        config: &BatchConfig,
        processor: F,
    ) -> Vec<BatchItemResult<T, R>>
    where
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = R> + Send + 'static,
        T: Send + 'static + Clone,
        R: Send + 'static,
    {
        let limit = config.concurrent_batch_size.max(1);
        let mut outcomes: Vec<Option<Result<R, String>>> = items.iter().map(|_| None).collect();
        let mut tasks = JoinSet::new();
        let mut task_slots = HashMap::new();
        let mut pending = items.iter().cloned().enumerate();

        loop {
            while tasks.len() < limit {
                let Some((slot, item)) = pending.next() else {
                    break;
                };
                let handle = tasks.spawn(processor(item));
                task_slots.insert(handle.id(), slot);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, value)) => {
                    if let Some(slot) = task_slots.remove(&id) {
                        outcomes[slot] = Some(Ok(value));
                    }
                }
                Err(e) => {
                    warn!("Mirror sync task crashed: {}", e);
                    if let Some(slot) = task_slots.remove(&e.id()) {
                        outcomes[slot] = Some(Err(e.to_string()));
                    }
                }
            }
        }

        items
            .into_iter()
            .zip(outcomes)
            .map(|(item, outcome)| BatchItemResult {
                item,
                result: outcome.unwrap_or_else(|| Err("task result lost".to_string())),
            })
            .collect()
    }
}
