//! # Work Queue
//!
//! Deduplicating, delay-aware, rate-limited queue of reconcile keys.
//!
//! Guarantees:
//! - an item is queued at most once no matter how often it is added
//! - an item handed out by [`WorkQueue::get`] is not handed out again until
//!   [`WorkQueue::done`] is called for it; adds in the meantime mark it dirty
//!   and it is re-queued on `done`
//!
//! This is the only thing serializing reconciles of the same key.

use crate::controller::backoff::RateLimiter;
use crate::observability::metrics;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Handle to a shared work queue; clones refer to the same queue
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: String,
    state: Mutex<QueueState<T>>,
    notify: Notify,
    rate_limiter: Box<dyn RateLimiter<T>>,
}

struct QueueState<T> {
    /// Items ready to be handed out, in order
    queue: VecDeque<T>,
    /// Items that need processing (queued, or processing and re-added)
    dirty: HashSet<T>,
    /// Items currently handed out to a worker
    processing: HashSet<T>,
    /// Delayed items and the instant they become ready
    waiting: HashMap<T, Instant>,
    shutting_down: bool,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl<T> QueueState<T>
where
    T: Clone + Eq + Hash,
{
    fn insert(&mut self, item: T) -> bool {
        if self.dirty.contains(&item) {
            return false;
        }
        self.dirty.insert(item.clone());
        if self.processing.contains(&item) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Move every delayed item whose deadline has passed into the queue
    fn promote_ready(&mut self, now: Instant) {
        let ready: Vec<T> = self
            .waiting
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(item, _)| item.clone())
            .collect();
        for item in ready {
            self.waiting.remove(&item);
            self.insert(item);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.waiting.values().min().copied()
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + 'static,
{
    pub fn new(name: impl Into<String>, rate_limiter: impl RateLimiter<T> + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    waiting: HashMap::new(),
                    shutting_down: false,
                }),
                notify: Notify::new(),
                rate_limiter: Box::new(rate_limiter),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState<T>> {
        // A poisoned lock only means a panic happened while it was held; the
        // sets themselves are always left consistent.
        self.inner
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue an item for processing
    pub fn add(&self, item: T) {
        let mut state = self.state();
        if state.shutting_down {
            return;
        }
        metrics::increment_queue_adds(&self.inner.name);
        if state.insert(item) {
            metrics::set_queue_depth(&self.inner.name, state.queue.len());
            drop(state);
            self.inner.notify.notify_waiters();
        }
    }

    /// Queue an item once `delay` has passed
    ///
    /// Delays for the same item coalesce to the earliest deadline.
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let mut state = self.state();
        if state.shutting_down {
            return;
        }
        let ready_at = Instant::now() + delay;
        state
            .waiting
            .entry(item)
            .and_modify(|at| *at = (*at).min(ready_at))
            .or_insert(ready_at);
        drop(state);
        // Waiting workers may need to wake earlier than they planned to
        self.inner.notify.notify_waiters();
    }

    /// Queue an item after the rate limiter's delay for it; returns the delay
    pub fn add_rate_limited(&self, item: T) -> Duration {
        let delay = self.inner.rate_limiter.when(&item);
        metrics::increment_queue_retries(&self.inner.name);
        self.add_after(item, delay);
        delay
    }

    /// Reset the item's failure history
    pub fn forget(&self, item: &T) {
        self.inner.rate_limiter.forget(item);
    }

    /// Failures recorded for the item since the last `forget`
    #[must_use]
    pub fn num_requeues(&self, item: &T) -> u32 {
        self.inner.rate_limiter.num_requeues(item)
    }

    /// Wait for the next ready item and mark it as processing
    ///
    /// Returns `None` once the queue is shut down and nothing is left to hand out.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a concurrent add cannot be missed
            notified.as_mut().enable();

            let deadline = {
                let mut state = self.state();
                if !state.shutting_down {
                    state.promote_ready(Instant::now());
                }
                if let Some(item) = state.queue.pop_front() {
                    state.processing.insert(item.clone());
                    state.dirty.remove(&item);
                    metrics::set_queue_depth(&self.inner.name, state.queue.len());
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
                state.next_deadline()
            };

            match deadline {
                Some(at) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark an item as finished; re-queue it if it was added while processing
    pub fn done(&self, item: &T) {
        let mut state = self.state();
        state.processing.remove(item);
        if state.dirty.contains(item) && !state.shutting_down {
            state.queue.push_back(item.clone());
            metrics::set_queue_depth(&self.inner.name, state.queue.len());
            drop(state);
            self.inner.notify.notify_waiters();
        }
    }

    /// Stop accepting items and wake every waiting `get`
    ///
    /// Items already queued are still handed out; delayed items are dropped.
    pub fn shut_down(&self) {
        let mut state = self.state();
        state.shutting_down = true;
        state.waiting.clear();
        drop(state);
        self.inner.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.state().shutting_down
    }

    /// Number of items ready to be handed out
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of delayed items not yet ready
    #[must_use]
    pub fn waiting_len(&self) -> usize {
        self.state().waiting.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::backoff::ItemExponentialBackoff;

    fn queue() -> WorkQueue<String> {
        WorkQueue::new(
            "test",
            ItemExponentialBackoff::new(Duration::from_millis(5), Duration::from_secs(1)),
        )
    }

    #[tokio::test]
    async fn test_add_deduplicates_pending() {
        let q = queue();
        for _ in 0..10 {
            q.add("default/r1".to_string());
        }
        q.add("default/r2".to_string());
        assert_eq!(q.len(), 2);

        assert_eq!(q.get().await.as_deref(), Some("default/r1"));
        assert_eq!(q.get().await.as_deref(), Some("default/r2"));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_add_while_processing_requeues_on_done() {
        let q = queue();
        q.add("k".to_string());
        let item = q.get().await.unwrap();

        q.add("k".to_string());
        q.add("k".to_string());
        // Not handed out twice while processing
        assert!(q.is_empty());

        q.done(&item);
        assert_eq!(q.len(), 1);
        assert_eq!(q.get().await.as_deref(), Some("k"));
        q.done(&item);
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn test_done_without_readd_does_not_requeue() {
        let q = queue();
        q.add("k".to_string());
        let item = q.get().await.unwrap();
        q.done(&item);
        assert!(q.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_delays_item() {
        let q = queue();
        q.add_after("k".to_string(), Duration::from_secs(5));
        assert!(q.is_empty());
        assert_eq!(q.waiting_len(), 1);

        let start = Instant::now();
        assert_eq!(q.get().await.as_deref(), Some("k"));
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_after_coalesces_to_earliest() {
        let q = queue();
        q.add_after("k".to_string(), Duration::from_secs(10));
        q.add_after("k".to_string(), Duration::from_secs(2));
        assert_eq!(q.waiting_len(), 1);

        let start = Instant::now();
        q.get().await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_rate_limited_backs_off_and_forget_resets() {
        let q = queue();
        let key = "k".to_string();

        q.add_rate_limited(key.clone());
        q.add_rate_limited(key.clone());
        assert_eq!(q.num_requeues(&key), 2);

        q.get().await.unwrap();
        q.done(&key);
        q.forget(&key);
        assert_eq!(q.num_requeues(&key), 0);
    }

    #[tokio::test]
    async fn test_shutdown_wakes_blocked_getters() {
        let q = queue();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let q = q.clone();
            handles.push(tokio::spawn(async move { q.get().await }));
        }
        tokio::task::yield_now().await;

        q.shut_down();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_ready_items_and_rejects_new() {
        let q = queue();
        q.add("a".to_string());
        q.add_after("b".to_string(), Duration::from_secs(60));
        q.shut_down();

        q.add("c".to_string());
        assert_eq!(q.get().await.as_deref(), Some("a"));
        assert_eq!(q.get().await, None);
        assert!(q.is_shutting_down());
    }

    #[tokio::test]
    async fn test_blocked_get_receives_later_add() {
        let q = queue();
        let getter = {
            let q = q.clone();
            tokio::spawn(async move { q.get().await })
        };
        tokio::task::yield_now().await;

        q.add("late".to_string());
        assert_eq!(getter.await.unwrap().as_deref(), Some("late"));
    }
}
