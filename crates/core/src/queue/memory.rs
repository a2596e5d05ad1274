use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::queue::{JobQueue, LectureJob, QueueError};

/// Bounded in-process FIFO. Unlike a drop-oldest buffer it refuses new jobs
/// when full so the submitter can take the inline fallback instead.
///
/// Dequeued jobs stay in flight until acknowledged; [`JobQueue::nack`] puts
/// one back at the head of the queue.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<MemoryQueueInner>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<LectureJob>,
    in_flight: HashMap<Uuid, LectureJob>,
}

struct MemoryQueueInner {
    state: Mutex<QueueState>,
    capacity: usize,
    closed: AtomicBool,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);

        Self {
            inner: Arc::new(MemoryQueueInner {
                state: Mutex::new(QueueState {
                    pending: VecDeque::with_capacity(capacity),
                    in_flight: HashMap::new(),
                }),
                capacity,
                closed: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Rejects further enqueues and wakes waiting consumers once drained.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Jobs waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs handed out and not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: LectureJob) -> Result<(), QueueError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }

        let mut state = self.lock();
        if state.pending.len() >= self.inner.capacity {
            return Err(QueueError::Full {
                capacity: self.inner.capacity,
            });
        }
        state.pending.push_back(job);
        drop(state);
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Result<LectureJob, QueueError> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = {
                let mut state = self.lock();
                let next = state.pending.pop_front();
                if let Some(job) = &next {
                    state.in_flight.insert(job.job_id, job.clone());
                }
                next
            };
            if let Some(job) = next {
                return Ok(job);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }

            notified.await;
        }
    }

    async fn ack(&self, job: &LectureJob) -> Result<(), QueueError> {
        self.lock().in_flight.remove(&job.job_id);
        Ok(())
    }

    async fn nack(&self, job: &LectureJob) -> Result<(), QueueError> {
        let returned = {
            let mut state = self.lock();
            match state.in_flight.remove(&job.job_id) {
                Some(job) => {
                    state.pending.push_front(job);
                    true
                }
                None => false,
            }
        };
        if returned {
            self.inner.notify.notify_one();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::queue::JobReason;

    fn job() -> LectureJob {
        LectureJob::new(Uuid::new_v4(), JobReason::Upload)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryQueue::new(4);
        let first = job();
        let second = job();
        queue.enqueue(first.clone()).await.unwrap();
        queue.enqueue(second.clone()).await.unwrap();

        assert_eq!(queue.dequeue().await.unwrap(), first);
        assert_eq!(queue.dequeue().await.unwrap(), second);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_when_full() {
        let queue = MemoryQueue::new(1);
        queue.enqueue(job()).await.unwrap();

        let err = queue.enqueue(job()).await.unwrap_err();
        assert!(matches!(err, QueueError::Full { capacity: 1 }));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_when_closed() {
        let queue = MemoryQueue::new(2);
        queue.close();
        assert!(matches!(
            queue.enqueue(job()).await,
            Err(QueueError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let queue = MemoryQueue::new(2);
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let sent = job();
        queue.enqueue(sent.clone()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_unacked_job_is_delivered_again_after_nack() {
        let queue = MemoryQueue::new(4);
        let first = job();
        let second = job();
        queue.enqueue(first.clone()).await.unwrap();
        queue.enqueue(second.clone()).await.unwrap();

        let claimed = queue.dequeue().await.unwrap();
        assert_eq!(queue.in_flight(), 1);
        queue.nack(&claimed).await.unwrap();

        assert_eq!(queue.in_flight(), 0);
        assert_eq!(queue.dequeue().await.unwrap(), first);
        assert_eq!(queue.dequeue().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_ack_forgets_job() {
        let queue = MemoryQueue::new(2);
        queue.enqueue(job()).await.unwrap();

        let claimed = queue.dequeue().await.unwrap();
        queue.ack(&claimed).await.unwrap();
        queue.nack(&claimed).await.unwrap();

        assert_eq!(queue.in_flight(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let queue = MemoryQueue::new(2);
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let result = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(QueueError::Closed)));
    }
}
