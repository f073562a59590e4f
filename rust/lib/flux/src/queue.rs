//! Single serialized reconciliation queue.
//!
//! One worker task owns a [`Reconciler`] and feeds it, one at a time:
//!
//! 1. `bootstrap()` once, before anything else;
//! 2. events from the external feed, with priority;
//! 3. tasks submitted through [`TaskQueue`].
//!
//! Every dequeued item gets the next [`Sequence`]. Because the worker never
//! runs two items concurrently, the reconciler can keep its state in plain
//! fields and mutate it across `.await` points without locks.

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Monotonic position of a task or event in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(pub u64);

/// The exclusive owner of reconciled state, driven by the queue worker.
pub trait Reconciler: Send + 'static {
    type Task: Send + 'static;
    type Event: Send + 'static;

    /// Runs once before the first task or event.
    fn bootstrap(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    fn on_task(&mut self, seq: Sequence, task: Self::Task) -> impl Future<Output = ()> + Send;

    fn on_event(&mut self, seq: Sequence, event: Self::Event) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reconciliation queue is closed")]
pub struct QueueClosed;

/// Submission handle for the queue. Cheap to clone.
pub struct TaskQueue<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> TaskQueue<T> {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The worker stops once every `TaskQueue` handle is dropped and the
    /// task backlog is drained; the join handle yields the reconciler back.
    pub fn spawn<R>(
        reconciler: R,
        events: Option<mpsc::UnboundedReceiver<R::Event>>,
    ) -> (Self, JoinHandle<R>)
    where
        R: Reconciler<Task = T>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(reconciler, rx, events));
        (Self { tx }, handle)
    }

    pub fn submit(&self, task: T) -> Result<(), QueueClosed> {
        self.tx.send(task).map_err(|_| QueueClosed)
    }

    /// Submit a task carrying a one-shot reply and wait for the answer.
    pub async fn request<R, F>(&self, make: F) -> Result<R, QueueClosed>
    where
        F: FnOnce(oneshot::Sender<R>) -> T,
    {
        let (reply, answer) = oneshot::channel();
        self.submit(make(reply))?;
        answer.await.map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run<R: Reconciler>(
    mut reconciler: R,
    mut tasks: mpsc::UnboundedReceiver<R::Task>,
    events: Option<mpsc::UnboundedReceiver<R::Event>>,
) -> R {
    let (mut events, mut events_open) = match events {
        Some(rx) => (rx, true),
        None => (mpsc::unbounded_channel().1, false),
    };
    let mut seq = 0u64;

    reconciler.bootstrap().await;

    loop {
        tokio::select! {
            biased;
            event = events.recv(), if events_open => match event {
                Some(event) => {
                    seq += 1;
                    trace!(seq, "reconciling event");
                    reconciler.on_event(Sequence(seq), event).await;
                }
                None => {
                    debug!("event feed closed");
                    events_open = false;
                }
            },
            task = tasks.recv() => match task {
                Some(task) => {
                    seq += 1;
                    trace!(seq, "reconciling task");
                    reconciler.on_task(Sequence(seq), task).await;
                }
                None => break,
            },
        }
    }

    debug!(processed = seq, "reconciliation queue stopped");
    reconciler
}
