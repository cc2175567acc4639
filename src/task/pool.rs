use std::{
    any::Any,
    convert::Infallible,
    fmt::Display,
    future::Future,
    num::NonZeroUsize,
    panic::AssertUnwindSafe,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_channel::Sender;
use futures::{FutureExt, future};
use log::trace;

use crate::{
    error::TaskError,
    task::{Outcome, RunEvent, TaskIndex, TaskRunner, WorkerId},
};

/// A task is `FnOnce`, so a worker moves it out of the shared slice by taking the `Option`.
type Slot<F> = Mutex<Option<F>>;

/// Runs a list of independent async tasks with at most `concurrency` of them in flight.
///
/// Workers are plain futures joined on the caller's task, so nothing is spawned onto the
/// runtime and tasks may borrow from the caller. Each worker claims the next unclaimed
/// index from a shared counter, runs that task, stores the value under the same index and
/// repeats until the list is exhausted. Results always come back in input order.
///
/// The runner keeps no state between invocations, has no retry, timeout or cancellation,
/// and a clone can be shared freely.
#[derive(Clone)]
pub struct BoundedRunner {
    concurrency: NonZeroUsize,
    events: Option<Sender<RunEvent>>,
}

impl BoundedRunner {
    pub fn new(concurrency: usize) -> Result<Self, TaskError> {
        let concurrency =
            NonZeroUsize::new(concurrency).ok_or(TaskError::InvalidConcurrency(concurrency))?;
        Ok(Self {
            concurrency,
            events: None,
        })
    }

    /// Report claim/finish progress on `sender`.
    ///
    /// Events are sent with backpressure: a bounded channel whose receiver is alive but not
    /// being read stalls the workers once it is full, and the run only resumes when the
    /// receiver drains it. Use an unbounded channel when nothing reads events concurrently
    /// with the run. Once every receiver is dropped, events are discarded and the run
    /// continues.
    pub fn with_events(mut self, sender: Sender<RunEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.get()
    }

    /// Number of workers used for `task_count` tasks.
    pub fn effective_concurrency(&self, task_count: usize) -> usize {
        self.concurrency.get().min(task_count)
    }

    /// Run every task once and return their values, index-aligned with `tasks`.
    pub async fn run<F, Fut, T>(&self, tasks: Vec<F>) -> Vec<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let tasks: Vec<_> = tasks
            .into_iter()
            .map(|task| move || task().map(Ok::<T, Infallible>))
            .collect();

        match self.drive(tasks).await {
            Ok(results) => results,
            Err(never) => match never {},
        }
    }

    /// All-or-nothing variant: the first task error fails the whole run. Tasks still in
    /// flight at that point are dropped and values already produced are discarded.
    pub async fn try_run<F, Fut, T, E>(&self, tasks: Vec<F>) -> Result<Vec<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.drive(tasks).await
    }

    /// Catch-and-tag variant: every error, and every panic, becomes an
    /// [`Outcome::Failure`] in that task's slot while its siblings keep running.
    pub async fn run_tagged<F, Fut, T, E>(&self, tasks: Vec<F>) -> Vec<Outcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let tasks: Vec<_> = tasks.into_iter().map(|task| move || tag(task)).collect();
        self.run(tasks).await
    }

    /// Run `runner` once per item, tagging each result.
    pub async fn run_items<R>(&self, runner: &R, items: Vec<R::Item>) -> Vec<Outcome<R::Output>>
    where
        R: TaskRunner + ?Sized,
    {
        let tasks: Vec<_> = items
            .into_iter()
            .map(|item| move || runner.run(item))
            .collect();
        self.run_tagged(tasks).await
    }

    async fn drive<F, Fut, T, E>(&self, tasks: Vec<F>) -> Result<Vec<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.effective_concurrency(total);
        trace!("running {total} tasks on {workers} workers");

        let next = AtomicUsize::new(0);
        let slots: Vec<Slot<F>> = tasks
            .into_iter()
            .map(|task| Mutex::new(Some(task)))
            .collect();

        let finished =
            future::try_join_all((0..workers).map(|worker| self.worker(worker, &next, &slots)))
                .await?;

        let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
        for (index, value) in finished.into_iter().flatten() {
            results[index] = Some(value);
        }
        let results: Vec<T> = results.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), total);

        Ok(results)
    }

    async fn worker<F, Fut, T, E>(
        &self,
        worker: WorkerId,
        next: &AtomicUsize,
        slots: &[Slot<F>],
    ) -> Result<Vec<(TaskIndex, T)>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut finished = Vec::new();

        loop {
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(slot) = slots.get(index) else {
                break;
            };
            // `fetch_add` hands each index to one worker only, so the slot is still filled.
            let Some(task) = slot.lock().unwrap_or_else(|e| e.into_inner()).take() else {
                break;
            };

            self.notify(RunEvent::Claimed { index, worker }).await;
            let value = task().await?;
            self.notify(RunEvent::Finished { index, worker }).await;

            finished.push((index, value));
        }

        trace!("worker {worker} exited after {} tasks", finished.len());
        Ok(finished)
    }

    async fn notify(&self, event: RunEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).await.is_err() {
                trace!("run event receiver closed, dropping {event:?}");
            }
        }
    }
}

/// Run `tasks` with at most `concurrency` in flight, returning values in input order.
pub async fn run_bounded<F, Fut, T>(tasks: Vec<F>, concurrency: usize) -> Result<Vec<T>, TaskError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let runner = BoundedRunner::new(concurrency)?;
    Ok(runner.run(tasks).await)
}

async fn tag<F, Fut, T, E>(task: F) -> Outcome<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match AssertUnwindSafe(async move { task().await })
        .catch_unwind()
        .await
    {
        Ok(result) => Outcome::from_result(result),
        Err(panic) => Outcome::Failure(format!("task panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
