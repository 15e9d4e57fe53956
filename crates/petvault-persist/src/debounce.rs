use std::{future::Future, time::Duration};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Identifies one scheduled run. Goes stale as soon as another run is
/// scheduled or the debouncer is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Owns at most one pending timer. Scheduling replaces (and aborts) the
/// previous timer, so a burst of calls results in a single run `window`
/// after the last one.
///
/// The scheduled job must call [`Debouncer::claim`] before doing any work.
/// Once claimed, the run is detached from the debouncer: later schedules or
/// cancellation no longer abort it.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(&self, job: F)
    where
        F: FnOnce(Ticket) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }
        slot.generation += 1;
        let run = job(Ticket(slot.generation));
        let window = self.window;
        slot.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            run.await;
        }));
    }

    /// Returns true exactly once for the current ticket.
    pub fn claim(&self, ticket: Ticket) -> bool {
        let mut slot = self.slot.lock();
        if slot.generation != ticket.0 || slot.pending.is_none() {
            return false;
        }
        // Dropping the handle detaches the task; it keeps running.
        slot.pending = None;
        true
    }

    /// Abort the pending timer, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.lock();
        slot.generation += 1;
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tokio::time::sleep;

    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn schedule_count(debouncer: &Arc<Debouncer>, hits: &Arc<AtomicUsize>) {
        let owner = Arc::clone(debouncer);
        let hits = Arc::clone(hits);
        debouncer.schedule(move |ticket| async move {
            if owner.claim(ticket) {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_once_after_last_call() {
        let debouncer = Arc::new(Debouncer::new(WINDOW));
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            schedule_count(&debouncer, &hits);
            sleep(Duration::from_millis(100)).await;
        }
        // Last call at t=900; due at t=1400. Now at t=1000.
        sleep(Duration::from_millis(399)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn late_call_pushes_the_deadline_back() {
        let debouncer = Arc::new(Debouncer::new(WINDOW));
        let hits = Arc::new(AtomicUsize::new(0));

        schedule_count(&debouncer, &hits);
        sleep(Duration::from_millis(499)).await;
        schedule_count(&debouncer, &hits);

        sleep(Duration::from_millis(499)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_run() {
        let debouncer = Arc::new(Debouncer::new(WINDOW));
        let hits = Arc::new(AtomicUsize::new(0));

        schedule_count(&debouncer, &hits);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        sleep(WINDOW * 2).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_ticket_cannot_be_claimed() {
        let debouncer = Debouncer::new(WINDOW);
        let mut first = None;
        debouncer.schedule(|ticket| {
            first = Some(ticket);
            async {}
        });
        debouncer.schedule(|_| async {});

        let first = first.expect("ticket");
        assert!(!debouncer.claim(first));
        assert!(debouncer.is_pending());
    }
}
