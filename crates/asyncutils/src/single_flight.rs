use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Flight<T> = (u64, Shared<BoxFuture<'static, T>>);

/// Runs at most one instance of an async operation at a time.
///
/// The first caller of [`run`](Self::run) starts the operation; anyone calling
/// `run` while it is still in flight awaits the same future and receives a
/// clone of its output. Once the flight lands the slot is cleared, so the next
/// call starts a fresh operation.
///
/// The lock guarding the slot is never held across an `.await`.
pub struct SingleFlight<T> {
    slot: Mutex<Option<Flight<T>>>,
    generation: AtomicU64,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { slot: Mutex::new(None), generation: AtomicU64::new(0) }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the in-flight operation, or starts a new one built by `f`.
    ///
    /// `f` is only invoked when nothing is in flight.
    pub async fn run<F, Fut>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (id, flight) = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some((id, flight)) => (*id, flight.clone()),
                None => {
                    let id = self.generation.fetch_add(1, Ordering::Relaxed);
                    let flight = f().boxed().shared();
                    *slot = Some((id, flight.clone()));
                    (id, flight)
                },
            }
        };
        let output = flight.await;
        let mut slot = self.lock();
        // Someone else may already have cleared it and started a new flight.
        if slot.as_ref().is_some_and(|(current, _)| *current == id) {
            *slot = None;
        }
        output
    }

    /// Returns `true` while an operation is running.
    pub fn in_flight(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Flight<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
