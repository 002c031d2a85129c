use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{unbounded, RecvTimeoutError, Sender};
use tracing::{debug, error};

/// Coalesces bursts of values into a single call of `action`.
///
/// Every [`trigger`](Debouncer::trigger) replaces the pending value and
/// restarts the quiet period; `action` runs on a worker thread with the last
/// value once `delay` passes without a new trigger. A value still pending
/// when the debouncer is dropped is run before the worker exits.
pub struct Debouncer<T: Send + 'static> {
    tx: Option<Sender<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, mut action: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = unbounded::<T>();
        let worker = thread::spawn(move || {
            let mut pending: Option<T> = None;
            loop {
                let next = if pending.is_some() {
                    rx.recv_timeout(delay)
                } else {
                    rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
                };

                match next {
                    Ok(value) => {
                        if pending.replace(value).is_some() {
                            debug!("Superseded pending redraw");
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(value) = pending.take() {
                            action(value);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        if let Some(value) = pending.take() {
                            action(value);
                        }
                        break;
                    }
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn trigger(&self, value: T) {
        if let Some(tx) = &self.tx {
            if tx.send(value).is_err() {
                error!("Debounce worker is gone; dropping update");
            }
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Debounce worker panicked");
            }
        }
    }
}
