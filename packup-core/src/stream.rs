//! Cancellable value streams returned by task handlers.
//!
//! A [`TaskStream`] is the subscriber side: it yields values over time and
//! owns a teardown callback. Dropping or unsubscribing runs the teardown
//! exactly once, which is where watch handlers close their native watcher.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

type Teardown = Box<dyn FnOnce() + Send>;

/// Producer side of a [`TaskStream`].
#[derive(Debug)]
pub struct Emitter<T> {
    sender: mpsc::UnboundedSender<T>,
    cancelled: Arc<AtomicBool>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

impl<T> Emitter<T> {
    /// Pushes a value. Returns `false` once the subscriber is gone.
    pub fn emit(&self, value: T) -> bool {
        !self.is_cancelled() && self.sender.send(value).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.sender.is_closed()
    }
}

/// Subscriber side of a task's execution.
pub struct TaskStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    cancelled: Arc<AtomicBool>,
    teardown: Option<Teardown>,
}

impl<T> std::fmt::Debug for TaskStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStream")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("has_teardown", &self.teardown.is_some())
            .finish()
    }
}

impl<T: Send + 'static> TaskStream<T> {
    /// Creates a connected emitter/stream pair.
    pub fn channel() -> (Emitter<T>, TaskStream<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        (
            Emitter {
                sender,
                cancelled: Arc::clone(&cancelled),
            },
            TaskStream {
                receiver,
                cancelled,
                teardown: None,
            },
        )
    }

    /// A stream that yields the output of `future` once and then completes.
    /// Unsubscribing early aborts the future.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let (emitter, stream) = Self::channel();
        let handle = tokio::spawn(async move {
            let value = future.await;
            emitter.emit(value);
        });
        stream.on_teardown(move || handle.abort())
    }

    /// A stream that yields `value` and completes.
    pub fn once(value: T) -> Self {
        let (emitter, stream) = Self::channel();
        emitter.emit(value);
        drop(emitter);
        stream
    }
}

impl<T> TaskStream<T> {
    /// Registers the callback run when the subscription ends. A previously
    /// registered callback is chained before the new one.
    pub fn on_teardown<F>(mut self, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.teardown = Some(match self.teardown.take() {
            Some(previous) => Box::new(move || {
                previous();
                teardown();
            }),
            None => Box::new(teardown),
        });
        self
    }

    /// Waits for the next value; `None` once every emitter is dropped.
    pub async fn next(&mut self) -> Option<T> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        self.receiver.recv().await
    }

    /// Ends the subscription and runs teardown.
    pub fn unsubscribe(mut self) {
        self.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.receiver.close();
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl<T> Drop for TaskStream<T> {
    fn drop(&mut self) {
        self.close();
    }
}
