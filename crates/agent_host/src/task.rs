//! One-shot background work (health checks, run-to-completion) for the UI.
//!
//! Same shape as [`crate::spawn_stream`]: the future runs on its own thread
//! with its own runtime and the UI polls for the single result each frame.

use std::future::Future;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;
use tracing::{debug, warn};

/// Pending result of a future running on a background thread.
pub struct BackgroundTask<T> {
    rx: Receiver<Result<T, String>>,
    done: bool,
}

impl<T: Send + 'static> BackgroundTask<T> {
    pub fn spawn<F>(name: &'static str, work: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (tx, rx) = channel();
        thread::spawn(move || {
            let result = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(work).map_err(|e| format!("{:#}", e)),
                Err(e) => Err(format!("Failed to start async runtime: {}", e)),
            };
            debug!(task = name, ok = result.is_ok(), "background task finished");
            let _ = tx.send(result);
        });
        Self { rx, done: false }
    }

    /// The result once it is ready. Yields exactly once.
    pub fn try_take(&mut self) -> Option<Result<T, String>> {
        if self.done {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.done = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("background task ended without a result");
                self.done = true;
                Some(Err("Background task ended without a result".to_string()))
            }
        }
    }
}
