//! Background streaming execution for the (synchronous) UI thread.
//!
//! [`spawn_stream`] runs an [`ExecutionChannel::stream`] on its own thread
//! and hands back an [`ExecSubscription`] the UI polls each frame. The
//! subscription always ends with exactly one terminal event: if the worker
//! dies or is aborted without sending one, polling reports a synthetic
//! `Error("Connection lost")`.

use futures::future::{AbortHandle, Abortable};
use shared::events::ExecEvent;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::executor::ExecutionChannel;

pub const CONNECTION_LOST: &str = "Connection lost";

/// Handle to a running stream. Dropping it aborts the worker.
pub struct ExecSubscription {
    node_id: String,
    rx: Receiver<ExecEvent>,
    abort: AbortHandle,
    finished: bool,
}

impl ExecSubscription {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// True once a terminal event has been handed out.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next event without blocking.
    pub fn try_next(&mut self) -> Option<ExecEvent> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.lost()),
        }
    }

    /// Next event, waiting up to `timeout`.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<ExecEvent> {
        if self.finished {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.lost()),
        }
    }

    /// Everything available right now, in order.
    pub fn drain(&mut self) -> Vec<ExecEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    /// Stop the worker. The caller reports the cancellation itself.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    fn observe(&mut self, event: ExecEvent) -> ExecEvent {
        if event.is_terminal() {
            self.finished = true;
        }
        event
    }

    fn lost(&mut self) -> ExecEvent {
        warn!(node_id = %self.node_id, "execution stream ended without a result");
        self.finished = true;
        ExecEvent::error(CONNECTION_LOST)
    }
}

impl Drop for ExecSubscription {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Start streaming `command` for favorite `node_id` on a background thread.
pub fn spawn_stream(
    exec: Arc<dyn ExecutionChannel>,
    node_id: impl Into<String>,
    command: impl Into<String>,
    cwd: Option<PathBuf>,
) -> ExecSubscription {
    let node_id = node_id.into();
    let command = command.into();
    let (tx, rx) = channel();
    let (abort, abort_reg) = AbortHandle::new_pair();

    let worker_id = node_id.clone();
    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                let _ = tx.send(ExecEvent::error(format!(
                    "Failed to start async runtime: {}",
                    e
                )));
                return;
            }
        };

        rt.block_on(async move {
            let (sink, mut events) = tokio::sync::mpsc::unbounded_channel();
            let run = Abortable::new(
                async move {
                    let result = exec.stream(&command, cwd.as_deref(), &sink).await;
                    drop(sink);
                    result
                },
                abort_reg,
            );
            let forward_tx = tx.clone();
            let forward = async move {
                while let Some(event) = events.recv().await {
                    if forward_tx.send(event).is_err() {
                        break;
                    }
                }
            };

            let (result, ()) = tokio::join!(run, forward);
            match result {
                Ok(Ok(())) => debug!(node_id = %worker_id, "stream complete"),
                Ok(Err(e)) => {
                    let _ = tx.send(ExecEvent::error(format!("{:#}", e)));
                }
                Err(_aborted) => debug!(node_id = %worker_id, "stream aborted"),
            }
        });
    });

    ExecSubscription {
        node_id,
        rx,
        abort,
        finished: false,
    }
}
