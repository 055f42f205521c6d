//! Agent Host - runs favorite commands on behalf of the UI
//!
//! This crate provides:
//! - The [`ExecutionChannel`] seam with local and remote implementations
//! - Background streaming ([`spawn_stream`]) and one-shot tasks
//!   ([`BackgroundTask`]) that the UI polls each frame

pub mod executor;
pub mod remote;
pub mod sse;
pub mod stream;
pub mod task;

use shared::settings::{ExecutionBackend, ExecutionSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use executor::{combine_output, EventSink, ExecutionChannel, LocalExecutor, RunOutcome};
pub use remote::RemoteExecutor;
pub use stream::{spawn_stream, ExecSubscription, CONNECTION_LOST};
pub use task::BackgroundTask;

/// Build the channel the settings ask for.
pub fn channel_for(settings: &ExecutionSettings) -> Arc<dyn ExecutionChannel> {
    let timeout = Duration::from_secs(settings.timeout_secs.max(1));
    match settings.backend {
        ExecutionBackend::Local => {
            info!("running favorites locally");
            Arc::new(LocalExecutor::new(timeout))
        }
        ExecutionBackend::Remote => {
            info!(server = %settings.server_url, "running favorites on command server");
            Arc::new(RemoteExecutor::new(settings.server_url.clone(), timeout))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use shared::events::ExecEvent;

    #[test]
    fn test_local_channel_streams_through_subscription() {
        let channel = channel_for(&ExecutionSettings::default());
        let mut sub = spawn_stream(channel, "n1", "printf 'a\\nb\\n'", None);
        let mut events = Vec::new();
        while let Some(ev) = sub.next_timeout(Duration::from_secs(10)) {
            events.push(ev);
            if sub.is_finished() {
                break;
            }
        }
        assert_eq!(
            events,
            vec![
                ExecEvent::output("a\n"),
                ExecEvent::output("b\n"),
                ExecEvent::Done { exit_code: 0 }
            ]
        );
    }
}
