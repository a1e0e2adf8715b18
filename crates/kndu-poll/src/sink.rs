use std::fmt::Display;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the task that receives errors from the poll loop.
///
/// The first error cancels `stop` and is returned from the task; anything
/// queued after it is dropped. The task resolves to `None` once every sender
/// is gone without an error having been sent.
pub fn spawn_error_sink<E>(
    mut errors: mpsc::Receiver<E>,
    stop: CancellationToken,
) -> JoinHandle<Option<E>>
where
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        let first = errors.recv().await?;
        tracing::debug!(error = %first, "fatal error reported, stopping");
        stop.cancel();
        Some(first)
    })
}
