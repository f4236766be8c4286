//! Ctrl-C handling: the first interrupt stops the run gracefully, the second
//! one ends the process

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Stream yielding once per Ctrl-C
pub fn ctrl_c_stream() -> impl Stream<Item = ()> {
    futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    })
}

/// Cancel `cancel` on the first interrupt and return `true` on the second.
///
/// Returns `false` if the stream ends before a second interrupt arrives.
pub async fn watch<S>(interrupts: S, cancel: CancellationToken) -> bool
where
    S: Stream<Item = ()>,
{
    futures::pin_mut!(interrupts);

    if interrupts.next().await.is_none() {
        return false;
    }
    warn!("Interrupt received, reporting the results collected so far (Ctrl-C again to quit)");
    cancel.cancel();

    if interrupts.next().await.is_none() {
        return false;
    }
    warn!("Second interrupt received, exiting");
    true
}
