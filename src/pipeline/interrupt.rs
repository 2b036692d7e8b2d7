// src/pipeline/interrupt.rs

//! Interrupt handling for a running crawl.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// Exit status used when a second interrupt aborts the process.
pub const FORCED_EXIT_CODE: i32 = 130;

/// React to interrupt signals until the stream ends.
///
/// The first signal cancels `cancel` so the session can flush and close the
/// browser. A second signal calls `force_exit` without waiting for that.
pub async fn watch_interrupts<S, F>(mut signals: S, cancel: CancellationToken, force_exit: F)
where
    S: Stream<Item = ()> + Unpin,
    F: FnOnce(),
{
    if signals.next().await.is_none() {
        return;
    }
    log::warn!("Interrupt received, finishing current step (interrupt again to exit now)...");
    cancel.cancel();

    if signals.next().await.is_some() {
        log::warn!("Second interrupt received, exiting without final flush");
        force_exit();
    }
}
