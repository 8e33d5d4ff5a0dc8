//! Hard backstop copy for sources and sinks that ignore cancellation.
//!
//! # Abandonment
//! When the deadline wins the race the worker task is detached, not aborted.
//! Its pending read or write keeps running until it completes or the
//! underlying I/O fails on its own, and whatever it produces is discarded.
//! Callers that copy from sockets or pipes should close them after a
//! timeout to release the worker.

use std::io;
use std::panic;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::error::TransferError;
use crate::observability::metrics;
use crate::stream::copy::{bounded_copy, TransferResult, TransferSide, CHUNK_SIZE};
use crate::stream::Deadline;

/// Copy `src` into `dst` on a separate task, giving up if a single chunk on
/// `side` stalls for longer than `timeout`.
///
/// Exactly one outcome is returned:
/// - the worker's own result, verbatim, if it finishes first;
/// - `written == 0` with [`TransferError::Timeout`] if the deadline fires
///   first (the worker is abandoned, see the module docs);
/// - a panic inside the worker is resumed on the calling task.
pub async fn watchdog_copy<W, R>(
    dst: W,
    src: R,
    timeout: Duration,
    side: TransferSide,
) -> TransferResult
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Send + 'static,
{
    let expired = CancellationToken::new();
    let deadline = Deadline::new({
        let expired = expired.clone();
        move || expired.cancel()
    });

    let mut worker = tokio::spawn({
        let deadline = deadline.clone();
        async move {
            let mut dst = dst;
            let src = ReaderStream::with_capacity(src, CHUNK_SIZE);
            bounded_copy(&mut dst, src, &deadline, timeout, side).await
        }
    });

    tokio::select! {
        joined = &mut worker => {
            deadline.stop();
            match joined {
                Ok(result) => {
                    metrics::record_transfer(side, result.written);
                    result
                }
                Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
                Err(err) => TransferResult::failed(0, TransferError::Io(io::Error::other(err))),
            }
        }
        () = expired.cancelled() => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                side = %side,
                "Copy timed out, abandoning worker"
            );
            metrics::record_timeout("watchdog");
            TransferResult::timed_out()
        }
    }
}
