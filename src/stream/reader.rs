//! Chunk-timeout decorator for byte sources.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use tokio::io::{AsyncRead, ReadBuf};

use crate::stream::Deadline;

/// Wraps a byte source so that the deadline measures the gap between reads
/// rather than the total transfer time.
///
/// Every poll stops the deadline, delegates to the inner source and then
/// re-arms the deadline for the full timeout, whatever the outcome. A source
/// that is not ready leaves the deadline running while the task waits, so a
/// stalled source trips it.
///
/// The owner supplies the fire callback and must arm the deadline before the
/// first read; otherwise the first chunk is unbounded.
#[derive(Debug)]
pub struct ChunkTimeoutReader<R> {
    inner: R,
    deadline: Deadline,
    timeout: Duration,
}

impl<R> ChunkTimeoutReader<R> {
    pub fn new(inner: R, deadline: Deadline, timeout: Duration) -> Self {
        Self {
            inner,
            deadline,
            timeout,
        }
    }

    fn around<T>(&mut self, poll: impl FnOnce(&mut R) -> T) -> T {
        self.deadline.stop();
        let out = poll(&mut self.inner);
        self.deadline.reset(self.timeout);
        out
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ChunkTimeoutReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut()
            .around(|inner| Pin::new(inner).poll_read(cx, buf))
    }
}

impl<S: Stream + Unpin> Stream for ChunkTimeoutReader<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        self.get_mut()
            .around(|inner| Pin::new(inner).poll_next(cx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
