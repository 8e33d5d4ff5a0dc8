//! Chunked copy loop with a per-chunk deadline on one side.

use std::fmt;
use std::io;
use std::pin::pin;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::TransferError;
use crate::stream::Deadline;

/// Largest slice moved by a single read or write.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Which half of a copy the chunk deadline bounds.
///
/// Only one side can be bounded per copy: the loop shares a single deadline
/// between both halves and arms it around exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferSide {
    Read,
    Write,
}

impl TransferSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferSide::Read => "read",
            TransferSide::Write => "write",
        }
    }
}

impl fmt::Display for TransferSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown transfer side {0:?}, expected \"read\" or \"write\"")]
pub struct ParseSideError(String);

impl FromStr for TransferSide {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(TransferSide::Read),
            "write" => Ok(TransferSide::Write),
            _ => Err(ParseSideError(s.to_string())),
        }
    }
}

/// Outcome of a copy: bytes fully written plus the fault that stopped it.
///
/// `written` is kept on failure for diagnostics.
#[derive(Debug)]
#[must_use]
pub struct TransferResult {
    pub written: u64,
    pub error: Option<TransferError>,
}

impl TransferResult {
    pub(crate) fn completed(written: u64) -> Self {
        Self {
            written,
            error: None,
        }
    }

    pub(crate) fn failed(written: u64, error: impl Into<TransferError>) -> Self {
        Self {
            written,
            error: Some(error.into()),
        }
    }

    pub(crate) fn timed_out() -> Self {
        Self::failed(0, TransferError::Timeout)
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<u64, TransferError> {
        match self.error {
            None => Ok(self.written),
            Some(err) => Err(err),
        }
    }
}

struct ChunkBound<'a> {
    deadline: &'a Deadline,
    timeout: Duration,
    side: TransferSide,
}

impl ChunkBound<'_> {
    fn enter(bound: Option<&Self>, side: TransferSide) {
        if let Some(bound) = bound.filter(|b| b.side == side) {
            bound.deadline.reset(bound.timeout);
        }
    }

    fn leave(bound: Option<&Self>, side: TransferSide) {
        if let Some(bound) = bound.filter(|b| b.side == side) {
            bound.deadline.stop();
        }
    }
}

/// Copy `src` into `dst`, arming `deadline` around every operation on `side`.
///
/// The deadline is reset before and stopped after each bounded read or
/// write, so it only fires when a single chunk stalls for longer than
/// `timeout`. What firing does is up to the deadline's owner.
///
/// Source items larger than [`CHUNK_SIZE`] are written in several chunks; an
/// empty item is treated as "no data yet" and skipped.
pub async fn bounded_copy<W, S>(
    dst: &mut W,
    src: S,
    deadline: &Deadline,
    timeout: Duration,
    side: TransferSide,
) -> TransferResult
where
    W: AsyncWrite + Unpin + ?Sized,
    S: Stream<Item = io::Result<Bytes>>,
{
    let bound = ChunkBound {
        deadline,
        timeout,
        side,
    };
    copy_chunks(dst, src, Some(&bound)).await
}

/// Copy without any deadline.
pub(crate) async fn unbounded_copy<W, S>(dst: &mut W, src: S) -> TransferResult
where
    W: AsyncWrite + Unpin + ?Sized,
    S: Stream<Item = io::Result<Bytes>>,
{
    copy_chunks(dst, src, None).await
}

async fn copy_chunks<W, S>(dst: &mut W, src: S, bound: Option<&ChunkBound<'_>>) -> TransferResult
where
    W: AsyncWrite + Unpin + ?Sized,
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut src = pin!(src);
    let mut pending = Bytes::new();
    let mut written: u64 = 0;

    loop {
        if pending.is_empty() {
            ChunkBound::enter(bound, TransferSide::Read);
            let next = src.next().await;
            ChunkBound::leave(bound, TransferSide::Read);

            match next {
                None => break,
                Some(Err(err)) => return TransferResult::failed(written, err),
                Some(Ok(chunk)) => pending = chunk,
            }
            if pending.is_empty() {
                continue;
            }
        }

        let chunk = pending.split_to(pending.len().min(CHUNK_SIZE));
        ChunkBound::enter(bound, TransferSide::Write);
        let result = write_chunk(dst, &chunk).await;
        ChunkBound::leave(bound, TransferSide::Write);

        match result {
            Err(err) => return TransferResult::failed(written, err),
            Ok(()) => written += chunk.len() as u64,
        }
    }

    ChunkBound::enter(bound, TransferSide::Write);
    let flushed = dst.flush().await;
    ChunkBound::leave(bound, TransferSide::Write);
    if let Err(err) = flushed {
        return TransferResult::failed(written, err);
    }

    TransferResult::completed(written)
}

/// Write all of `chunk`. Partial writes are progress; a sink that accepts
/// nothing is a short write.
async fn write_chunk<W>(dst: &mut W, chunk: &[u8]) -> Result<(), TransferError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut rest = chunk;
    while !rest.is_empty() {
        match dst.write(rest).await? {
            0 => {
                tracing::trace!(
                    offered = chunk.len(),
                    accepted = chunk.len() - rest.len(),
                    "Short write"
                );
                return Err(TransferError::ShortWrite);
            }
            n => rest = &rest[n..],
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    fn chunks(sizes: &[usize]) -> impl Stream<Item = io::Result<Bytes>> {
        let items: Vec<io::Result<Bytes>> = sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| Ok(Bytes::from(vec![i as u8; n])))
            .collect();
        stream::iter(items)
    }

    fn idle_deadline() -> (Arc<AtomicUsize>, Deadline) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let deadline = Deadline::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (fired, deadline)
    }

    /// Accepts at most `limit` bytes per write (0: no cap), and nothing from
    /// the `nth` write on (0: never).
    struct ShortSink {
        writes: usize,
        nth: usize,
        limit: usize,
        data: Vec<u8>,
    }

    impl AsyncWrite for ShortSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.writes += 1;
            let n = if self.nth != 0 && self.writes >= self.nth {
                0
            } else if self.limit != 0 {
                buf.len().min(self.limit)
            } else {
                buf.len()
            };
            self.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn copies_all_bytes_for_any_chunk_size() {
        for sizes in [
            vec![1],
            vec![CHUNK_SIZE],
            vec![17, 4096, 1, CHUNK_SIZE, 333],
            vec![CHUNK_SIZE - 1; 5],
        ] {
            let expected: usize = sizes.iter().sum();
            let (fired, deadline) = idle_deadline();
            let mut sink: Vec<u8> = Vec::new();

            let result = bounded_copy(
                &mut sink,
                chunks(&sizes),
                &deadline,
                Duration::from_secs(1),
                TransferSide::Read,
            )
            .await;

            assert!(result.is_ok(), "sizes {:?}: {:?}", sizes, result.error);
            assert_eq!(result.written, expected as u64);
            assert_eq!(sink.len(), expected);
            assert_eq!(fired.load(Ordering::SeqCst), 0);
            assert!(!deadline.is_armed());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_chunk_is_not_end_of_data() {
        let (_fired, deadline) = idle_deadline();
        let mut sink: Vec<u8> = Vec::new();

        let result = bounded_copy(
            &mut sink,
            chunks(&[1000, 0, 500]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Write,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(result.written, 1500);
        assert_eq!(sink.len(), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_item_is_split_into_chunks() {
        let (_fired, deadline) = idle_deadline();
        let mut sink = ShortSink {
            writes: 0,
            nth: 0,
            limit: 0,
            data: Vec::new(),
        };

        let result = bounded_copy(
            &mut sink,
            chunks(&[CHUNK_SIZE * 2 + 10]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Write,
        )
        .await;

        assert_eq!(result.written, (CHUNK_SIZE * 2 + 10) as u64);
        assert_eq!(sink.writes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn short_write_stops_copy() {
        let (_fired, deadline) = idle_deadline();
        let mut sink = ShortSink {
            writes: 0,
            nth: 3,
            limit: 0,
            data: Vec::new(),
        };

        let result = bounded_copy(
            &mut sink,
            chunks(&[100, 200, 300, 400]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Read,
        )
        .await;

        assert!(matches!(result.error, Some(TransferError::ShortWrite)));
        assert_eq!(result.written, 300);
        assert_eq!(sink.writes, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_writes_complete_the_chunk() {
        let (fired, deadline) = idle_deadline();
        let mut sink = ShortSink {
            writes: 0,
            nth: 0,
            limit: 1000,
            data: Vec::new(),
        };

        let result = bounded_copy(
            &mut sink,
            chunks(&[CHUNK_SIZE, 2500]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Write,
        )
        .await;

        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.written, (CHUNK_SIZE + 2500) as u64);
        assert_eq!(sink.data.len(), CHUNK_SIZE + 2500);
        assert_eq!(sink.writes, CHUNK_SIZE.div_ceil(1000) + 3);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_chunk_is_not_counted_on_short_write() {
        let (_fired, deadline) = idle_deadline();
        let mut sink = ShortSink {
            writes: 0,
            nth: 4,
            limit: 10,
            data: Vec::new(),
        };

        let result = bounded_copy(
            &mut sink,
            chunks(&[10, 25]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Write,
        )
        .await;

        assert!(matches!(result.error, Some(TransferError::ShortWrite)));
        assert_eq!(result.written, 10);
        assert_eq!(sink.data.len(), 30);
    }

    #[tokio::test]
    async fn bounded_pipe_sink_accepts_everything() {
        use tokio::io::AsyncReadExt;

        let (_fired, deadline) = idle_deadline();
        let (mut sink, mut drain) = tokio::io::duplex(1024);
        let reader = tokio::spawn(async move {
            let mut out = Vec::new();
            drain.read_to_end(&mut out).await.unwrap();
            out
        });

        let result = bounded_copy(
            &mut sink,
            chunks(&[10_000, 3]),
            &deadline,
            Duration::from_secs(2),
            TransferSide::Write,
        )
        .await;
        drop(sink);

        assert!(result.is_ok(), "{:?}", result.error);
        assert_eq!(result.written, 10_003);
        assert_eq!(reader.await.unwrap().len(), 10_003);
    }

    #[tokio::test(start_paused = true)]
    async fn read_error_is_returned_as_is() {
        let (_fired, deadline) = idle_deadline();
        let src = stream::iter(vec![
            Ok(Bytes::from_static(b"hello")),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
            Ok(Bytes::from_static(b"never")),
        ]);
        let mut sink: Vec<u8> = Vec::new();

        let result =
            bounded_copy(&mut sink, src, &deadline, Duration::from_secs(1), TransferSide::Read).await;

        assert_eq!(result.written, 5);
        match result.error {
            Some(TransferError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(sink, b"hello");
    }

    #[tokio::test(start_paused = true)]
    async fn write_error_is_returned_as_is() {
        let (_fired, deadline) = idle_deadline();
        let mut sink = tokio_test::io::Builder::new()
            .write(b"abc")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();

        let result = bounded_copy(
            &mut sink,
            stream::iter(vec![Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"def"))]),
            &deadline,
            Duration::from_secs(1),
            TransferSide::Write,
        )
        .await;

        assert_eq!(result.written, 3);
        assert!(matches!(result.error, Some(TransferError::Io(ref e)) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_but_steady_source_never_fires() {
        let (fired, deadline) = idle_deadline();
        let src = stream::iter(0..50u8).then(|i| async move {
            tokio::time::sleep(Duration::from_millis(90)).await;
            Ok(Bytes::from(vec![i; 10]))
        });
        let mut sink: Vec<u8> = Vec::new();

        let result = bounded_copy(
            &mut sink,
            src,
            &deadline,
            Duration::from_millis(100),
            TransferSide::Read,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(result.written, 500);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_read_fires_deadline() {
        let (fired, deadline) = idle_deadline();
        let src = stream::iter(vec![10u64, 300]).then(|delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Bytes::from_static(b"x"))
        });
        let mut sink: Vec<u8> = Vec::new();

        let result = bounded_copy(
            &mut sink,
            src,
            &deadline,
            Duration::from_millis(100),
            TransferSide::Read,
        )
        .await;

        // Nothing observes the fire here, so the copy still completes.
        assert_eq!(result.written, 2);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("READ".parse::<TransferSide>().unwrap(), TransferSide::Read);
        assert_eq!("write".parse::<TransferSide>().unwrap(), TransferSide::Write);
        assert!("both".parse::<TransferSide>().is_err());
        assert_eq!(TransferSide::Write.to_string(), "write");
    }
}
