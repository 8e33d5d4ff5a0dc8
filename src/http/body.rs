//! Streaming request and response bodies.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::stream::{CancelOnSignal, ChunkTimeoutReader, Deadline, CHUNK_SIZE};

/// Owned, sendable stream of `T`.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A body made of byte chunks.
///
/// Bodies are consumed once, as a [`Stream`] of `io::Result<Bytes>`.
/// In-memory bodies are never cut off by a deadline since they cannot
/// stall; streamed bodies can be wrapped to observe one.
#[derive(Default)]
pub struct Body {
    kind: Kind,
}

#[derive(Default)]
enum Kind {
    #[default]
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Body backed by an arbitrary chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            kind: Kind::Stream(Box::pin(stream)),
        }
    }

    /// Body read from `reader` in chunks of at most [`CHUNK_SIZE`] bytes.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_stream(ReaderStream::with_capacity(reader, CHUNK_SIZE))
    }

    pub(crate) fn with_chunk_timeout(self, deadline: Deadline, timeout: Duration) -> Self {
        match self.kind {
            Kind::Stream(stream) => {
                Self::from_stream(ChunkTimeoutReader::new(stream, deadline, timeout))
            }
            kind => Self { kind },
        }
    }

    pub(crate) fn cancel_on(self, token: &CancellationToken) -> Self {
        match self.kind {
            Kind::Stream(stream) => Self::from_stream(CancelOnSignal::new(stream, token.clone())),
            kind => Self { kind },
        }
    }

    /// Convert into an `http_body::Body` for hyper.
    pub fn into_http_body(self) -> UnsyncBoxBody<Bytes, io::Error> {
        match self.kind {
            Kind::Empty => Empty::<Bytes>::new()
                .map_err(|never| -> io::Error { match never {} })
                .boxed_unsync(),
            Kind::Full(bytes) => Full::new(bytes)
                .map_err(|never| -> io::Error { match never {} })
                .boxed_unsync(),
            Kind::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        }
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Kind::Stream(stream) = &mut this.kind {
            return stream.as_mut().poll_next(cx);
        }
        match std::mem::take(&mut this.kind) {
            Kind::Full(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(bytes))),
            _ => Poll::Ready(None),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.kind {
            Kind::Empty => (0, Some(0)),
            Kind::Full(bytes) => {
                let n = usize::from(!bytes.is_empty());
                (n, Some(n))
            }
            Kind::Stream(stream) => stream.size_hint(),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body(Empty)"),
            Kind::Full(bytes) => write!(f, "Body(Full, {} bytes)", bytes.len()),
            Kind::Stream(_) => f.write_str("Body(Streaming)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}
