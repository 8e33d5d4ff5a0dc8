//! Error types for streaming transfers and request execution.
//!
//! # Design Decisions
//! - Transfer faults and request faults are separate enums; a request fault
//!   wraps a transfer fault when the response head already arrived
//! - Nothing here is retried; every fault goes straight back to the caller
//! - Cancellation is carried through `io::Error` as a [`Canceled`] payload so
//!   that body streams can report it without a custom error type

use std::io;
use std::num::ParseIntError;

use http::Response;
use thiserror::Error;

/// Boxed error returned by transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Payload placed inside an `io::Error` when a body stream observes a
/// cancelled token.
#[derive(Debug, Clone, Copy, Error)]
#[error("operation canceled")]
pub struct Canceled;

impl Canceled {
    /// Wrap into an `io::Error` suitable for returning from a stream or reader.
    pub fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

/// Faults produced while moving bytes from a source to a sink.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The sink accepted fewer bytes than it was offered.
    #[error("short write")]
    ShortWrite,

    /// The watchdog deadline fired before the copy finished.
    #[error("copy timeout")]
    Timeout,

    /// The shared cancellation token fired while the transfer was blocked.
    #[error("transfer canceled")]
    Canceled,

    /// The declared Content-Length does not match what was copied.
    #[error("unexpected EOF: declared content length {declared}, copied {copied}")]
    LengthMismatch { declared: u64, copied: u64 },

    /// The declared Content-Length is not a non-negative integer.
    #[error("invalid content length {value:?}")]
    LengthParse {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error(transparent)]
    Io(io::Error),
}

impl TransferError {
    /// Whether this fault came from a deadline, either the watchdog timer or
    /// the cooperative cancellation it triggers.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout | TransferError::Canceled)
    }
}

impl From<io::Error> for TransferError {
    fn from(err: io::Error) -> Self {
        let canceled = err
            .get_ref()
            .is_some_and(|inner| inner.is::<Canceled>());
        if canceled {
            TransferError::Canceled
        } else {
            TransferError::Io(err)
        }
    }
}

/// Faults produced by [`do_request`](crate::http::do_request).
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be constructed (bad method or target).
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    /// The transport failed before a response head arrived.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The request was canceled before the transport returned, either by the
    /// chunk deadline or by the caller's token.
    #[error("request canceled")]
    Canceled,

    /// The response head arrived but copying or validating its body failed.
    #[error("response body: {source}")]
    Body {
        response: Box<Response<()>>,
        #[source]
        source: TransferError,
    },
}

impl RequestError {
    pub(crate) fn body(response: Response<()>, source: TransferError) -> Self {
        RequestError::Body {
            response: Box::new(response),
            source,
        }
    }

    /// The response head, when one arrived before the fault.
    pub fn response(&self) -> Option<&Response<()>> {
        match self {
            RequestError::Body { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Whether the shared cancellation token ended this request.
    pub fn is_canceled(&self) -> bool {
        matches!(
            self,
            RequestError::Canceled
                | RequestError::Body {
                    source: TransferError::Canceled,
                    ..
                }
        )
    }
}
