//! Stream HTTP request and response bodies with per-chunk inactivity
//! timeouts.
//!
//! The timeout measures the gap between chunks, never the total transfer
//! time, so arbitrarily large bodies go through as long as data keeps
//! flowing.

pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod stream;
pub mod transport;

pub use crate::config::ClientConfig;
pub use crate::error::{RequestError, TransferError};
pub use crate::http::{do_request, Body, RequestOptions};
pub use crate::stream::{watchdog_copy, Deadline, TransferResult, TransferSide};
pub use crate::transport::{HyperTransport, Transport};
pub use tokio_util::sync::CancellationToken;
