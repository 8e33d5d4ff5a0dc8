//! Transport abstraction.
//!
//! # Data Flow
//! ```text
//! do_request
//!     → Transport::perform(Request<Body>)
//!     → Response<Body> (head plus streaming body)
//! ```
//!
//! # Design Decisions
//! - The transport only moves a request and hands back the response head
//!   with an unread body; timeouts and validation stay in the executor
//! - Faults before the response head are boxed so any client can plug in

use std::future::Future;
use std::sync::Arc;

use http::{Request, Response};

use crate::error::BoxError;
use crate::http::Body;

pub mod hyper;

pub use self::hyper::HyperTransport;

/// Sends one request and resolves once the response head has arrived.
pub trait Transport: Send + Sync {
    fn perform(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn perform(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send {
        (**self).perform(request)
    }
}
