//! Per-request options.

use std::fmt;
use std::time::Duration;

use http::Request;

use crate::http::Body;

/// Hook run on the built request before it is sent.
pub type RequestModifier = Box<dyn FnOnce(&mut Request<Body>) + Send>;

/// Options for a single [`do_request`](crate::http::do_request) call.
///
/// Later calls overwrite earlier ones; the default is "no modifier, no
/// deadline".
#[derive(Default)]
pub struct RequestOptions {
    modifier: Option<RequestModifier>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook applied after the request is built. It may change
    /// headers, the URI (query parameters) or the method.
    pub fn modifier<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut Request<Body>) + Send + 'static,
    {
        self.modifier = Some(Box::new(modifier));
        self
    }

    /// Set the per-chunk inactivity timeout. A zero duration disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn chunk_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }

    pub(crate) fn take_modifier(&mut self) -> Option<RequestModifier> {
        self.modifier.take()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("modifier", &self.modifier.as_ref().map(|_| ".."))
            .field("timeout", &self.timeout)
            .finish()
    }
}
