//! Request execution with per-chunk inactivity timeouts.
//!
//! # Responsibilities
//! - Build the request and run the caller's modifier on it
//! - Arm one deadline that cancels the request when a chunk stalls
//! - Stream the response body into the caller's sink
//! - Check the copied length against a declared Content-Length
//!
//! # Design Decisions
//! - The deadline bounds the upload while the transport runs and the
//!   download while the body is copied, never both at once
//! - A fault after the response head arrived returns that head with it

use std::time::{Duration, Instant};

use http::header::HeaderName;
use http::uri::{PathAndQuery, Uri};
use http::{Method, Request, Response};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::error::{RequestError, TransferError};
use crate::http::response::verify_length;
use crate::http::{Body, RequestOptions};
use crate::observability::metrics;
use crate::stream::copy::unbounded_copy;
use crate::stream::{bounded_copy, Deadline, TransferSide};
use crate::transport::Transport;

/// Header carrying a per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Send a request and stream its response body into `response_body`.
///
/// With a positive timeout in `options`, a single deadline is armed at the
/// start. It is stopped while each upload chunk is produced and while the
/// transport is awaited past the last chunk; it is re-armed around every
/// read of the response body. When it fires, the request's child token is
/// cancelled and whatever is blocked fails with a cancellation.
///
/// The returned response carries the head only; its body has already been
/// written to `response_body`, or dropped unread when no sink was given. The
/// length check runs only when the body was copied and the method (after
/// the modifier) is not HEAD.
///
/// Cancelling `parent` cancels the request as well.
pub async fn do_request<T>(
    parent: &CancellationToken,
    transport: &T,
    method: Method,
    target: &str,
    request_body: Option<Body>,
    response_body: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    mut options: RequestOptions,
) -> Result<Response<()>, RequestError>
where
    T: Transport + ?Sized,
{
    let started = Instant::now();

    let ctx = parent.child_token();
    let _cancel_on_exit = ctx.clone().drop_guard();

    let bound = options.chunk_timeout().map(|timeout| {
        let fire = ctx.clone();
        let deadline = Deadline::after(timeout, move || {
            tracing::trace!("Chunk deadline fired, canceling request");
            metrics::record_timeout("chunk");
            fire.cancel();
        });
        (deadline, timeout)
    });

    let body = match (request_body, &bound) {
        (Some(body), Some((deadline, timeout))) => body.with_chunk_timeout(deadline.clone(), *timeout),
        (Some(body), None) => body,
        (None, _) => Body::empty(),
    };

    let mut request = Request::builder()
        .method(method)
        .uri(target)
        .body(body.cancel_on(&ctx))?;
    request.extensions_mut().insert(ctx.clone());
    if let Some(modifier) = options.take_modifier() {
        modifier(&mut request);
    }
    let method = request.method().clone();

    tracing::debug!(
        method = %method,
        uri = %request.uri(),
        timeout_ms = bound.as_ref().map(|(_, t)| t.as_millis() as u64),
        "Sending request"
    );

    let outcome = tokio::select! {
        biased;
        result = transport.perform(request) => Some(result),
        _ = ctx.cancelled() => None,
    };
    if let Some((deadline, _)) = &bound {
        deadline.stop();
    }

    let response = match outcome {
        Some(Ok(response)) => response,
        Some(Err(err)) if !ctx.is_cancelled() => {
            tracing::warn!(method = %method, error = %err, "Transport failed");
            return Err(RequestError::Transport(err));
        }
        _ => {
            tracing::warn!(method = %method, "Request canceled before response");
            return Err(RequestError::Canceled);
        }
    };

    let (parts, body) = response.into_parts();
    let head = Response::from_parts(parts, ());

    let result = match response_body {
        Some(sink) => {
            let body = body.cancel_on(&ctx);
            read_into(head, body, sink, bound.as_ref(), &method).await
        }
        None => Ok(head),
    };

    if let Some(status) = match &result {
        Ok(head) => Some(head.status()),
        Err(err) => err.response().map(Response::status),
    } {
        metrics::record_request(method.as_str(), status.as_u16(), started);
    }
    result
}

async fn read_into(
    head: Response<()>,
    body: Body,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
    bound: Option<&(Deadline, Duration)>,
    method: &Method,
) -> Result<Response<()>, RequestError> {
    let copied = match bound {
        Some((deadline, timeout)) => {
            bounded_copy(sink, body, deadline, *timeout, TransferSide::Read).await
        }
        None => unbounded_copy(sink, body).await,
    }
    .into_result();

    let checked = copied.and_then(|copied| {
        metrics::record_transfer(TransferSide::Read, copied);
        if method != Method::HEAD {
            verify_length(head.headers(), copied)?;
        }
        Ok::<_, TransferError>(copied)
    });

    match checked {
        Ok(copied) => {
            tracing::debug!(status = %head.status(), copied, "Response body copied");
            Ok(head)
        }
        Err(source) => {
            tracing::warn!(status = %head.status(), error = %source, "Response body failed");
            Err(RequestError::body(head, source))
        }
    }
}

/// Append `key=value` to the request's query string, form-encoded.
///
/// Meant for use inside a [`RequestOptions::modifier`].
pub fn append_query_pair<B>(
    request: &mut Request<B>,
    key: &str,
    value: &str,
) -> Result<(), http::Error> {
    let uri = request.uri();
    let query = form_urlencoded::Serializer::new(uri.query().unwrap_or_default().to_owned())
        .append_pair(key, value)
        .finish();
    let path_and_query: PathAndQuery = format!("{}?{}", uri.path(), query).parse()?;

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    *request.uri_mut() = Uri::from_parts(parts)?;
    Ok(())
}
