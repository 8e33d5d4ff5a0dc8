//! Plain-HTTP transport on the hyper-util legacy client.

use std::io;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::header::{InvalidHeaderValue, USER_AGENT};
use http::{HeaderValue, Request, Response};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TransportConfig;
use crate::error::BoxError;
use crate::http::Body;
use crate::transport::Transport;

const DEFAULT_USER_AGENT: &str = concat!("stream-http/", env!("CARGO_PKG_VERSION"));

/// Pooled HTTP/1.1 client. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HyperTransport {
    client: Client<HttpConnector, UnsyncBoxBody<Bytes, io::Error>>,
    user_agent: HeaderValue,
}

impl HyperTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, InvalidHeaderValue> {
        let user_agent = HeaderValue::from_str(&config.user_agent)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.connect_timeout()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, user_agent })
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

impl Transport for HyperTransport {
    fn perform(
        &self,
        request: Request<Body>,
    ) -> impl std::future::Future<Output = Result<Response<Body>, BoxError>> + Send {
        let (mut parts, body) = request.into_parts();
        parts
            .headers
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());

        let pending = self
            .client
            .request(Request::from_parts(parts, body.into_http_body()));

        async move {
            let response = pending.await?;
            Ok(response.map(|incoming| {
                Body::from_stream(incoming.into_data_stream().map_err(io::Error::other))
            }))
        }
    }
}
