//! Shared transports and backends for integration tests.
#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use stream_http::error::BoxError;
use stream_http::{Body, Transport};

/// Echoes the request body back with an exact Content-Length. The request
/// method, URI and every `x-*` / `authorization` header come back as
/// `x-echo-*` response headers.
#[derive(Debug, Default)]
pub struct EchoTransport;

impl Transport for EchoTransport {
    fn perform(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send {
        async move {
            let (parts, mut body) = request.into_parts();

            let mut collected = BytesMut::new();
            while let Some(chunk) = body.next().await {
                collected.extend_from_slice(&chunk?);
            }

            let mut response = Response::builder()
                .status(StatusCode::OK)
                .header("content-length", collected.len())
                .header("x-echo-method", parts.method.as_str())
                .header("x-echo-uri", parts.uri.to_string());
            for (name, value) in &parts.headers {
                if name.as_str().starts_with("x-") || name == http::header::AUTHORIZATION {
                    response = response.header(format!("x-echo-{}", name), value);
                }
            }

            Ok(response.body(Body::from(collected.freeze()))?)
        }
    }
}

/// Replays a fixed response head followed by body chunks, each sent after
/// its own delay.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    status: StatusCode,
    headers: Vec<(&'static str, HeaderValue)>,
    chunks: Vec<(Duration, Bytes)>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, HeaderValue::from_static(value)));
        self
    }

    pub fn chunk(mut self, delay: Duration, data: &'static [u8]) -> Self {
        self.chunks.push((delay, Bytes::from_static(data)));
        self
    }
}

impl Transport for ScriptedTransport {
    fn perform(
        &self,
        _request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send {
        let script = self.clone();
        async move {
            let body = stream::iter(script.chunks).then(|(delay, data)| async move {
                tokio::time::sleep(delay).await;
                Ok::<_, io::Error>(data)
            });

            let mut response = Response::builder().status(script.status);
            for (name, value) in script.headers {
                response = response.header(name, value);
            }
            Ok(response.body(Body::from_stream(body))?)
        }
    }
}

/// Never produces a response head.
#[derive(Debug, Default)]
pub struct StallingTransport;

impl Transport for StallingTransport {
    fn perform(
        &self,
        _request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send {
        std::future::pending()
    }
}

/// Fails immediately, as a refused connection would.
#[derive(Debug, Default)]
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn perform(
        &self,
        _request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, BoxError>> + Send {
        async { Err(BoxError::from("connection refused")) }
    }
}

/// Body of `total` bytes split into `chunk` sized pieces, each delayed by
/// `gap`.
pub fn paced_body(total: usize, chunk: usize, gap: Duration) -> Body {
    let pieces: Vec<Bytes> = vec![7u8; total]
        .chunks(chunk)
        .map(Bytes::copy_from_slice)
        .collect();
    Body::from_stream(stream::iter(pieces).then(move |piece| async move {
        tokio::time::sleep(gap).await;
        Ok::<_, io::Error>(piece)
    }))
}

async fn echo(request: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = request.method().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let authorization = request.headers().get(http::header::AUTHORIZATION).cloned();

    let body = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return Ok(Response::builder()
                .status(StatusCode::BAD_REQUEST)
                .body(Full::new(Bytes::new()))
                .unwrap())
        }
    };

    let mut response = Response::builder()
        .header("x-echo-method", method)
        .header("x-echo-query", query);
    if let Some(value) = authorization {
        response = response.header("x-echo-authorization", value);
    }
    Ok(response.body(Full::new(body)).unwrap())
}

/// Start a hyper HTTP/1.1 echo server on an ephemeral port.
pub async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(socket), service_fn(echo))
                            .await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that sends a response head declaring `declared` bytes,
/// writes `sent` bytes of it and then holds the connection open.
pub async fn start_stalling_backend(declared: usize, sent: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n",
                            declared
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&vec![b'x'; sent]).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
