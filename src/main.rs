//! stream-http command line client.
//!
//! ```text
//! stream-http request http://host/path -X POST -d body.bin -o out.bin --timeout-ms 500
//! stream-http copy SRC DST --timeout-ms 1000 --side write
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use http::{HeaderName, HeaderValue, Method};
use tokio::fs::File;
use tokio::io::AsyncWrite;

use stream_http::config::{load_config, ClientConfig};
use stream_http::http::{append_query_pair, X_REQUEST_ID};
use stream_http::observability::logging::init_logging;
use stream_http::{
    do_request, watchdog_copy, Body, CancellationToken, HyperTransport, RequestOptions,
    TransferSide,
};

#[derive(Parser)]
#[command(name = "stream-http")]
#[command(about = "Stream HTTP bodies with per-chunk inactivity timeouts", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request, streaming the bodies from and to files
    Request(RequestArgs),
    /// Copy a file under a watchdog deadline
    Copy(CopyArgs),
}

#[derive(Args)]
struct RequestArgs {
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Extra header, as "Name: value"
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Extra query parameter, as "key=value"
    #[arg(long)]
    query: Vec<String>,

    /// Request body file, or "-" for stdin
    #[arg(short, long)]
    data: Option<String>,

    /// Response body file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-chunk timeout; 0 disables it
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args)]
struct CopyArgs {
    src: PathBuf,
    dst: PathBuf,

    /// Watchdog deadline for the whole copy; must be positive
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Side bounded by the deadline: read or write
    #[arg(long, default_value = "read")]
    side: TransferSide,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    init_logging(&config.observability);

    tracing::debug!(
        chunk_timeout_ms = config.timeouts.chunk_timeout_ms,
        copy_timeout_ms = config.timeouts.copy_timeout_ms,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Request(args) => run_request(&config, args).await,
        Commands::Copy(args) => run_copy(&config, args).await,
    }
}

async fn run_request(config: &ClientConfig, args: RequestArgs) -> Result<(), Box<dyn Error>> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let mut headers = vec![(X_REQUEST_ID, HeaderValue::from_str(&request_id)?)];
    for raw in &args.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header {raw:?} is not \"Name: value\""))?;
        headers.push((
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        ));
    }

    let mut query = Vec::with_capacity(args.query.len());
    for raw in &args.query {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("query {raw:?} is not \"key=value\""))?;
        query.push((key.to_string(), value.to_string()));
    }

    let request_body = match args.data.as_deref() {
        None => None,
        Some("-") => Some(Body::from_reader(tokio::io::stdin())),
        Some(path) => Some(Body::from_reader(File::open(path).await?)),
    };

    let mut sink: Box<dyn AsyncWrite + Send + Unpin> = match &args.output {
        Some(path) => Box::new(File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };

    let mut options = RequestOptions::new().modifier(move |request| {
        for (name, value) in headers {
            request.headers_mut().insert(name, value);
        }
        for (key, value) in &query {
            if let Err(err) = append_query_pair(request, key, value) {
                tracing::warn!(key = %key, error = %err, "Dropping query parameter");
            }
        }
    });
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .or_else(|| config.timeouts.chunk_timeout());
    if let Some(timeout) = timeout {
        options = options.timeout(timeout);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, canceling request");
                shutdown.cancel();
            }
        }
    });

    let transport = HyperTransport::new(&config.transport)?;
    let result = do_request(
        &shutdown,
        &transport,
        method,
        &args.url,
        request_body,
        Some(sink.as_mut()),
        options,
    )
    .await;

    match result {
        Ok(response) => {
            tracing::info!(request_id = %request_id, status = %response.status(), "Request complete");
            Ok(())
        }
        Err(err) => {
            if let Some(response) = err.response() {
                tracing::error!(request_id = %request_id, status = %response.status(), error = %err, "Request failed");
            } else {
                tracing::error!(request_id = %request_id, error = %err, "Request failed");
            }
            Err(err.into())
        }
    }
}

async fn run_copy(config: &ClientConfig, args: CopyArgs) -> Result<(), Box<dyn Error>> {
    let src = File::open(&args.src).await?;
    let dst = File::create(&args.dst).await?;
    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.timeouts.copy_timeout());

    let written = watchdog_copy(dst, src, timeout, args.side)
        .await
        .into_result()?;

    tracing::info!(
        src = %args.src.display(),
        dst = %args.dst.display(),
        written,
        "Copy complete"
    );
    Ok(())
}
