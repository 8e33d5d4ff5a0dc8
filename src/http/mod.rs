//! HTTP request execution subsystem.
//!
//! # Data Flow
//! ```text
//! caller body (Body)
//!     → request.rs (build, modifier, arm deadline)
//!     → Transport::perform
//!     → request.rs (copy response body into sink, bounded on read)
//!     → response.rs (Content-Length check)
//!     → Response<()> or RequestError
//! ```

pub mod body;
pub mod options;
pub mod request;
pub mod response;

pub use body::{Body, BoxStream};
pub use options::{RequestModifier, RequestOptions};
pub use request::{append_query_pair, do_request, X_REQUEST_ID};
pub use response::{declared_length, verify_length};
