//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! stream/ and http/ produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself; the binary does
//! - Per-chunk events are trace level only

pub mod logging;
pub mod metrics;
