//! Timeout-bounded streaming subsystem.
//!
//! # Data Flow
//! ```text
//! Cooperative path (do_request):
//!     Deadline (fire → cancel token)
//!     → reader.rs wraps the upload body, re-arming per poll
//!     → cancel.rs makes body streams fail once the token fires
//!     → copy.rs bounds the read side of the response copy
//!
//! Non-cooperative path (watchdog_copy):
//!     Deadline (fire → local token)
//!     → watchdog.rs spawns copy.rs on a worker task
//!     → select! { worker result | deadline fired }
//! ```
//!
//! # Design Decisions
//! - The deadline measures inactivity per chunk, never total transfer time
//! - One deadline per copy, bounding exactly one side
//! - Timed-out watchdog workers are abandoned, not forcibly stopped

pub mod cancel;
pub mod copy;
pub mod deadline;
pub mod reader;
pub mod watchdog;

pub use cancel::CancelOnSignal;
pub use copy::{bounded_copy, TransferResult, TransferSide, CHUNK_SIZE};
pub use deadline::Deadline;
pub use reader::ChunkTimeoutReader;
pub use watchdog::watchdog_copy;
