//! Generation session engine for Promptbench.
//!
//! Drives one streamed generation end to end: request validation, the
//! `Requesting → Streaming → terminal` state machine, per-fragment update
//! callbacks for live rendering, cooperative cancellation, and the derived
//! throughput metrics shown in the UI.
//!
//! The engine knows nothing about rendering. The UI layer passes an update
//! observer in and receives a [`SessionOutcome`] back; everything else is its
//! concern.

pub mod error;
pub mod metrics;
pub mod request;
pub mod session;

pub use error::{EngineError, Result};
pub use metrics::{SessionMetrics, rate_per_second};
pub use request::GenerationRequest;
pub use session::{GenerationSession, SessionOutcome, SessionState, SessionUpdate};
