//! # mindtrainer
//!
//! Trial engine for the Mind Trainer cognitive-training app: the n-back
//! difficulty mapper, the biased stimulus-sequence generator, and the timed
//! trial/response state machine, plus in-memory player progress.
//!
//! The engine is host-agnostic by construction. It never reads the wall
//! clock (every time-dependent call takes `now: Instant`) and randomness
//! comes from a seeded generator, so whole sessions replay deterministically
//! and the timing logic is testable without sleeping.
//!
//! ## Quick Start
//!
//! ```
//! use mindtrainer::prelude::*;
//!
//! let now = Instant::now();
//! let mut session = Session::start(1, 42, now);
//!
//! for event in session.poll(now) {
//!     if let SessionEvent::Presented { trial, cell } = event {
//!         // reveal `cell` to the player
//!         let _ = (trial, cell);
//!     }
//! }
//!
//! // Player says "match" for the current trial.
//! let _ = session.submit_response(true, now);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization for snapshots, events and summaries
//!
//! ## Modules
//!
//! - [`difficulty`]: level to parameter mapping (1-250)
//! - [`sequence`]: biased grid-cell sequence generation
//! - [`session`]: the trial presentation/response state machine
//! - [`progress`]: in-memory player progress and achievements

pub mod difficulty;
pub mod prng;
pub mod progress;
pub mod sequence;
pub mod session;
pub mod stats;

// WASM-safe monotonic time shim; the engine paces trials on wall-clock time
// supplied by the host.
pub mod time;

/// Prelude module for convenient imports.
///
/// ```
/// use mindtrainer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::difficulty::{DifficultyProfile, MAX_LEVEL, MIN_LEVEL};
    pub use crate::prng::Prng;
    pub use crate::progress::{Achievement, PlayerProgress};
    pub use crate::sequence::MATCH_BIAS;
    pub use crate::session::{
        Phase, Session, SessionEvent, SessionSnapshot, SessionSummary, TrialResult,
    };
    pub use crate::stats::TrialStats;
    pub use crate::time::{Duration, Instant};
}
