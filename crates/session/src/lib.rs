//! Result-browsing session: the state machine between the scoring client
//! and the presentation layer.
//!
//! This crate provides:
//! - `SessionController`, which owns the state and applies fetch results
//! - `Debouncer`, the cancelable deadline behind percentile commits
//! - `SessionState` and friends, the snapshot handed to renderers

pub mod controller;
pub mod debounce;
pub mod state;

pub use controller::{SessionController, SessionError, SessionEvent};
pub use debounce::Debouncer;
pub use state::{FetchKind, FetchRequest, Phase, SessionState, ThresholdState};
