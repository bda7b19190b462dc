//! Client side of the remote anomaly-scoring service.
//!
//! This crate provides:
//! - `ScoreClient` trait for paginated scoring requests
//! - `HttpScoreClient`, a reqwest implementation with upload progress
//! - The typed error taxonomy of the service
//! - `UploadGate`, the pre-upload extension/size/schema check

pub mod client;
pub mod error;
pub mod gate;
pub mod http;
pub mod wire;

pub use client::{ProgressFn, ScoreClient};
pub use error::{ScoreError, ServiceError};
pub use gate::{UploadGate, ValidatedUpload, ValidationError};
pub use http::HttpScoreClient;
