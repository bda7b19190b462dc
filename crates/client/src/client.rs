use std::sync::Arc;

use async_trait::async_trait;

use scorelens_core::{PageQuery, PageResult, UploadFile};

use crate::error::ScoreError;

/// Upload progress callback, called with 0..=100 while the file body is sent.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Requests one page of anomaly scores for an uploaded file.
///
/// Implementations only perform the network call; they never touch
/// session state.
#[async_trait]
pub trait ScoreClient: Send + Sync {
    async fn score_page(
        &self,
        file: &UploadFile,
        query: &PageQuery,
        progress: Option<ProgressFn>,
    ) -> Result<PageResult, ScoreError>;
}
