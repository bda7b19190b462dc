use serde::Serialize;

use scorelens_core::config::SessionConfig;
use scorelens_core::{ErrorRecord, PageQuery, PageSize, Percentile, ScoredRow};
use scorelens_view::{ColumnSpec, RangeState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Committed vs. in-progress percentile and the threshold the service
/// derived from the committed one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdState {
    pub committed: Percentile,
    pub draft: Percentile,
    pub value: Option<f64>,
}

impl ThresholdState {
    pub fn new(percentile: Percentile) -> Self {
        Self {
            committed: percentile,
            draft: percentile,
            value: None,
        }
    }

    /// Draft differs from what the current rows were scored with.
    pub fn is_dirty(&self) -> bool {
        self.draft != self.committed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchKind {
    /// Page 1 of a newly selected file.
    Initial,
    Navigate,
    /// Page 1 re-scored with a new percentile.
    ThresholdCommit,
}

/// Everything needed to replay a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FetchRequest {
    pub query: PageQuery,
    pub kind: FetchKind,
}

/// Presentation-facing session state. Owned by the controller; readers get
/// clones through `SessionController::snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    pub file_name: Option<String>,
    /// 1-based page currently shown.
    pub page: u32,
    pub page_size: PageSize,
    pub rows: Vec<ScoredRow>,
    pub total_rows: u64,
    pub total_pages: u32,
    /// Frozen after the first non-empty page of a file.
    pub columns: Option<Vec<ColumnSpec>>,
    pub range: RangeState,
    pub threshold: ThresholdState,
    pub upload_progress: Option<u8>,
    pub last_error: Option<ErrorRecord>,
    pub failed_request: Option<FetchRequest>,
}

impl SessionState {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            phase: Phase::Idle,
            file_name: None,
            page: 1,
            page_size: config.default_page_size,
            rows: Vec::new(),
            total_rows: 0,
            total_pages: 0,
            columns: None,
            range: RangeState::default(),
            threshold: ThresholdState::new(config.default_percentile),
            upload_progress: None,
            last_error: None,
            failed_request: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
