use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use scorelens_client::{ProgressFn, ScoreClient, ScoreError, ServiceError, ValidatedUpload};
use scorelens_core::config::SessionConfig;
use scorelens_core::{
    ErrorKind, ErrorRecord, PageQuery, PageResult, PageSize, Percentile, UploadFile,
};
use scorelens_view::{infer_columns, range, SchemaRules};

use crate::debounce::Debouncer;
use crate::state::{FetchKind, FetchRequest, Phase, SessionState};

/// Misuse of the controller API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("no file selected")]
    NoFile,

    #[error("page numbers start at 1")]
    InvalidPage,

    #[error("nothing to retry")]
    NothingToRetry,

    #[error("{0} errors cannot be fixed by retrying")]
    NotRetryable(ErrorKind),
}

/// What [`SessionController::next_event`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Upload progress of the latest fetch.
    Progress { percent: u8 },
    /// The latest fetch succeeded and its page is now shown.
    Applied { kind: FetchKind, page: u32 },
    /// The latest fetch failed; state kept everything it had.
    Failed(ErrorRecord),
    /// A superseded fetch finished and was dropped.
    StaleDiscarded { seq: u64 },
    /// The debounce window closed and the draft percentile went out.
    CommitDispatched { percentile: Percentile },
}

#[derive(Debug)]
enum FetchMessage {
    Progress {
        seq: u64,
        percent: u8,
    },
    Completed {
        seq: u64,
        request: FetchRequest,
        result: Result<PageResult, ScoreError>,
    },
}

enum Wake {
    Message(FetchMessage),
    Commit(Percentile),
}

/// Owns one result-browsing session.
///
/// Commands (`select_file`, `navigate`, `set_draft_percentile`, `retry`)
/// mutate state synchronously and may spawn a fetch. Results are applied
/// only inside [`next_event`](Self::next_event), so all mutation happens on
/// the task that owns the controller. Fetch spawning needs a tokio runtime.
pub struct SessionController {
    client: Arc<dyn ScoreClient>,
    config: SessionConfig,
    rules: SchemaRules,
    state: SessionState,
    file: Option<UploadFile>,
    seq: u64,
    in_flight: usize,
    tx: mpsc::UnboundedSender<FetchMessage>,
    rx: mpsc::UnboundedReceiver<FetchMessage>,
    debounce: Debouncer<Percentile>,
}

impl SessionController {
    pub fn new(client: Arc<dyn ScoreClient>, config: SessionConfig) -> Self {
        Self::with_rules(client, config, SchemaRules::default())
    }

    pub fn with_rules(
        client: Arc<dyn ScoreClient>,
        config: SessionConfig,
        rules: SchemaRules,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            debounce: Debouncer::new(config.debounce()),
            state: SessionState::new(&config),
            config,
            rules,
            file: None,
            seq: 0,
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// True while a fetch is outstanding or a commit is armed.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0 || self.debounce.is_armed()
    }

    // ── Commands ────────────────────────────────────────────────

    /// Start a fresh session for `upload` and fetch its first page.
    pub fn select_file(&mut self, upload: ValidatedUpload) {
        let file = upload.into_file();
        info!(file = %file.name, bytes = file.len(), "new file selected");

        self.debounce.cancel();
        self.state = SessionState::new(&self.config);
        self.state.file_name = Some(file.name.clone());
        self.file = Some(file);

        let request = FetchRequest {
            query: PageQuery {
                page: 1,
                page_size: self.state.page_size,
                percentile: self.state.threshold.committed,
            },
            kind: FetchKind::Initial,
        };
        self.dispatch(request);
    }

    /// Fetch `page` at `page_size` using the committed percentile.
    pub fn navigate(&mut self, page: u32, page_size: PageSize) -> Result<(), SessionError> {
        if self.file.is_none() {
            return Err(SessionError::NoFile);
        }
        if page == 0 {
            return Err(SessionError::InvalidPage);
        }
        let request = FetchRequest {
            query: PageQuery {
                page,
                page_size,
                percentile: self.state.threshold.committed,
            },
            kind: FetchKind::Navigate,
        };
        self.dispatch(request);
        Ok(())
    }

    /// Update the draft percentile and restart the quiet window. No fetch
    /// happens until the window closes.
    pub fn set_draft_percentile(&mut self, percentile: Percentile) {
        self.state.threshold.draft = percentile;
        self.debounce.schedule(percentile);
        debug!(%percentile, "draft percentile armed");
    }

    /// Replay the request that last failed, unchanged.
    pub fn retry(&mut self) -> Result<(), SessionError> {
        let request = self.state.failed_request.ok_or(SessionError::NothingToRetry)?;
        if let Some(error) = &self.state.last_error {
            if !error.retryable {
                return Err(SessionError::NotRetryable(error.kind));
            }
        }
        info!(page = request.query.page, kind = ?request.kind, "retrying failed fetch");
        self.dispatch(request);
        Ok(())
    }

    // ── Event loop ──────────────────────────────────────────────

    /// Wait for the next fetch message or debounce expiry and apply it.
    /// Returns `None` once nothing is outstanding.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if !self.is_busy() {
                return None;
            }

            let wake = tokio::select! {
                Some(msg) = self.rx.recv(), if self.in_flight > 0 => Wake::Message(msg),
                percentile = self.debounce.fired(), if self.debounce.is_armed() => {
                    Wake::Commit(percentile)
                }
                else => return None,
            };

            let event = match wake {
                Wake::Commit(percentile) => self.commit(percentile),
                Wake::Message(FetchMessage::Progress { seq, percent }) => {
                    self.on_progress(seq, percent)
                }
                Wake::Message(FetchMessage::Completed { seq, request, result }) => {
                    Some(self.on_completed(seq, request, result))
                }
            };
            if let Some(event) = event {
                return Some(event);
            }
        }
    }

    /// Drive the loop until idle, collecting every event.
    pub async fn settle(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    /// `None` when no file is loaded; the draft then waits for the next file
    /// (which resets it anyway).
    fn commit(&mut self, percentile: Percentile) -> Option<SessionEvent> {
        if self.file.is_none() {
            debug!(%percentile, "no file loaded, percentile not committed");
            return None;
        }
        info!(%percentile, "committing percentile");
        let request = FetchRequest {
            query: PageQuery {
                page: 1,
                page_size: self.state.page_size,
                percentile,
            },
            kind: FetchKind::ThresholdCommit,
        };
        self.dispatch(request);
        Some(SessionEvent::CommitDispatched { percentile })
    }

    fn on_progress(&mut self, seq: u64, percent: u8) -> Option<SessionEvent> {
        if seq != self.seq || self.state.phase != Phase::Loading {
            return None;
        }
        self.state.upload_progress = Some(percent);
        Some(SessionEvent::Progress { percent })
    }

    fn on_completed(
        &mut self,
        seq: u64,
        request: FetchRequest,
        result: Result<PageResult, ScoreError>,
    ) -> SessionEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        if seq != self.seq {
            debug!(seq, latest = self.seq, "discarding stale response");
            return SessionEvent::StaleDiscarded { seq };
        }

        self.state.upload_progress = None;
        match result {
            Ok(page) => {
                self.apply(request, page);
                SessionEvent::Applied {
                    kind: request.kind,
                    page: request.query.page,
                }
            }
            Err(e) => {
                let record = e.to_record();
                warn!(
                    kind = %record.kind,
                    page = request.query.page,
                    "fetch failed: {}",
                    record.message
                );
                self.state.phase = Phase::Error;
                self.state.last_error = Some(record.clone());
                self.state.failed_request = Some(request);
                SessionEvent::Failed(record)
            }
        }
    }

    fn apply(&mut self, request: FetchRequest, page: PageResult) {
        let state = &mut self.state;
        let query = request.query;

        state.range = range::update(state.range, page.scores());
        if state.columns.is_none() && !page.rows.is_empty() {
            state.columns = Some(infer_columns(&page.rows, &self.rules));
        }

        match request.kind {
            FetchKind::Initial | FetchKind::ThresholdCommit => {
                state.threshold.committed = query.percentile;
                state.threshold.value = page.threshold_value;
            }
            FetchKind::Navigate => {
                if page.threshold_value.is_some() {
                    state.threshold.value = page.threshold_value;
                }
            }
        }

        state.total_pages = page.page_count(query.page_size);
        state.total_rows = page.total_rows;
        state.rows = page.rows;
        state.page = query.page;
        state.page_size = query.page_size;
        state.phase = Phase::Ready;
        state.last_error = None;
        state.failed_request = None;

        debug!(
            page = state.page,
            rows = state.rows.len(),
            total_pages = state.total_pages,
            "page applied"
        );
    }

    fn dispatch(&mut self, request: FetchRequest) {
        let Some(file) = self.file.clone() else {
            return;
        };
        self.seq += 1;
        self.in_flight += 1;
        self.state.phase = Phase::Loading;

        let seq = self.seq;
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        debug!(seq, page = request.query.page, kind = ?request.kind, "dispatching fetch");

        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let guard = CompletionGuard {
                tx,
                seq,
                request,
                sent: false,
            };
            let progress: ProgressFn = Arc::new(move |percent| {
                let _ = progress_tx.send(FetchMessage::Progress { seq, percent });
            });
            let result = client.score_page(&file, &request.query, Some(progress)).await;
            guard.complete(result);
        });
    }
}

/// Sends exactly one `Completed` per fetch task. A task that panics or is
/// cancelled reports a retryable failure from `Drop`, so `in_flight` always
/// drains.
struct CompletionGuard {
    tx: mpsc::UnboundedSender<FetchMessage>,
    seq: u64,
    request: FetchRequest,
    sent: bool,
}

impl CompletionGuard {
    fn complete(mut self, result: Result<PageResult, ScoreError>) {
        self.sent = true;
        let _ = self.tx.send(FetchMessage::Completed {
            seq: self.seq,
            request: self.request,
            result,
        });
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if self.sent {
            return;
        }
        let error = ServiceError::Unknown {
            code: None,
            status: 0,
            message: "scoring request ended without a response".to_string(),
        };
        let _ = self.tx.send(FetchMessage::Completed {
            seq: self.seq,
            request: self.request,
            result: Err(error.into()),
        });
    }
}
