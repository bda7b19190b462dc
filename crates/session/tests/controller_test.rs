//! Session controller behaviour against a scripted in-memory scoring client.
//! All tests run on a paused clock; sleeps inside the mock auto-advance.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use scorelens_client::{
    ProgressFn, ScoreClient, ScoreError, ServiceError, UploadGate, ValidatedUpload,
};
use scorelens_core::config::SessionConfig;
use scorelens_core::{
    ErrorKind, FieldValue, PageQuery, PageResult, PageSize, Percentile, ScoredRow, UploadFile,
};
use scorelens_session::{FetchKind, Phase, SessionController, SessionError, SessionEvent};
use scorelens_view::{color_for, Severity};

type Reply = (Duration, Result<PageResult, ScoreError>);
type Responder = dyn Fn(&PageQuery, usize) -> Reply + Send + Sync;

/// Answers each call from `responder(query, call_index)` after the given delay.
struct ScriptedClient {
    responder: Box<Responder>,
    calls: Mutex<Vec<PageQuery>>,
    count: AtomicUsize,
}

impl ScriptedClient {
    fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&PageQuery, usize) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> Vec<PageQuery> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoreClient for ScriptedClient {
    async fn score_page(
        &self,
        _file: &UploadFile,
        query: &PageQuery,
        progress: Option<ProgressFn>,
    ) -> Result<PageResult, ScoreError> {
        self.calls.lock().unwrap().push(*query);
        let index = self.count.fetch_add(1, Ordering::SeqCst);
        if let Some(p) = &progress {
            p(0);
        }
        let (delay, result) = (self.responder)(query, index);
        tokio::time::sleep(delay).await;
        if let Some(p) = &progress {
            p(100);
        }
        result
    }
}

fn row(
    query: &PageQuery,
    index: usize,
    fields: &[(&str, FieldValue)],
    score: f64,
    is_anomaly: bool,
) -> ScoredRow {
    let mut map: IndexMap<String, FieldValue> =
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    map.insert("anomaly_scored".into(), FieldValue::Float(score));
    map.insert("is_anomaly".into(), FieldValue::Integer(is_anomaly as i64));
    ScoredRow {
        row_id: query.row_id(index),
        fields: map,
        score,
        is_anomaly,
    }
}

/// A page of rows with the given scores; the highest is flagged.
fn page_of(query: &PageQuery, scores: &[f64]) -> PageResult {
    let top = scores.iter().copied().fold(f64::MIN, f64::max);
    let rows = scores
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let belnr = FieldValue::Text(format!("{}", 100_000 + query.row_id(i)));
            row(query, i, &[("BELNR", belnr)], s, s == top)
        })
        .collect();
    PageResult {
        rows,
        total_rows: 3 * query.page_size.get() as u64,
        total_pages: None,
        threshold_value: Some(query.percentile.get() / 100.0),
    }
}

fn upload(name: &str) -> ValidatedUpload {
    let gate = UploadGate::new(vec!["BELNR".to_string()], 1024 * 1024);
    gate.check(UploadFile::new(name, "BELNR,DMBTR\n100045,12.5\n"))
        .unwrap()
}

fn controller(client: Arc<ScriptedClient>) -> SessionController {
    SessionController::new(client, SessionConfig::default())
}

fn pct(value: f64) -> Percentile {
    Percentile::new(value).unwrap()
}

fn size(value: u32) -> PageSize {
    PageSize::new(value).unwrap()
}

fn quick(query: &PageQuery, scores: &[f64]) -> Reply {
    (Duration::from_millis(5), Ok(page_of(query, scores)))
}

#[tokio::test(start_paused = true)]
async fn three_row_page_is_presented() {
    let client = ScriptedClient::new(|q, _| quick(q, &[0.1, 0.5, 0.9]));
    let mut session = controller(client.clone());

    session.select_file(upload("journal.csv"));
    assert_eq!(session.state().phase, Phase::Loading);
    let events = session.settle().await;
    assert!(events.contains(&SessionEvent::Applied { kind: FetchKind::Initial, page: 1 }));

    let state = session.snapshot();
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.range.bounds(), Some((0.1, 0.9)));
    assert_eq!(state.total_pages, 3);
    assert_eq!(state.threshold.value, Some(0.95));
    assert_eq!(state.rows.iter().map(|r| r.row_id).collect::<Vec<_>>(), vec![1, 2, 3]);

    let fields: Vec<&str> = state
        .columns
        .as_ref()
        .unwrap()
        .iter()
        .map(|c| c.field.as_str())
        .collect();
    assert_eq!(fields, vec!["row_id", "BELNR", "anomaly_scored", "is_anomaly"]);

    let low = color_for(0.1, &state.range);
    let mid = color_for(0.5, &state.range);
    let high = color_for(0.9, &state.range);
    assert!((low.token.hue().unwrap() - 120.0).abs() < 1e-9);
    assert!((mid.token.hue().unwrap() - 41.5).abs() < 0.1);
    assert!(high.token.hue().unwrap().abs() < 1e-9);
    assert_eq!(
        [low.severity, mid.severity, high.severity],
        [Severity::Low, Severity::Medium, Severity::High]
    );

    assert_eq!(client.calls().len(), 1);
    assert_eq!(client.calls()[0].percentile, pct(95.0));
}

#[tokio::test(start_paused = true)]
async fn progress_is_reported_then_cleared() {
    let client = ScriptedClient::new(|q, _| quick(q, &[0.2]));
    let mut session = controller(client);

    session.select_file(upload("a.csv"));
    let events = session.settle().await;
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![0, 100]);
    assert_eq!(session.state().upload_progress, None);
}

#[tokio::test(start_paused = true)]
async fn stale_response_never_reaches_state() {
    // Page 2 is slow and carries an outlier score; page 3 answers first.
    let client = ScriptedClient::new(|q, _| match q.page {
        2 => (Duration::from_millis(500), Ok(page_of(q, &[100.0]))),
        3 => (Duration::from_millis(10), Ok(page_of(q, &[0.3, 0.7]))),
        _ => quick(q, &[0.2, 0.4]),
    });
    let mut session = controller(client.clone());
    session.select_file(upload("a.csv"));
    session.settle().await;

    session.navigate(2, size(20)).unwrap();
    session.navigate(3, size(20)).unwrap();
    let events = session.settle().await;

    assert!(events.contains(&SessionEvent::Applied { kind: FetchKind::Navigate, page: 3 }));
    assert!(events.iter().any(|e| matches!(e, SessionEvent::StaleDiscarded { .. })));

    let state = session.snapshot();
    assert_eq!(state.page, 3);
    assert_eq!(state.rows[0].row_id, 41);
    assert_eq!(state.range.bounds(), Some((0.2, 0.7)));
    assert_eq!(client.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn percentile_changes_are_coalesced() {
    let client = ScriptedClient::new(|q, _| quick(q, &[0.1, 0.6]));
    let mut session = controller(client.clone());
    session.select_file(upload("a.csv"));
    session.settle().await;

    session.set_draft_percentile(pct(96.0));
    tokio::time::advance(Duration::from_millis(100)).await;
    session.set_draft_percentile(pct(97.0));
    tokio::time::advance(Duration::from_millis(100)).await;
    session.set_draft_percentile(pct(98.0));

    // Draft moves immediately; nothing is sent yet.
    assert_eq!(session.state().threshold.draft, pct(98.0));
    assert_eq!(session.state().threshold.committed, pct(95.0));
    assert_eq!(client.calls().len(), 1);

    let events = session.settle().await;
    assert!(events.contains(&SessionEvent::CommitDispatched { percentile: pct(98.0) }));
    assert!(events.contains(&SessionEvent::Applied { kind: FetchKind::ThresholdCommit, page: 1 }));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].page, 1);
    assert_eq!(calls[1].percentile, pct(98.0));

    let state = session.snapshot();
    assert_eq!(state.threshold.committed, pct(98.0));
    assert_eq!(state.threshold.value, Some(0.98));
}

#[tokio::test(start_paused = true)]
async fn commit_widens_but_never_resets_range() {
    let client = ScriptedClient::new(|q, _| {
        if q.percentile == Percentile::default() {
            match q.page {
                2 => quick(q, &[0.05, 3.0]),
                _ => quick(q, &[0.5, 0.9]),
            }
        } else {
            quick(q, &[0.6, 0.7])
        }
    });
    let mut session = controller(client);
    session.select_file(upload("a.csv"));
    session.settle().await;
    session.navigate(2, size(20)).unwrap();
    session.settle().await;

    session.set_draft_percentile(pct(99.0));
    session.settle().await;

    let state = session.snapshot();
    assert_eq!(state.page, 1);
    assert_eq!(state.range.bounds(), Some((0.05, 3.0)));
}

#[tokio::test(start_paused = true)]
async fn schema_is_frozen_for_the_file() {
    let client = ScriptedClient::new(|q, _| {
        let fields: Vec<(&str, FieldValue)> = if q.page == 1 {
            vec![("A", FieldValue::Integer(1)), ("B", FieldValue::Integer(2))]
        } else {
            vec![("A", FieldValue::Integer(1)), ("C", FieldValue::Integer(3))]
        };
        let rows = vec![row(q, 0, &fields, 0.5, false)];
        let page = PageResult {
            rows,
            total_rows: 40,
            total_pages: Some(2),
            threshold_value: (q.page == 1).then_some(0.95),
        };
        (Duration::from_millis(5), Ok(page))
    });
    let mut session = controller(client);
    session.select_file(upload("a.csv"));
    session.settle().await;
    let first = session.snapshot().columns;

    session.navigate(2, size(20)).unwrap();
    session.settle().await;

    let state = session.snapshot();
    assert_eq!(state.page, 2);
    assert_eq!(state.columns, first);
    let fields: Vec<String> = state.columns.unwrap().into_iter().map(|c| c.field).collect();
    assert_eq!(fields, vec!["row_id", "A", "B", "anomaly_scored", "is_anomaly"]);
    // Navigation without a threshold keeps the last known value.
    assert_eq!(state.threshold.value, Some(0.95));
}

#[tokio::test(start_paused = true)]
async fn new_file_resets_everything() {
    let client = ScriptedClient::new(|q, _| match q.page {
        1 => quick(q, &[0.1, 0.9]),
        _ => quick(q, &[5.0]),
    });
    let mut session = controller(client.clone());
    session.select_file(upload("first.csv"));
    session.settle().await;
    session.navigate(2, size(50)).unwrap();
    session.settle().await;
    session.set_draft_percentile(pct(99.0));

    session.select_file(upload("second.csv"));
    let state = session.snapshot();
    assert_eq!(state.file_name.as_deref(), Some("second.csv"));
    assert_eq!(state.phase, Phase::Loading);
    assert!(!state.range.is_set());
    assert!(state.columns.is_none());
    assert!(state.rows.is_empty());
    assert_eq!(state.page, 1);
    assert_eq!(state.page_size, size(20));
    assert_eq!(state.threshold.draft, pct(95.0));
    assert_eq!(state.threshold.committed, pct(95.0));

    let events = session.settle().await;
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::CommitDispatched { .. })));
    assert_eq!(session.state().range.bounds(), Some((0.1, 0.9)));

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].page_size, size(20));
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_data_and_retry_replays_request() {
    let client = ScriptedClient::new(|q, call| match (q.page, call) {
        (2, 1) => (
            Duration::from_millis(5),
            Err(ScoreError::Service(ServiceError::ScoringFailed {
                message: "Transform/score failed".into(),
            })),
        ),
        (2, _) => quick(q, &[2.0]),
        _ => quick(q, &[0.1, 0.9]),
    });
    let mut session = controller(client.clone());
    session.select_file(upload("a.csv"));
    session.settle().await;
    let before = session.snapshot();

    session.navigate(2, size(20)).unwrap();
    let events = session.settle().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Failed(r) if r.kind == ErrorKind::ScoringFailed)));

    let failed = session.snapshot();
    assert_eq!(failed.phase, Phase::Error);
    assert_eq!(failed.rows, before.rows);
    assert_eq!(failed.range, before.range);
    assert_eq!(failed.threshold, before.threshold);
    assert_eq!(failed.columns, before.columns);
    assert_eq!(failed.page, 1);
    assert!(failed.last_error.as_ref().unwrap().retryable);
    assert_eq!(failed.failed_request.unwrap().query.page, 2);

    session.retry().unwrap();
    let retrying = session.snapshot();
    assert_eq!(retrying.phase, Phase::Loading);
    assert_eq!(retrying.rows, before.rows);
    assert!(retrying.last_error.is_some());

    session.settle().await;
    let state = session.snapshot();
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.page, 2);
    assert!(state.last_error.is_none());
    assert!(state.failed_request.is_none());
    assert_eq!(state.range.bounds(), Some((0.1, 2.0)));

    let calls = client.calls();
    assert_eq!(calls[1], calls[2]);
}

#[tokio::test(start_paused = true)]
async fn network_failure_on_first_page_is_retryable() {
    let client = ScriptedClient::new(|q, call| {
        if call == 0 {
            (Duration::from_millis(5), Err(ScoreError::Network("connection refused".into())))
        } else {
            quick(q, &[0.3])
        }
    });
    let mut session = controller(client);
    session.select_file(upload("a.csv"));
    session.settle().await;

    let state = session.snapshot();
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.last_error.as_ref().unwrap().kind, ErrorKind::Network);
    assert!(!state.range.is_set());

    session.retry().unwrap();
    session.settle().await;
    assert_eq!(session.state().phase, Phase::Ready);
    assert!(session.state().columns.is_some());
}

#[tokio::test(start_paused = true)]
async fn misuse_is_rejected() {
    let client = ScriptedClient::new(|q, _| {
        if q.page == 2 {
            let err = ServiceError::MissingColumns {
                columns: vec!["HKONT".into()],
                message: "Missing required columns in CSV".into(),
            };
            (Duration::from_millis(5), Err(ScoreError::Service(err)))
        } else {
            quick(q, &[0.1])
        }
    });
    let mut session = controller(client.clone());

    assert_eq!(session.navigate(1, size(20)), Err(SessionError::NoFile));
    assert_eq!(session.retry(), Err(SessionError::NothingToRetry));

    session.select_file(upload("a.csv"));
    session.settle().await;
    assert_eq!(session.navigate(0, size(20)), Err(SessionError::InvalidPage));
    assert_eq!(session.retry(), Err(SessionError::NothingToRetry));

    session.navigate(2, size(20)).unwrap();
    session.settle().await;
    assert_eq!(session.retry(), Err(SessionError::NotRetryable(ErrorKind::MissingColumns)));
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn idle_controller_has_no_events() {
    let client = ScriptedClient::new(|q, _| quick(q, &[0.1]));
    let mut session = controller(client);
    assert!(!session.is_busy());
    assert_eq!(session.next_event().await, None);
}

#[tokio::test(start_paused = true)]
async fn draft_without_file_is_never_committed() {
    let client = ScriptedClient::new(|q, _| quick(q, &[0.1]));
    let mut session = controller(client.clone());

    session.set_draft_percentile(pct(98.0));
    assert!(session.is_busy());
    let events = session.settle().await;

    assert!(events.is_empty());
    assert!(!session.is_busy());
    assert_eq!(session.state().threshold.draft, pct(98.0));
    assert_eq!(session.state().threshold.committed, pct(95.0));
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn crashed_fetch_task_still_completes() {
    let client = ScriptedClient::new(|q, _| match q.page {
        2 => panic!("scorer crashed"),
        _ => quick(q, &[0.1, 0.9]),
    });
    let mut session = controller(client.clone());
    session.select_file(upload("a.csv"));
    session.settle().await;
    let before = session.snapshot();

    session.navigate(2, size(20)).unwrap();
    let events = session.settle().await;
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Failed(r) if r.kind == ErrorKind::Unknown)));
    assert!(!session.is_busy());

    let state = session.snapshot();
    assert_eq!(state.phase, Phase::Error);
    assert_eq!(state.rows, before.rows);
    assert_eq!(state.range, before.range);
    assert!(state.last_error.as_ref().unwrap().retryable);
    assert_eq!(state.failed_request.unwrap().query.page, 2);
}
