use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, DEFAULT_PROPS_THRESHOLD, DEFAULT_TOTALS_THRESHOLD, TIMESTAMP_FORMAT};
use crate::engine::{scan_movers, search_lines, status_message, totals_movers, CompareContext};
use crate::error::AppError;
use crate::fetcher::{gather_live, OddsClient};
use crate::normalizer::flatten_events;
use crate::state::SessionState;
use crate::store::{LoadOutcome, SnapshotStore};
use crate::types::{DiffRow, MarketMode, ScanMode, Snapshot};

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Config,
    pub session: Arc<SessionState>,
    pub odds: Arc<OddsClient>,
    pub store: Arc<SnapshotStore>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/snapshot", post(take_snapshot))
        .route("/compare", get(compare))
        .route("/refresh", post(force_refresh))
        .route("/status", get(status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CompareQuery {
    pub mode: Option<ScanMode>,
    pub threshold: Option<f64>,
    pub query: Option<String>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SnapshotResponse {
    pub message: String,
    pub props: usize,
    pub totals: usize,
    pub credits_remaining: Option<String>,
}

#[derive(Serialize)]
pub struct CompareResponse {
    pub mode: ScanMode,
    pub message: String,
    pub rows: Vec<DiffRow>,
    pub snapshot_last_updated: Option<String>,
    pub fetch_failures: usize,
    pub credits_remaining: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub bookmaker: String,
    pub sport: String,
    pub snapshot_last_updated: Option<String>,
    pub credits_remaining: Option<String>,
    pub credits_used: Option<String>,
    pub events_cache_age_secs: Option<u64>,
    pub odds_cache_entries: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Take a fresh pre-game snapshot: fetch both market families, flatten, and
/// overwrite the storage slot.
async fn take_snapshot(
    State(state): State<ApiState>,
) -> Result<Json<SnapshotResponse>, AppError> {
    let props_gather = gather_live(&state.odds, &state.session, MarketMode::Props).await;
    let totals_gather = gather_live(&state.odds, &state.session, MarketMode::Totals).await;

    if let Some(msg) = props_gather.list_failed.as_ref().or(totals_gather.list_failed.as_ref()) {
        // Upstream is down. Nothing to capture, and nothing worth
        // overwriting the existing snapshot slot with.
        return Ok(Json(SnapshotResponse {
            message: format!("Snapshot aborted, event list unavailable: {msg}"),
            props: 0,
            totals: 0,
            credits_remaining: state.session.credits().remaining,
        }));
    }

    let props = flatten_events(&props_gather.events, &state.cfg.bookmaker_key, MarketMode::Props);
    let totals = flatten_events(&totals_gather.events, &state.cfg.bookmaker_key, MarketMode::Totals);

    let mut observed = props.observed_bookmakers.clone();
    observed.extend(totals.observed_bookmakers.iter().cloned());
    let live_event_count = props_gather.events.len().max(totals_gather.events.len());

    let snapshot = Snapshot {
        last_updated: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        props: props.records,
        totals: totals.records,
    };

    let mut message = state.store.save(&snapshot).await?;
    state.session.record_snapshot_timestamp(&snapshot.last_updated);

    if let Some(warning) = bookmaker_warning(live_event_count, &observed, &state.cfg.bookmaker_key)
    {
        message = format!("{message} {warning}");
    }

    info!(
        props = snapshot.props.len(),
        totals = snapshot.totals.len(),
        "snapshot taken"
    );
    Ok(Json(SnapshotResponse {
        message,
        props: snapshot.props.len(),
        totals: snapshot.totals.len(),
        credits_remaining: state.session.credits().remaining,
    }))
}

/// Full compare flow: load the pre-game snapshot, gather live odds, flatten
/// both sides, run the requested mode. Storage trouble degrades to empty
/// pre-game state; the response message says which condition applied.
async fn compare(
    State(state): State<ApiState>,
    Query(params): Query<CompareQuery>,
) -> Json<CompareResponse> {
    let mode = params.mode.unwrap_or(ScanMode::Scanner);
    let threshold = params.threshold.unwrap_or(match mode {
        ScanMode::Totals => DEFAULT_TOTALS_THRESHOLD,
        _ => DEFAULT_PROPS_THRESHOLD,
    });
    let query = params.query.unwrap_or_default();

    let (snapshot, load_note) = match state.store.load().await {
        LoadOutcome::Loaded(s) => {
            state.session.record_snapshot_timestamp(&s.last_updated);
            (Some(s), None)
        }
        LoadOutcome::Missing => (None, None),
        LoadOutcome::Failed(msg) => (None, Some(msg)),
    };

    let Some(snapshot) = snapshot else {
        // No usable pre-game state, so don't burn credits fetching live odds.
        let message = match load_note {
            Some(msg) => format!("Snapshot load failed ({msg}); treated as no snapshot."),
            None => "No snapshot found. Take a snapshot before comparing.".to_string(),
        };
        return Json(CompareResponse {
            mode,
            message,
            rows: Vec::new(),
            snapshot_last_updated: None,
            fetch_failures: 0,
            credits_remaining: state.session.credits().remaining,
        });
    };

    if snapshot.is_empty() {
        // A scan against zero pre-game records can only come back empty, so
        // skip the live fetch and say what is actually wrong.
        return Json(CompareResponse {
            mode,
            message: empty_snapshot_message(&snapshot.last_updated),
            rows: Vec::new(),
            snapshot_last_updated: Some(snapshot.last_updated),
            fetch_failures: 0,
            credits_remaining: state.session.credits().remaining,
        });
    }

    let market_mode = match mode {
        ScanMode::Totals => MarketMode::Totals,
        _ => MarketMode::Props,
    };
    let gather = gather_live(&state.odds, &state.session, market_mode).await;
    let live = flatten_events(&gather.events, &state.cfg.bookmaker_key, market_mode);

    let rows = match mode {
        ScanMode::Scanner => scan_movers(&snapshot.props, &live.records, threshold),
        ScanMode::Search => search_lines(&snapshot.props, &live.records, &query),
        ScanMode::Totals => totals_movers(&snapshot.totals, &live.records, threshold),
    };

    let ctx = CompareContext {
        snapshot_present: true,
        live_event_count: gather.events.len(),
        target_bookmaker: &state.cfg.bookmaker_key,
        bookmaker_seen_live: live.target_was_seen(&state.cfg.bookmaker_key),
        observed_bookmakers: live.observed_bookmakers.iter().cloned().collect(),
        mode,
        threshold,
        query: &query,
    };
    let mut message = status_message(&ctx, rows.len());
    if let Some(msg) = gather.list_failed {
        message = format!("Event list fetch failed ({msg}); no live data this scan.");
    } else if gather.fetch_failures > 0 {
        message = format!(
            "{message} ({} odds fetch(es) failed, partial data)",
            gather.fetch_failures
        );
    }

    Json(CompareResponse {
        mode,
        message,
        rows,
        snapshot_last_updated: Some(snapshot.last_updated),
        fetch_failures: gather.fetch_failures,
        credits_remaining: state.session.credits().remaining,
    })
}

/// Operator-triggered cache invalidation. The next scan will hit the
/// provider regardless of TTLs.
async fn force_refresh(State(state): State<ApiState>) -> Json<RefreshResponse> {
    state.session.force_refresh();
    info!("session caches cleared by operator");
    Json(RefreshResponse {
        message: "Caches cleared. Next scan fetches fresh data.".to_string(),
    })
}

/// Warning appended to the snapshot message when games were on the slate but
/// the target bookmaker never appeared in the fetched odds. A silently-empty
/// snapshot would make every later scan read as "no movement".
fn bookmaker_warning(
    live_event_count: usize,
    observed: &BTreeSet<String>,
    target: &str,
) -> Option<String> {
    if live_event_count == 0 || observed.contains(target) {
        return None;
    }
    let seen = if observed.is_empty() {
        "none".to_string()
    } else {
        observed.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    Some(format!(
        "Warning: bookmaker '{target}' not found in live data (saw: {seen})."
    ))
}

/// Message for a loaded snapshot with zero records in both market families.
/// Distinct from "no snapshot": the slot exists, it just captured nothing.
fn empty_snapshot_message(last_updated: &str) -> String {
    format!("Snapshot from {last_updated} is empty (no lines captured). Take a new snapshot before comparing.")
}

async fn status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let credits = state.session.credits();
    Json(StatusResponse {
        bookmaker: state.cfg.bookmaker_key.clone(),
        sport: state.cfg.sport_key.clone(),
        snapshot_last_updated: state.session.snapshot_timestamp(),
        credits_remaining: credits.remaining,
        credits_used: credits.used,
        events_cache_age_secs: state.session.events_age_secs(),
        odds_cache_entries: state.session.odds_cache_len(),
    })
}
