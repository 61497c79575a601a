use std::time::Duration;

use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::config::{Config, HTTP_TIMEOUT_SECS, TOTALS_MARKET};
use crate::error::Result;
use crate::types::{EventStub, FetchOutcome, MarketMode, RawEvent};

/// Credit counters from the odds provider's response headers. Surfaced for
/// display only, never enforced as a hard limit.
#[derive(Debug, Clone, Default)]
pub struct ApiCredits {
    pub remaining: Option<String>,
    pub used: Option<String>,
}

impl ApiCredits {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let grab = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        Self {
            remaining: grab("x-requests-remaining"),
            used: grab("x-requests-used"),
        }
    }
}

/// Read-only client for the upstream odds provider. Every call is bounded by
/// a timeout and degrades to a `FetchOutcome`; a bad upstream call must not
/// abort a full scan.
pub struct OddsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sport_key: String,
    bookmaker_key: String,
}

impl OddsClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.odds_api_url.clone(),
            api_key: cfg.api_key.clone(),
            sport_key: cfg.sport_key.clone(),
            bookmaker_key: cfg.bookmaker_key.clone(),
        })
    }

    /// List active events for the configured sport.
    pub async fn list_events(&self) -> (FetchOutcome<Vec<EventStub>>, ApiCredits) {
        let url = format!(
            "{}/v4/sports/{}/events?apiKey={}",
            self.base_url, self.sport_key, self.api_key
        );
        let (value, credits) = match self.get_json(&url, "events list").await {
            Ok(pair) => pair,
            Err(msg) => return (FetchOutcome::Failed(msg), ApiCredits::default()),
        };
        (events_from_value(value), credits)
    }

    /// Fetch current odds for one event, filtered to the target bookmaker and
    /// the market family for `mode`. The endpoint cannot be batched, so callers
    /// loop over events sequentially.
    pub async fn event_odds(
        &self,
        event_id: &str,
        mode: MarketMode,
    ) -> (FetchOutcome<RawEvent>, ApiCredits) {
        let markets = match mode {
            MarketMode::Props => Config::prop_markets_param(),
            MarketMode::Totals => TOTALS_MARKET.to_string(),
        };
        let url = format!(
            "{}/v4/sports/{}/events/{}/odds?apiKey={}&bookmakers={}&markets={}&regions=us&oddsFormat=decimal",
            self.base_url, self.sport_key, event_id, self.api_key, self.bookmaker_key, markets
        );
        let (value, credits) = match self.get_json(&url, "event odds").await {
            Ok(pair) => pair,
            Err(msg) => return (FetchOutcome::Failed(msg), ApiCredits::default()),
        };
        (odds_from_value(value), credits)
    }

    /// GET a JSON body, mapping every failure class (network, non-success
    /// status, malformed body) to a message the caller can degrade on.
    async fn get_json(
        &self,
        url: &str,
        what: &str,
    ) -> std::result::Result<(serde_json::Value, ApiCredits), String> {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("{what} request failed: {e}");
                return Err(format!("{what} request failed: {e}"));
            }
        };

        let credits = ApiCredits::from_headers(resp.headers());
        debug!(remaining = ?credits.remaining, "{what} response");

        if !resp.status().is_success() {
            let status = resp.status();
            warn!("{what} returned {status}");
            return Err(format!("{what} returned {status}"));
        }

        match resp.json::<serde_json::Value>().await {
            Ok(v) => Ok((v, credits)),
            Err(e) => {
                warn!("{what} body was not valid JSON: {e}");
                Err(format!("{what} body was not valid JSON: {e}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Live gather (events list + per-event odds, through the session caches)
// ---------------------------------------------------------------------------

/// Everything a scan needs from the live side, with enough bookkeeping to
/// explain a thin result: how many games were on the slate, how many odds
/// fetches failed, and whether the event list itself failed.
#[derive(Debug, Default)]
pub struct LiveGather {
    pub events: Vec<RawEvent>,
    pub slate_size: usize,
    pub fetch_failures: usize,
    pub list_failed: Option<String>,
}

/// Fetch the current slate and per-event odds for one market family, going
/// through the session caches first. Odds fetches run one event at a time
/// because the per-event endpoint cannot be batched. A failed odds fetch drops that
/// event and the scan continues with partial data.
pub async fn gather_live(
    client: &OddsClient,
    session: &crate::state::SessionState,
    mode: MarketMode,
) -> LiveGather {
    let mut gather = LiveGather::default();

    let stubs = match session.cached_events() {
        Some(cached) => cached,
        None => {
            let (outcome, credits) = client.list_events().await;
            session.record_credits(&credits);
            match outcome {
                FetchOutcome::Data(events) => {
                    session.store_events(events.clone());
                    events
                }
                FetchOutcome::Empty => {
                    session.store_events(Vec::new());
                    Vec::new()
                }
                FetchOutcome::Failed(msg) => {
                    gather.list_failed = Some(msg);
                    return gather;
                }
            }
        }
    };
    gather.slate_size = stubs.len();

    for stub in &stubs {
        if let Some(cached) = session.cached_odds(&stub.id, mode) {
            gather.events.push(cached);
            continue;
        }
        let (outcome, credits) = client.event_odds(&stub.id, mode).await;
        session.record_credits(&credits);
        match outcome {
            FetchOutcome::Data(event) => {
                session.store_odds(&stub.id, mode, event.clone());
                gather.events.push(event);
            }
            FetchOutcome::Empty => {
                debug!(event_id = %stub.id, "no odds posted for event");
            }
            FetchOutcome::Failed(msg) => {
                gather.fetch_failures += 1;
                warn!(event_id = %stub.id, "odds fetch failed, continuing scan: {msg}");
            }
        }
    }

    gather
}

/// Interpret an events-list body. An empty array is a valid "no games today"
/// result, not a failure.
pub fn events_from_value(value: serde_json::Value) -> FetchOutcome<Vec<EventStub>> {
    let Some(items) = value.as_array() else {
        return FetchOutcome::Failed("events response was not an array".to_string());
    };
    if items.is_empty() {
        return FetchOutcome::Empty;
    }
    match serde_json::from_value::<Vec<EventStub>>(value) {
        Ok(events) => FetchOutcome::Data(events),
        Err(e) => FetchOutcome::Failed(format!("events response did not parse: {e}")),
    }
}

/// Interpret a per-event odds body. An event with no bookmaker quotes is
/// `Empty`: the game exists but the target markets are not posted.
pub fn odds_from_value(value: serde_json::Value) -> FetchOutcome<RawEvent> {
    match serde_json::from_value::<RawEvent>(value) {
        Ok(event) if event.bookmakers.is_empty() => FetchOutcome::Empty,
        Ok(event) => FetchOutcome::Data(event),
        Err(e) => FetchOutcome::Failed(format!("odds response did not parse: {e}")),
    }
}
