use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw upstream payload (The Odds API v4)
// ---------------------------------------------------------------------------

/// One sporting event as returned by the events endpoint. The odds endpoint
/// returns the same shape with `bookmakers` populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub id: String,
    pub commence_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub bookmakers: Vec<RawBookmakerQuote>,
}

impl RawEvent {
    /// Display matchup string, also the totals identity key.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBookmakerQuote {
    pub key: String,
    pub title: String,
    pub markets: Vec<RawMarket>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMarket {
    pub key: String,
    pub outcomes: Vec<RawOutcome>,
}

/// One side of a market. `name` is the side label ("Over"/"Under");
/// `description` carries the player name on player-prop markets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOutcome {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub point: Option<f64>,
}

// ---------------------------------------------------------------------------
// Flattened records
// ---------------------------------------------------------------------------

/// Which market family the normalizer extracts from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketMode {
    Props,
    Totals,
}

/// One resolved line for one (subject, market) pair at one point in time.
/// `under_price: None` means the bookmaker posted no Under quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub identity_key: String,
    pub subject: String,
    pub market_key: String,
    pub line: Option<f64>,
    pub over_price: f64,
    pub under_price: Option<f64>,
    pub matchup: String,
    pub bookmaker_title: String,
}

/// The single stored capture of all lines, partitioned by market family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_updated: String,
    pub props: Vec<FlatRecord>,
    pub totals: Vec<FlatRecord>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.props.is_empty() && self.totals.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStatus {
    /// A live counterpart with the same identity key exists.
    Active,
    /// Subject exists only in the pre-game snapshot.
    Inactive,
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineStatus::Active => write!(f, "active"),
            LineStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// One matched (pre, live) pair. `diff` is computed only when both lines are
/// non-null; inactive rows carry `diff: None` rather than a zero placeholder
/// so they cannot be mistaken for a true zero-movement row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRow {
    pub subject: String,
    pub market_key: String,
    pub matchup: String,
    pub pre_line: Option<f64>,
    pub live_line: Option<f64>,
    pub diff: Option<f64>,
    pub over_price: f64,
    pub under_price: Option<f64>,
    pub status: LineStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Scanner,
    Search,
    Totals,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Scanner => write!(f, "scanner"),
            ScanMode::Search => write!(f, "search"),
            ScanMode::Totals => write!(f, "totals"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch outcomes
// ---------------------------------------------------------------------------

/// Result of a fail-soft upstream call. Keeps "zero results" distinguishable
/// from "the fetch itself broke"; callers decide how to degrade.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    Data(T),
    Empty,
    Failed(String),
}

/// Event identity from the events list endpoint, before odds are attached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStub {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub commence_time: Option<DateTime<Utc>>,
}
