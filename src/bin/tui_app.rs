use serde::Deserialize;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct DiffRowResponse {
    pub subject: String,
    pub market_key: String,
    pub matchup: String,
    pub pre_line: Option<f64>,
    pub live_line: Option<f64>,
    pub diff: Option<f64>,
    pub over_price: f64,
    pub under_price: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct CompareResponse {
    pub mode: Option<String>,
    pub message: String,
    #[serde(default)]
    pub rows: Vec<DiffRowResponse>,
    pub snapshot_last_updated: Option<String>,
    pub fetch_failures: Option<usize>,
    pub credits_remaining: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct SnapshotResponse {
    pub message: String,
    pub props: Option<usize>,
    pub totals: Option<usize>,
    pub credits_remaining: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RefreshResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[allow(dead_code)]
pub struct StatusResponse {
    pub bookmaker: Option<String>,
    pub sport: Option<String>,
    pub snapshot_last_updated: Option<String>,
    pub credits_remaining: Option<String>,
    pub credits_used: Option<String>,
    pub events_cache_age_secs: Option<u64>,
    pub odds_cache_entries: Option<usize>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Scanner,
    Search,
    Totals,
}

impl Mode {
    pub fn as_param(self) -> &'static str {
        match self {
            Mode::Scanner => "scanner",
            Mode::Search => "search",
            Mode::Totals => "totals",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Scanner => "SCANNER",
            Mode::Search => "SEARCH",
            Mode::Totals => "TOTALS",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub conn: ConnectionStatus,
    pub mode: Mode,
    pub props_threshold: f64,
    pub totals_threshold: f64,
    /// Search-mode query; edited in place when `editing_query` is set.
    pub query: String,
    pub editing_query: bool,
    pub rows: Vec<DiffRowResponse>,
    /// Inline status line from the last action.
    pub message: String,
    pub status: StatusResponse,
    pub base_url: String,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            conn: ConnectionStatus::Connecting,
            mode: Mode::Scanner,
            props_threshold: 1.5,
            totals_threshold: 2.5,
            query: String::new(),
            editing_query: false,
            rows: Vec::new(),
            message: "Press [s] to snapshot, [c] to compare.".to_string(),
            status: StatusResponse::default(),
            base_url,
        }
    }

    pub fn threshold(&self) -> f64 {
        match self.mode {
            Mode::Totals => self.totals_threshold,
            _ => self.props_threshold,
        }
    }

    pub fn adjust_threshold(&mut self, delta: f64) {
        let t = match self.mode {
            Mode::Totals => &mut self.totals_threshold,
            _ => &mut self.props_threshold,
        };
        *t = (*t + delta).max(0.0);
    }

    /// Mode switch resets the result pane; rows from another mode are not
    /// comparable to the new one's rules.
    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.rows.clear();
            self.message = format!("{} mode. Press [c] to compare.", mode.label());
        }
    }

    /// Cheap status poll (no metered upstream calls behind it).
    pub async fn refresh_status(&mut self, client: &reqwest::Client) {
        let url = format!("{}/status", self.base_url);
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(status) = resp.json::<StatusResponse>().await {
                    self.status = status;
                    self.conn = ConnectionStatus::Connected;
                }
            }
            Ok(resp) => self.conn = ConnectionStatus::Error(format!("status: {}", resp.status())),
            Err(e) => self.conn = ConnectionStatus::Error(format!("{e}")),
        }
    }

    /// Run the compare flow with the current mode parameters.
    pub async fn compare(&mut self, client: &reqwest::Client) {
        let url = format!(
            "{}/compare?mode={}&threshold={}&query={}",
            self.base_url,
            self.mode.as_param(),
            self.threshold(),
            self.query,
        );
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<CompareResponse>().await {
                Ok(body) => {
                    self.rows = body.rows;
                    self.message = body.message;
                    if let Some(ts) = body.snapshot_last_updated {
                        self.status.snapshot_last_updated = Some(ts);
                    }
                    if body.credits_remaining.is_some() {
                        self.status.credits_remaining = body.credits_remaining;
                    }
                }
                Err(e) => self.message = format!("Compare response unreadable: {e}"),
            },
            Ok(resp) => self.message = format!("Compare failed: {}", resp.status()),
            Err(e) => self.message = format!("Compare failed: {e}"),
        }
    }

    pub async fn take_snapshot(&mut self, client: &reqwest::Client) {
        let url = format!("{}/snapshot", self.base_url);
        match client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<SnapshotResponse>().await {
                Ok(body) => {
                    self.message = body.message;
                    if body.credits_remaining.is_some() {
                        self.status.credits_remaining = body.credits_remaining;
                    }
                }
                Err(e) => self.message = format!("Snapshot response unreadable: {e}"),
            },
            Ok(resp) => self.message = format!("Snapshot failed: {}", resp.status()),
            Err(e) => self.message = format!("Snapshot failed: {e}"),
        }
    }

    pub async fn force_refresh(&mut self, client: &reqwest::Client) {
        let url = format!("{}/refresh", self.base_url);
        match client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                if let Ok(body) = resp.json::<RefreshResponse>().await {
                    self.message = body.message;
                }
            }
            Ok(resp) => self.message = format!("Refresh failed: {}", resp.status()),
            Err(e) => self.message = format!("Refresh failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

pub fn format_line(v: Option<f64>) -> String {
    match v {
        Some(l) => format!("{l:.1}"),
        None => "-".to_string(),
    }
}

pub fn format_diff(v: Option<f64>) -> String {
    match v {
        Some(d) => format!("{d:+.1}"),
        None => "-".to_string(),
    }
}

pub fn format_price(v: Option<f64>) -> String {
    match v {
        Some(p) => format!("{p:.2}"),
        None => "n/q".to_string(),
    }
}

/// Strip the `player_` prefix for narrow columns.
pub fn short_market(key: &str) -> String {
    key.strip_prefix("player_").unwrap_or(key).to_string()
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn main() {
    // Shared console module; the entry point lives in src/bin/tui.rs.
}
