use crate::error::{AppError, Result};

pub const ODDS_API_URL: &str = "https://api.the-odds-api.com";
pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Single storage slot for the whole system: one logical file, overwritten on save.
pub const SNAPSHOT_FILENAME: &str = "nba_odds_snapshot.json";

/// Player-prop market keys, in display priority order. Doubles as the
/// comma-joined `markets` parameter for per-event odds requests.
pub const PROP_MARKETS: &[&str] = &[
    "player_points",
    "player_rebounds",
    "player_assists",
    "player_points_rebounds_assists",
    "player_points_rebounds",
    "player_points_assists",
    "player_rebounds_assists",
];

/// Game-totals market key. A bookmaker quote may carry this alongside props.
pub const TOTALS_MARKET: &str = "totals";

/// Event list TTL (seconds). The slate of games rarely changes intraday.
pub const EVENTS_TTL_SECS: u64 = 1800;

/// Per-event odds TTL (seconds). Short, so "live" stays fresh without
/// burning a metered credit on every UI interaction.
pub const ODDS_TTL_SECS: u64 = 45;

/// Bounded timeout for all upstream HTTP calls (Odds API and blob store).
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// Snapshot display timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Default movement thresholds (points of line value), per mode.
pub const DEFAULT_PROPS_THRESHOLD: f64 = 1.5;
pub const DEFAULT_TOTALS_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone)]
pub struct Config {
    pub odds_api_url: String,
    pub drive_api_url: String,
    pub drive_upload_url: String,
    /// Odds API key (ODDS_API_KEY), required.
    pub api_key: String,
    /// Blob-store folder holding the snapshot slot (DRIVE_FOLDER_ID), required.
    pub drive_folder_id: String,
    /// Bearer token for the blob store (DRIVE_ACCESS_TOKEN), required.
    pub drive_token: String,
    /// Sport identifier for the events endpoint (SPORT_KEY).
    pub sport_key: String,
    /// Bookmaker whose lines we track (BOOKMAKER_KEY).
    pub bookmaker_key: String,
    pub log_level: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            odds_api_url: std::env::var("ODDS_API_URL")
                .unwrap_or_else(|_| ODDS_API_URL.to_string()),
            drive_api_url: std::env::var("DRIVE_API_URL")
                .unwrap_or_else(|_| DRIVE_API_URL.to_string()),
            drive_upload_url: std::env::var("DRIVE_UPLOAD_URL")
                .unwrap_or_else(|_| DRIVE_UPLOAD_URL.to_string()),
            api_key: required("ODDS_API_KEY")?,
            drive_folder_id: required("DRIVE_FOLDER_ID")?,
            drive_token: required("DRIVE_ACCESS_TOKEN")?,
            sport_key: std::env::var("SPORT_KEY")
                .unwrap_or_else(|_| "basketball_nba".to_string()),
            bookmaker_key: std::env::var("BOOKMAKER_KEY")
                .unwrap_or_else(|_| "draftkings".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
        })
    }

    /// Comma-joined props market list for the odds endpoint.
    pub fn prop_markets_param() -> String {
        PROP_MARKETS.join(",")
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("missing required {name}")))
}
