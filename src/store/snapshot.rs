use tracing::{info, warn};

use crate::config::{Config, SNAPSHOT_FILENAME};
use crate::error::Result;
use crate::store::drive::DriveClient;
use crate::store::migrate::{migrate, resolve_shape, CurrentWire};
use crate::types::Snapshot;

/// What a load produced. Callers in the compare flow treat `Missing` and
/// `Failed` the same way (empty pre-game state), but the operator message
/// can tell "no snapshot yet" from "storage broke".
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Snapshot),
    Missing,
    Failed(String),
}

/// Owner of the single snapshot slot: sole writer, sole reader.
pub struct SnapshotStore {
    drive: DriveClient,
    bookmaker_key: String,
}

impl SnapshotStore {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            drive: DriveClient::new(cfg)?,
            bookmaker_key: cfg.bookmaker_key.clone(),
        })
    }

    /// Persist the snapshot in the current wire shape, overwriting the slot
    /// if it exists. Returns an operator-facing status message.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<String> {
        let content = serde_json::to_string(&CurrentWire::from(snapshot))?;

        let message = match self.drive.find_file(SNAPSHOT_FILENAME).await? {
            Some(file_id) => {
                self.drive.update_file(&file_id, &content).await?;
                format!("Snapshot updated ({})", snapshot.last_updated)
            }
            None => {
                self.drive.create_file(SNAPSHOT_FILENAME, &content).await?;
                format!("Snapshot created ({})", snapshot.last_updated)
            }
        };

        info!(
            props = snapshot.props.len(),
            totals = snapshot.totals.len(),
            "snapshot saved"
        );
        Ok(message)
    }

    /// Load and migrate the stored snapshot. Fail-open: storage or parse
    /// trouble never escapes as an error from here.
    pub async fn load(&self) -> LoadOutcome {
        let file_id = match self.drive.find_file(SNAPSHOT_FILENAME).await {
            Ok(Some(id)) => id,
            Ok(None) => return LoadOutcome::Missing,
            Err(e) => {
                warn!("snapshot lookup failed: {e}");
                return LoadOutcome::Failed(e.to_string());
            }
        };

        let content = match self.drive.download(&file_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!("snapshot download failed: {e}");
                return LoadOutcome::Failed(e.to_string());
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!("stored snapshot was not valid JSON: {e}");
                return LoadOutcome::Failed(format!("stored snapshot was not valid JSON: {e}"));
            }
        };

        match migrate(resolve_shape(value), &self.bookmaker_key) {
            Some(snapshot) => LoadOutcome::Loaded(snapshot),
            None => {
                warn!("stored snapshot had no recognized shape");
                LoadOutcome::Missing
            }
        }
    }
}
