use std::time::Duration;

use tracing::debug;

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};

/// Minimal client for the keyed blob store holding the snapshot slot:
/// find-by-name, create, update content, download content. All other storage
/// concerns (auth refresh, quotas) live outside this system.
pub struct DriveClient {
    client: reqwest::Client,
    api_url: String,
    upload_url: String,
    folder_id: String,
    token: String,
}

impl DriveClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_url: cfg.drive_api_url.clone(),
            upload_url: cfg.drive_upload_url.clone(),
            folder_id: cfg.drive_folder_id.clone(),
            token: cfg.drive_token.clone(),
        })
    }

    /// Locate the snapshot file by name. Results are ordered newest-modified
    /// first, so if duplicates exist (a race during creation) the most
    /// recently modified one is authoritative; stale ones are left in place.
    pub async fn find_file(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/files", self.api_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("q", search_query(&self.folder_id, name).as_str()),
                ("orderBy", "modifiedTime desc"),
                ("fields", "files(id,name,modifiedTime)"),
            ])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("file search failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "file search returned {}",
                resp.status()
            )));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("file search body invalid: {e}")))?;

        let id = body
            .get("files")
            .and_then(|f| f.as_array())
            .and_then(|a| a.first())
            .and_then(|f| f.get("id"))
            .and_then(|i| i.as_str())
            .map(|s| s.to_string());
        debug!(found = id.is_some(), "snapshot file lookup");
        Ok(id)
    }

    /// Create the file in two steps: metadata first, then content upload.
    pub async fn create_file(&self, name: &str, content: &str) -> Result<String> {
        let url = format!("{}/files", self.api_url);
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.folder_id],
            "mimeType": "application/json",
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&metadata)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("file create failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "file create returned {}",
                resp.status()
            )));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("file create body invalid: {e}")))?;
        let file_id = body
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| AppError::Storage("file create returned no id".to_string()))?
            .to_string();

        self.update_file(&file_id, content).await?;
        Ok(file_id)
    }

    /// Replace the file's content in place.
    pub async fn update_file(&self, file_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/files/{}?uploadType=media", self.upload_url, file_id);
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .body(content.to_string())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("file update failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "file update returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Download the file's content as UTF-8 text.
    pub async fn download(&self, file_id: &str) -> Result<String> {
        let url = format!("{}/files/{}?alt=media", self.api_url, file_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("file download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AppError::Storage(format!(
                "file download returned {}",
                resp.status()
            )));
        }
        resp.text()
            .await
            .map_err(|e| AppError::Storage(format!("file download body invalid: {e}")))
    }
}

/// Search expression for "this name, in this folder, not trashed". Passed
/// through `RequestBuilder::query`, which percent-encodes it; nothing here
/// needs to be URL-safe.
fn search_query(folder_id: &str, name: &str) -> String {
    format!("'{folder_id}' in parents and name = '{name}' and trashed = false")
}
