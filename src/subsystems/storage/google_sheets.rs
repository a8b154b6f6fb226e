//! Google Sheets REST v4 client implementing [`SheetClient`].
//!
//! Uses the shared async `reqwest` client and drives each call to completion
//! on the captured Tokio runtime handle.  Store methods run on the blocking
//! pool (`spawn_blocking`), where `Handle::block_on` is permitted; calling
//! them directly from an async task would panic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use super::StoreError;
use super::sheets::SheetClient;

pub struct GoogleSheetsClient {
    http: Client,
    api_base_url: String,
    spreadsheet_id: String,
    token: String,
    runtime: Handle,
    /// worksheet title -> numeric sheetId (needed for row deletion).
    sheet_ids: Mutex<HashMap<String, i64>>,
}

impl GoogleSheetsClient {
    /// Must be called from within a Tokio runtime; the handle is captured.
    pub fn new(
        api_base_url: &str,
        spreadsheet_id: &str,
        token: String,
        timeout_seconds: u64,
    ) -> Result<Self, StoreError> {
        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Unavailable(format!("sheets: no tokio runtime: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("sheets: failed to build HTTP client: {e}")))?;
        // Validate the base URL once so later joins cannot fail on it.
        Url::parse(api_base_url)
            .map_err(|e| StoreError::Unavailable(format!("sheets: bad api_base_url '{api_base_url}': {e}")))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
            runtime,
            sheet_ids: Mutex::new(HashMap::new()),
        })
    }

    /// `{base}/{spreadsheet_id}{suffix}` followed by extra path segments.
    fn url(&self, suffix: &str, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.api_base_url)
            .map_err(|e| StoreError::Unavailable(format!("sheets: bad url: {e}")))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Unavailable("sheets: api_base_url cannot be a base".into()))?;
            path.pop_if_empty();
            path.push(&format!("{}{suffix}", self.spreadsheet_id));
            for s in segments {
                path.push(s);
            }
        }
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        self.url("", &["values", range])
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, StoreError> {
        let response = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("sheets: request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(format!("sheets: read body: {e}")))?;
        if !status.is_success() {
            error!(%status, "sheets API returned an error");
            return Err(StoreError::Unavailable(format!("sheets: HTTP {status}: {body}")));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Unavailable(format!("sheets: bad JSON: {e}")))
    }

    async fn fetch_sheet_ids(&self) -> Result<HashMap<String, i64>, StoreError> {
        let mut url = self.url("", &[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties(sheetId,title)");
        let meta: SpreadsheetMeta = serde_json::from_value(self.send(self.http.get(url)).await?)
            .map_err(|e| StoreError::Unavailable(format!("sheets: bad metadata: {e}")))?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| (s.properties.title, s.properties.sheet_id))
            .collect())
    }

    async fn batch_update(&self, requests: Vec<Value>) -> Result<Value, StoreError> {
        let url = self.url(":batchUpdate", &[])?;
        self.send(self.http.post(url).json(&json!({ "requests": requests }))).await
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, StoreError> {
        if let Some(id) = self.ids().get(title).copied() {
            return Ok(id);
        }
        let ids = self.fetch_sheet_ids().await?;
        let id = ids
            .get(title)
            .copied()
            .ok_or_else(|| StoreError::Unavailable(format!("sheets: no worksheet named '{title}'")))?;
        self.ids().extend(ids);
        Ok(id)
    }

    fn ids(&self) -> std::sync::MutexGuard<'_, HashMap<String, i64>> {
        self.sheet_ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SheetClient for GoogleSheetsClient {
    fn ensure_sheet(&self, title: &str, header: &[&str]) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            let ids = self.fetch_sheet_ids().await?;
            let exists = ids.contains_key(title);
            self.ids().extend(ids);
            if exists {
                return Ok(());
            }

            let reply = self
                .batch_update(vec![json!({ "addSheet": { "properties": { "title": title } } })])
                .await?;
            if let Some(id) = reply["replies"][0]["addSheet"]["properties"]["sheetId"].as_i64() {
                self.ids().insert(title.to_string(), id);
            }

            let mut url = self.values_url(&format!("{title}!A1"))?;
            url.query_pairs_mut().append_pair("valueInputOption", "RAW");
            self.send(self.http.put(url).json(&json!({ "values": [header] }))).await?;
            info!(title, "sheets: worksheet created");
            Ok(())
        })
    }

    fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.runtime.block_on(async {
            let mut url = self.values_url(&format!("{title}!A2:Z"))?;
            url.query_pairs_mut().append_pair("valueRenderOption", "UNFORMATTED_VALUE");
            let range: ValueRange = serde_json::from_value(self.send(self.http.get(url)).await?)
                .map_err(|e| StoreError::Unavailable(format!("sheets: bad value range: {e}")))?;
            debug!(title, rows = range.values.len(), "sheets: rows read");
            Ok(range.values.into_iter().map(|row| row.iter().map(cell_text).collect()).collect())
        })
    }

    fn append_row(&self, title: &str, row: Vec<String>) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            let mut url = self.url("", &["values", &format!("{title}!A1:append")])?;
            url.query_pairs_mut()
                .append_pair("valueInputOption", "RAW")
                .append_pair("insertDataOption", "INSERT_ROWS");
            self.send(self.http.post(url).json(&json!({ "values": [row] }))).await?;
            Ok(())
        })
    }

    fn update_row(&self, title: &str, index: usize, row: Vec<String>) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            // +2: one for the header, one for A1 being row 1.
            let mut url = self.values_url(&format!("{title}!A{}", index + 2))?;
            url.query_pairs_mut().append_pair("valueInputOption", "RAW");
            self.send(self.http.put(url).json(&json!({ "values": [row] }))).await?;
            Ok(())
        })
    }

    fn delete_rows(&self, title: &str, indices: &[usize]) -> Result<(), StoreError> {
        self.runtime.block_on(async {
            let sheet_id = self.sheet_id(title).await?;
            let mut sorted = indices.to_vec();
            sorted.sort_unstable_by(|a, b| b.cmp(a));
            sorted.dedup();
            let requests = sorted
                .into_iter()
                .map(|i| delete_row_request(sheet_id, i))
                .collect();
            self.batch_update(requests).await?;
            Ok(())
        })
    }
}

/// A `deleteDimension` request removing data row `index` (header excluded).
fn delete_row_request(sheet_id: i64, index: usize) -> Value {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": index + 1,
                "endIndex": index + 2,
            }
        }
    })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    #[serde(rename = "sheetId")]
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleSheetsClient {
        GoogleSheetsClient::new(
            "https://sheets.googleapis.com/v4/spreadsheets",
            "sheet123",
            "token".into(),
            5,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn builds_values_url() {
        let url = client().values_url("meals!A2:Z").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/meals!A2:Z"
        );
    }

    #[tokio::test]
    async fn builds_batch_update_url() {
        let url = client().url(":batchUpdate", &[]).unwrap();
        assert_eq!(url.as_str(), "https://sheets.googleapis.com/v4/spreadsheets/sheet123:batchUpdate");
    }

    #[test]
    fn new_outside_runtime_errors() {
        let result = GoogleSheetsClient::new("https://example.com/v4/spreadsheets", "x", "t".into(), 1);
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn delete_request_skips_header_row() {
        let req = delete_row_request(42, 0);
        assert_eq!(req["deleteDimension"]["range"]["sheetId"], 42);
        assert_eq!(req["deleteDimension"]["range"]["startIndex"], 1);
        assert_eq!(req["deleteDimension"]["range"]["endIndex"], 2);
    }

    #[test]
    fn cells_render_as_text() {
        assert_eq!(cell_text(&json!("soup")), "soup");
        assert_eq!(cell_text(&json!(320.5)), "320.5");
        assert_eq!(cell_text(&json!(7)), "7");
        assert_eq!(cell_text(&Value::Null), "");
    }
}
