//! Google Sheets backend (REST v4).
//!
//! Uses the blocking `reqwest` client, so every call must run off the async
//! runtime (the web layer wraps calls in `spawn_blocking`).

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::SheetError;
use crate::sheets::SheetClient;
use crate::table::RawGrid;

const API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub struct GoogleSheets {
    http: Client,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl GoogleSheets {
    /// Must be called outside of an async runtime.
    pub fn new(spreadsheet_id: &str, access_token: &str) -> Result<Self, SheetError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SheetError::Transport(e.to_string()))?;
        Ok(GoogleSheets {
            http,
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn values_url(&self, tab: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            API_BASE,
            self.spreadsheet_id,
            urlencoding::encode(&a1_range(tab)),
            suffix
        )
    }

    fn send(&self, request: RequestBuilder, tab: &str) -> Result<Response, SheetError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| SheetError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);

        if status == StatusCode::BAD_REQUEST && message.contains("Unable to parse range") {
            return Err(SheetError::TabNotFound(tab.to_string()));
        }
        Err(SheetError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// Whole-sheet A1 range for a worksheet title.
fn a1_range(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetClient for GoogleSheets {
    fn read_tab(&self, tab: &str) -> Result<RawGrid, SheetError> {
        debug!("reading worksheet {}", tab);
        let response = self.send(self.http.get(self.values_url(tab, "")), tab)?;
        let range: ValueRange = response
            .json()
            .map_err(|e| SheetError::Malformed(e.to_string()))?;
        Ok(RawGrid::from_rows(
            range
                .values
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        ))
    }

    fn tab_exists(&self, tab: &str) -> Result<bool, SheetError> {
        let url = format!(
            "{}/{}?fields=sheets.properties.title",
            API_BASE, self.spreadsheet_id
        );
        let meta: SpreadsheetMeta = self
            .send(self.http.get(url), tab)?
            .json()
            .map_err(|e| SheetError::Malformed(e.to_string()))?;
        Ok(meta.sheets.iter().any(|s| s.properties.title == tab))
    }

    fn add_tab(&self, tab: &str, rows: usize, cols: usize) -> Result<(), SheetError> {
        debug!("creating worksheet {} ({}x{})", tab, rows, cols);
        let url = format!("{}/{}:batchUpdate", API_BASE, self.spreadsheet_id);
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": tab,
                        "gridProperties": { "rowCount": rows, "columnCount": cols }
                    }
                }
            }]
        });
        self.send(self.http.post(url).json(&body), tab)?;
        Ok(())
    }

    fn update_tab(&self, tab: &str, grid: &RawGrid) -> Result<(), SheetError> {
        self.send(
            self.http
                .post(self.values_url(tab, ":clear"))
                .json(&json!({})),
            tab,
        )?;
        let body = json!({
            "range": a1_range(tab),
            "majorDimension": "ROWS",
            "values": grid.rows,
        });
        self.send(
            self.http
                .put(self.values_url(tab, "?valueInputOption=RAW"))
                .json(&body),
            tab,
        )?;
        Ok(())
    }
}
