use crate::domain::ports::{RowRange, SheetRow, SheetSink};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use std::fmt::Display;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com";

/// 工作表名稱在 A1 表示法中的寫法：含空白或符號時加單引號，內部 `'` 重複
pub fn sheet_ref(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

pub fn a1_range(sheet: &str, range: impl Display) -> String {
    format!("{}!{}", sheet_ref(sheet), range)
}

/// Google Sheets v4 REST 目的地，使用 OAuth bearer token
pub struct GoogleSheetsSink {
    client: Client,
    endpoint: String,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheetsSink {
    pub fn new(
        endpoint: &str,
        spreadsheet_id: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// `{endpoint}/v4/spreadsheets/{id}/...` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| EtlError::ConfigError {
            message: format!("invalid sheets endpoint '{}': {}", self.endpoint, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| EtlError::ConfigError {
                message: format!("sheets endpoint '{}' cannot carry a path", self.endpoint),
            })?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("Sheets API {} failed with {}: {}", what, status, body);
        Err(EtlError::SinkError {
            message: format!("Sheets API {} failed with HTTP {}", what, status.as_u16()),
        })
    }

    async fn sheet_titles(&self) -> Result<Vec<String>> {
        let url = self.url(&[self.spreadsheet_id.as_str()])?;
        let response = self
            .send(
                self.client
                    .get(url)
                    .query(&[("fields", "sheets.properties.title")]),
                "metadata",
            )
            .await?;
        let body: Value = response.json().await?;

        Ok(body
            .get("sheets")
            .and_then(Value::as_array)
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s.pointer("/properties/title").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_values(&self, range: &str, rows: &[SheetRow]) -> Result<()> {
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", range])?;
        self.send(
            self.client
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&json!({
                    "range": range,
                    "majorDimension": "ROWS",
                    "values": rows,
                })),
            "values update",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SheetSink for GoogleSheetsSink {
    async fn row_count(&self, sheet: &str) -> Result<usize> {
        let url = self.url(&[self.spreadsheet_id.as_str(), "values", &sheet_ref(sheet)])?;
        let response = self.send(self.client.get(url), "values read").await?;
        let body: Value = response.json().await?;

        // 空工作表不會回傳 values
        Ok(body
            .get("values")
            .and_then(Value::as_array)
            .map_or(0, Vec::len))
    }

    async fn write_rows(&self, sheet: &str, range: RowRange, rows: &[SheetRow]) -> Result<()> {
        self.put_values(&a1_range(sheet, range), rows).await
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        if self.sheet_titles().await?.iter().any(|t| t == sheet) {
            return Ok(());
        }

        tracing::info!("📄 Creating sheet '{}'", sheet);
        let url = self.url(&[format!("{}:batchUpdate", self.spreadsheet_id).as_str()])?;
        self.send(
            self.client.post(url).json(&json!({
                "requests": [{"addSheet": {"properties": {"title": sheet}}}]
            })),
            "addSheet",
        )
        .await?;

        let header: SheetRow = headers.iter().map(|h| h.to_string()).collect();
        let last_column = char::from(b'A' + (headers.len().clamp(1, 26) as u8 - 1));
        let range = RowRange::append_after(0, 1, last_column).map(|r| a1_range(sheet, r));
        match range {
            Some(range) => self.put_values(&range, &[header]).await,
            None => Ok(()),
        }
    }
}
