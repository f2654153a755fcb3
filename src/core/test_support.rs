// Shared doubles for the unit tests in `core`.

use crate::domain::model::PostingListRequest;
use crate::domain::ports::{ApiTransport, RawResponse, RowRange, SendError, SheetRow, SheetSink, Sleeper};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Scripted = std::result::Result<RawResponse, SendError>;

/// Replays a fixed list of responses and records every request it receives.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<PostingListRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PostingListRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn send(&self, request: &PostingListRequest) -> Scripted {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SendError::Network("script exhausted".to_string())))
    }
}

/// Successful page whose postings carry `n` products each.
pub fn ok_page(postings: &[(&str, usize)], cursor: &str) -> Scripted {
    let postings: Vec<_> = postings
        .iter()
        .map(|(number, n)| {
            let products: Vec<_> = (1..=*n)
                .map(|i| {
                    json!({
                        "offer_id": format!("р{}-п1-{}", i, number),
                        "product_name": format!("Product {}", i),
                        "sku": 100_000 + i,
                        "quantity": i,
                    })
                })
                .collect();
            json!({"posting_number": number, "products": products})
        })
        .collect();

    Ok(RawResponse {
        status: 200,
        body: json!({"postings": postings, "cursor": cursor}).to_string(),
    })
}

#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// In-memory sheets; a write always lands at the rows named by its range.
#[derive(Clone, Default)]
pub struct MemorySink {
    sheets: Arc<tokio::sync::Mutex<HashMap<String, Vec<SheetRow>>>>,
    writes: Arc<tokio::sync::Mutex<Vec<(String, RowRange)>>>,
    fail_writes: bool,
    fail_setup: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn failing_setup() -> Self {
        Self {
            fail_setup: true,
            ..Default::default()
        }
    }

    pub async fn with_rows(sheet: &str, rows: Vec<SheetRow>) -> Self {
        let sink = Self::default();
        sink.sheets.lock().await.insert(sheet.to_string(), rows);
        sink
    }

    pub async fn rows(&self, sheet: &str) -> Vec<SheetRow> {
        self.sheets
            .lock()
            .await
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn writes(&self) -> Vec<(String, RowRange)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl SheetSink for MemorySink {
    async fn row_count(&self, sheet: &str) -> Result<usize> {
        Ok(self.sheets.lock().await.get(sheet).map_or(0, Vec::len))
    }

    async fn write_rows(&self, sheet: &str, range: RowRange, rows: &[SheetRow]) -> Result<()> {
        if self.fail_writes {
            return Err(EtlError::SinkError {
                message: "quota exceeded".to_string(),
            });
        }
        let mut sheets = self.sheets.lock().await;
        let existing = sheets.entry(sheet.to_string()).or_default();
        if existing.len() < range.end {
            existing.resize(range.end, Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            existing[range.start - 1 + offset] = row.clone();
        }
        self.writes.lock().await.push((sheet.to_string(), range));
        Ok(())
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        if self.fail_setup {
            return Err(EtlError::SinkError {
                message: "permission denied".to_string(),
            });
        }
        let mut sheets = self.sheets.lock().await;
        sheets
            .entry(sheet.to_string())
            .or_insert_with(|| vec![headers.iter().map(|h| h.to_string()).collect()]);
        Ok(())
    }
}
