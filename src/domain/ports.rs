use crate::domain::model::{AccessList, LoadSummary, Posting, PostingListRequest, TransformResult, Warehouse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// HTTP status and body of one exchange, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Failures below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    Timeout(String),
    Network(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Timeout(msg) => write!(f, "timed out: {}", msg),
            SendError::Network(msg) => write!(f, "network failure: {}", msg),
        }
    }
}

/// 對出貨單列表端點做一次呼叫，不做重試
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(&self, request: &PostingListRequest) -> std::result::Result<RawResponse, SendError>;
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub type SheetRow = Vec<String>;

/// Contiguous block of rows `A{start}:{last_column}{end}` (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
    pub last_column: char,
}

impl RowRange {
    /// Range for appending `len` rows under `existing_rows` rows; `None` for an empty batch.
    pub fn append_after(existing_rows: usize, len: usize, last_column: char) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let start = existing_rows + 1;
        Some(Self {
            start,
            end: start + len - 1,
            last_column,
        })
    }

    pub fn len(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}:{}{}", self.start, self.last_column, self.end)
    }
}

/// 表格型目的地（Google Sheets、本地 CSV 等）
#[async_trait]
pub trait SheetSink: Send + Sync {
    /// Number of rows currently present in `sheet`, header included.
    async fn row_count(&self, sheet: &str) -> Result<usize>;

    /// Writes `rows` into exactly `range` of `sheet` in one operation.
    async fn write_rows(&self, sheet: &str, range: RowRange, rows: &[SheetRow]) -> Result<()>;

    /// Creates `sheet` with a header row when it does not exist yet.
    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()>;
}

pub trait WarehouseDirectory: Send + Sync {
    fn warehouses(&self) -> Result<Vec<Warehouse>>;
    fn access_list(&self) -> Result<AccessList>;

    fn find_warehouse(&self, name: &str) -> Result<Option<Warehouse>> {
        Ok(self
            .warehouses()?
            .into_iter()
            .find(|w| w.warehouse_name == name))
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Posting>>;
    async fn transform(&self, postings: Vec<Posting>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadSummary>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_range_append_after() {
        let range = RowRange::append_after(10, 3, 'G').unwrap();
        assert_eq!(range.start, 11);
        assert_eq!(range.end, 13);
        assert_eq!(range.len(), 3);
        assert_eq!(range.to_string(), "A11:G13");

        assert!(RowRange::append_after(10, 0, 'G').is_none());
        assert_eq!(RowRange::append_after(0, 1, 'C').unwrap().to_string(), "A1:C1");
    }
}
