use crate::domain::model::LineItem;
use crate::domain::ports::{RowRange, SheetRow, SheetSink};
use crate::utils::error::Result;
use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub const DEFAULT_TASKS_SHEET: &str = "Tasks";
pub const DEFAULT_PROCESSED_SHEET: &str = "ProcessedOrders";

pub const TASK_HEADERS: [&str; 7] = [
    "Номер отправления",
    "Фото",
    "Offer ID",
    "Наименование",
    "Артикул",
    "Кол-во",
    "Этикетка",
];
pub const TASK_LAST_COLUMN: char = 'G';

pub const PROCESSED_HEADERS: [&str; 3] = ["Номер отправления", "Название склада", "Дата обработки"];
pub const PROCESSED_LAST_COLUMN: char = 'C';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub tasks: String,
    pub processed: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            tasks: DEFAULT_TASKS_SHEET.to_string(),
            processed: DEFAULT_PROCESSED_SHEET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    pub warehouse_name: &'a str,
}

/// Task row: order id, image, offer id, name, sku, quantity, empty label.
pub fn task_row(item: &LineItem) -> SheetRow {
    vec![
        item.posting_number.clone(),
        item.picture_url.clone(),
        item.offer_id.clone(),
        item.product_name.clone(),
        item.sku.clone(),
        item.quantity.to_string(),
        String::new(),
    ]
}

/// 以一次批次寫入把商品列附加到工作表末端
///
/// The start row is read right before the write. Within one writer the
/// read-then-write pair runs under a lease, so two appends through the same
/// writer never target the same rows.
pub struct BatchSheetWriter<K: SheetSink> {
    sink: K,
    sheets: SheetNames,
    lease: Mutex<()>,
}

impl<K: SheetSink> BatchSheetWriter<K> {
    pub fn new(sink: K, sheets: SheetNames) -> Self {
        Self {
            sink,
            sheets,
            lease: Mutex::new(()),
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sheets(&self) -> &SheetNames {
        &self.sheets
    }

    /// Creates the tasks and processed-orders sheets (with headers) if missing.
    pub async fn prepare(&self) -> Result<()> {
        self.sink
            .ensure_sheet(&self.sheets.tasks, &TASK_HEADERS)
            .await?;
        self.sink
            .ensure_sheet(&self.sheets.processed, &PROCESSED_HEADERS)
            .await
    }

    /// Appends `items` to the tasks sheet in one write.
    ///
    /// Returns `true` when the whole batch landed (an empty batch is a
    /// successful no-op) and `false` when nothing may be assumed written.
    pub async fn append_batch(&self, items: &[LineItem], context: &WriteContext<'_>) -> bool {
        let rows: Vec<SheetRow> = items.iter().map(task_row).collect();

        match self
            .append_rows(&self.sheets.tasks, rows, TASK_LAST_COLUMN)
            .await
        {
            Ok(Some(range)) => {
                info!(
                    "💾 Added {} rows to {}!{} for warehouse {}",
                    items.len(),
                    self.sheets.tasks,
                    range,
                    context.warehouse_name
                );
                true
            }
            Ok(None) => true,
            Err(e) => {
                error!(
                    "❌ Batch write to '{}' failed for warehouse {}: {}",
                    self.sheets.tasks, context.warehouse_name, e
                );
                false
            }
        }
    }

    /// Records processed posting numbers with the warehouse and a local timestamp.
    pub async fn record_processed(
        &self,
        posting_numbers: &[String],
        context: &WriteContext<'_>,
        processed_at: DateTime<Local>,
    ) -> bool {
        let stamp = processed_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let rows: Vec<SheetRow> = posting_numbers
            .iter()
            .map(|number| {
                vec![
                    number.clone(),
                    context.warehouse_name.to_string(),
                    stamp.clone(),
                ]
            })
            .collect();

        match self
            .append_rows(&self.sheets.processed, rows, PROCESSED_LAST_COLUMN)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "🔶 Could not log processed postings for warehouse {}: {}",
                    context.warehouse_name, e
                );
                false
            }
        }
    }

    async fn append_rows(
        &self,
        sheet: &str,
        rows: Vec<SheetRow>,
        last_column: char,
    ) -> Result<Option<RowRange>> {
        if rows.is_empty() {
            return Ok(None);
        }

        let _lease = self.lease.lock().await;
        let existing = self.sink.row_count(sheet).await?;
        let Some(range) = RowRange::append_after(existing, rows.len(), last_column) else {
            return Ok(None);
        };
        self.sink.write_rows(sheet, range, &rows).await?;
        Ok(Some(range))
    }
}
