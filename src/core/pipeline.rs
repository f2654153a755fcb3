use crate::core::fetcher::PaginatedFetcher;
use crate::core::order_key::{sort_line_items, SortPolicy};
use crate::core::parser::flatten_all;
use crate::core::sheet_writer::{BatchSheetWriter, WriteContext};
use crate::core::transport::TokioSleeper;
use crate::domain::model::{LoadSummary, Posting, PostingFilter, TransformResult};
use crate::domain::ports::{ApiTransport, Pipeline, SheetSink, Sleeper};
use crate::utils::error::{EtlError, Result};
use chrono::Local;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub filter: Option<PostingFilter>,
    pub sort_policy: SortPolicy,
    /// 寫入成功後是否記錄已處理的出貨單
    pub record_processed: bool,
    /// Fetch and sort only; nothing is written.
    pub dry_run: bool,
}

/// 單一倉庫的出貨單管道：抓取 -> 攤平排序 -> 批次寫入
pub struct PostingPipeline<T: ApiTransport, K: SheetSink, S: Sleeper = TokioSleeper> {
    warehouse_name: String,
    fetcher: PaginatedFetcher<T, S>,
    writer: Arc<BatchSheetWriter<K>>,
    options: PipelineOptions,
}

impl<T: ApiTransport, K: SheetSink, S: Sleeper> PostingPipeline<T, K, S> {
    pub fn new(
        warehouse_name: impl Into<String>,
        fetcher: PaginatedFetcher<T, S>,
        writer: Arc<BatchSheetWriter<K>>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            warehouse_name: warehouse_name.into(),
            fetcher,
            writer,
            options,
        }
    }
}

#[async_trait::async_trait]
impl<T: ApiTransport, K: SheetSink, S: Sleeper> Pipeline for PostingPipeline<T, K, S> {
    async fn extract(&self) -> Result<Vec<Posting>> {
        tracing::debug!("Fetching postings for warehouse {}", self.warehouse_name);
        let postings = self.fetcher.fetch_all(self.options.filter.clone()).await?;
        Ok(postings)
    }

    async fn transform(&self, postings: Vec<Posting>) -> Result<TransformResult> {
        let mut result = flatten_all(&postings);
        sort_line_items(&mut result.line_items, self.options.sort_policy);

        tracing::debug!(
            "Flattened {} postings into {} line items ({:?} order)",
            postings.len(),
            result.line_items.len(),
            self.options.sort_policy
        );
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<LoadSummary> {
        let mut summary = LoadSummary {
            warehouse_name: self.warehouse_name.clone(),
            postings: result.posting_numbers.len(),
            ..Default::default()
        };

        if self.options.dry_run {
            for item in &result.line_items {
                tracing::info!(
                    "🧪 [dry-run] {} | {} | {} x{}",
                    item.posting_number,
                    item.offer_id,
                    item.product_name,
                    item.quantity
                );
            }
            return Ok(summary);
        }

        if result.line_items.is_empty() {
            tracing::info!("No line items for warehouse {}, nothing to write", self.warehouse_name);
            return Ok(summary);
        }

        let context = WriteContext {
            warehouse_name: &self.warehouse_name,
        };

        // 表頭建立失敗不擋寫入，append 本身會回報真正的錯誤
        if let Err(e) = self.writer.prepare().await {
            tracing::warn!("🔶 Could not prepare sheets for {}: {}", self.warehouse_name, e);
        }

        if !self.writer.append_batch(&result.line_items, &context).await {
            return Err(EtlError::SinkError {
                message: format!(
                    "batch write of {} rows to '{}' failed",
                    result.line_items.len(),
                    self.writer.sheets().tasks
                ),
            });
        }
        summary.rows_written = result.line_items.len();

        if self.options.record_processed
            && self
                .writer
                .record_processed(&result.posting_numbers, &context, Local::now())
                .await
        {
            summary.postings_logged = result.posting_numbers.len();
        }

        Ok(summary)
    }
}
