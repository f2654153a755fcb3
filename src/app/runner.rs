use crate::adapters::{CsvSheetStore, GoogleSheetsSink, OzonHttpTransport};
use crate::config::{ConfigDirectory, EtlConfig};
use crate::core::etl::EtlEngine;
use crate::core::fetcher::PaginatedFetcher;
use crate::core::pipeline::{PipelineOptions, PostingPipeline};
use crate::core::sheet_writer::BatchSheetWriter;
use crate::core::transport::TransportSession;
use crate::domain::model::{LoadSummary, Warehouse};
use crate::domain::ports::{SheetSink, WarehouseDirectory};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunRequest<'a> {
    pub warehouse: &'a str,
    pub chat_id: Option<&'a str>,
    pub dry_run: bool,
}

/// Resolves the warehouse and, when a chat id is given, checks it against the access list.
pub fn authorize<D: WarehouseDirectory>(
    directory: &D,
    warehouse_name: &str,
    chat_id: Option<&str>,
) -> Result<Warehouse> {
    let warehouse = directory
        .find_warehouse(warehouse_name)?
        .ok_or_else(|| EtlError::UnknownWarehouse {
            name: warehouse_name.to_string(),
        })?;

    if let Some(chat_id) = chat_id {
        if !directory.access_list()?.is_allowed(chat_id, warehouse_name) {
            tracing::warn!("🚫 Chat {} denied for warehouse {}", chat_id, warehouse_name);
            return Err(EtlError::AccessDenied {
                chat_id: chat_id.to_string(),
                warehouse: warehouse_name.to_string(),
            });
        }
    }

    Ok(warehouse)
}

/// 依設定選擇目的地並執行單一倉庫的 ETL
pub async fn run_warehouse(config: &EtlConfig, request: &RunRequest<'_>) -> Result<LoadSummary> {
    let directory = ConfigDirectory::from_config(config);
    let warehouse = authorize(&directory, request.warehouse, request.chat_id)?;
    tracing::info!(
        "🏭 Warehouse {} ({})",
        warehouse.warehouse_name,
        if warehouse.city.is_empty() { "-" } else { warehouse.city.as_str() }
    );

    if config.is_google_sheets() {
        let sink = GoogleSheetsSink::new(
            &config.sink.endpoint,
            config.sink.spreadsheet_id.as_deref().unwrap_or_default(),
            config.sink.access_token.as_deref().unwrap_or_default(),
            Duration::from_secs(config.sink.timeout_seconds),
        )?;
        run_with_sink(config, &warehouse, sink, request.dry_run).await
    } else {
        let output_path = config.sink.output_path.as_deref().unwrap_or("./output");
        run_with_sink(config, &warehouse, CsvSheetStore::new(output_path), request.dry_run).await
    }
}

pub async fn run_with_sink<K: SheetSink>(
    config: &EtlConfig,
    warehouse: &Warehouse,
    sink: K,
    dry_run: bool,
) -> Result<LoadSummary> {
    let transport = OzonHttpTransport::new(&config.http_settings(), warehouse)?;
    let session = TransportSession::new(transport, config.retry_policy());
    let fetcher = PaginatedFetcher::new(session, config.fetch_settings());
    let writer = Arc::new(BatchSheetWriter::new(sink, config.sheet_names()));

    let pipeline = PostingPipeline::new(
        warehouse.warehouse_name.clone(),
        fetcher,
        writer,
        PipelineOptions {
            filter: config.posting_filter(),
            sort_policy: config.sort_policy(),
            record_processed: config.sink.record_processed,
            dry_run,
        },
    );

    EtlEngine::new(pipeline).run().await
}
