use crate::domain::ports::{RowRange, SheetRow, SheetSink};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// 以本地 CSV 檔模擬試算表：每個工作表一個 `{sheet}.csv`
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    base_path: PathBuf,
}

impl CsvSheetStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", sheet))
    }

    pub fn read_rows(&self, sheet: &str) -> Result<Vec<SheetRow>> {
        read_rows(&self.sheet_path(sheet))
    }
}

fn read_rows(path: &Path) -> Result<Vec<SheetRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

// 先寫入同目錄的暫存檔再 rename，中途失敗時原檔保持完整
fn write_all(path: &Path, rows: &[SheetRow]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".sheet-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl SheetSink for CsvSheetStore {
    async fn row_count(&self, sheet: &str) -> Result<usize> {
        Ok(self.read_rows(sheet)?.len())
    }

    async fn write_rows(&self, sheet: &str, range: RowRange, rows: &[SheetRow]) -> Result<()> {
        if rows.len() != range.len() {
            return Err(EtlError::SinkError {
                message: format!("{} rows do not fit range {}", rows.len(), range),
            });
        }

        let path = self.sheet_path(sheet);
        let mut existing = read_rows(&path)?;
        if existing.len() < range.end {
            existing.resize(range.end, Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            existing[range.start - 1 + offset] = row.clone();
        }

        write_all(&path, &existing)?;
        tracing::debug!("Wrote {} rows to {}!{}", rows.len(), path.display(), range);
        Ok(())
    }

    async fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> Result<()> {
        let path = self.sheet_path(sheet);
        if path.exists() {
            return Ok(());
        }

        tracing::info!("📄 Creating sheet {}", path.display());
        let header: SheetRow = headers.iter().map(|h| h.to_string()).collect();
        write_all(&path, &[header])
    }
}
