use crate::adapters::google_sheets::DEFAULT_SHEETS_ENDPOINT;
use crate::adapters::ozon_http::{HttpSettings, DEFAULT_ENDPOINT};
use crate::core::fetcher::{FetchSettings, DEFAULT_LOOKBACK_DAYS};
use crate::core::order_key::SortPolicy;
use crate::core::sheet_writer::{SheetNames, DEFAULT_PROCESSED_SHEET, DEFAULT_TASKS_SHEET};
use crate::core::transport::{is_client_error, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::domain::model::{PostingFilter, SortDir, MAX_PAGE_SIZE};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_one_of, validate_path, validate_range,
    validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

pub const SINK_TYPES: [&str; 2] = ["csv", "google_sheets"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EtlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub warehouses: Vec<WarehouseEntry>,
    #[serde(default)]
    pub access: Vec<AccessEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub page_size: u32,
    pub sort_dir: SortDir,
    pub lookback_days: i64,
    /// 額外的 filter 欄位（例如 delivery_method_id），原樣送出
    pub filter: Map<String, Value>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_seconds: 30,
            request_timeout_seconds: 120,
            page_size: MAX_PAGE_SIZE,
            sort_dir: SortDir::Asc,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            filter: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    /// Statuses below 500 that should also be retried, e.g. `[429]`.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: 1000,
            retryable_statuses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub r#type: String,
    pub output_path: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub tasks_sheet: String,
    pub processed_sheet: String,
    pub record_processed: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            r#type: "csv".to_string(),
            output_path: Some("./output".to_string()),
            spreadsheet_id: None,
            access_token: None,
            endpoint: DEFAULT_SHEETS_ENDPOINT.to_string(),
            timeout_seconds: 60,
            tasks_sheet: DEFAULT_TASKS_SHEET.to_string(),
            processed_sheet: DEFAULT_PROCESSED_SHEET.to_string(),
            record_processed: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub policy: SortPolicy,
}

/// Raw `[[warehouses]]` row; incomplete rows are dropped by the directory.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseEntry {
    pub warehouse_name: Option<String>,
    pub city: Option<String>,
    pub client_id: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for WarehouseEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseEntry")
            .field("warehouse_name", &self.warehouse_name)
            .field("city", &self.city)
            .field("client_id", &self.client_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEntry {
    pub warehouse_name: String,
    /// TOML 可寫成字串或整數
    #[serde(deserialize_with = "string_or_integer")]
    pub chat_id: String,
}

fn string_or_integer<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

impl EtlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OZON_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.retryable_statuses.iter().fold(
            RetryPolicy::new(
                self.retry.max_attempts,
                Duration::from_millis(self.retry.backoff_base_ms),
            ),
            |policy, status| policy.with_retryable_status(*status),
        )
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            page_size: self.source.page_size,
            sort_dir: self.source.sort_dir,
            lookback_days: self.source.lookback_days,
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            endpoint: self.source.endpoint.clone(),
            connect_timeout: Duration::from_secs(self.source.connect_timeout_seconds),
            request_timeout: Duration::from_secs(self.source.request_timeout_seconds),
        }
    }

    /// Extra filter fields; the cutoff bounds are left to the fetcher's defaults.
    pub fn posting_filter(&self) -> Option<PostingFilter> {
        if self.source.filter.is_empty() {
            return None;
        }

        let mut extra = self.source.filter.clone();
        let take = |extra: &mut Map<String, Value>, key: &str| {
            extra
                .remove(key)
                .and_then(|v| v.as_str().map(str::to_string))
        };
        Some(PostingFilter {
            cutoff_from: take(&mut extra, "cutoff_from"),
            cutoff_to: take(&mut extra, "cutoff_to"),
            extra,
        })
    }

    pub fn sheet_names(&self) -> SheetNames {
        SheetNames {
            tasks: self.sink.tasks_sheet.clone(),
            processed: self.sink.processed_sheet.clone(),
        }
    }

    pub fn sort_policy(&self) -> SortPolicy {
        self.sort.policy
    }

    pub fn is_google_sheets(&self) -> bool {
        self.sink.r#type.eq_ignore_ascii_case("google_sheets")
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_url("source.endpoint", &self.source.endpoint)?;
        validate_range("source.page_size", self.source.page_size, 1, MAX_PAGE_SIZE)?;
        validate_range("source.lookback_days", self.source.lookback_days, 1, 365)?;
        validate_range(
            "source.connect_timeout_seconds",
            self.source.connect_timeout_seconds,
            1,
            600,
        )?;
        validate_range(
            "source.request_timeout_seconds",
            self.source.request_timeout_seconds,
            1,
            3600,
        )?;

        validate_range("retry.max_attempts", self.retry.max_attempts, 1, 10)?;
        validate_range("retry.backoff_base_ms", self.retry.backoff_base_ms, 0, 60_000)?;
        for status in &self.retry.retryable_statuses {
            validate_range("retry.retryable_statuses", *status, 400, 599)?;
            if is_client_error(*status) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "retry.retryable_statuses".to_string(),
                    value: status.to_string(),
                    reason: "400, 401 and 403 are never retried".to_string(),
                });
            }
        }

        validate_one_of("sink.type", &self.sink.r#type, &SINK_TYPES)?;
        validate_non_empty_string("sink.tasks_sheet", &self.sink.tasks_sheet)?;
        validate_non_empty_string("sink.processed_sheet", &self.sink.processed_sheet)?;

        if self.is_google_sheets() {
            let id = validate_required_field("sink.spreadsheet_id", &self.sink.spreadsheet_id)?;
            validate_non_empty_string("sink.spreadsheet_id", id)?;
            let token = validate_required_field("sink.access_token", &self.sink.access_token)?;
            if token.trim().is_empty() || token.starts_with("${") {
                return Err(EtlError::MissingConfigError {
                    field: "sink.access_token".to_string(),
                });
            }
            validate_url("sink.endpoint", &self.sink.endpoint)?;
        } else {
            let path = validate_required_field("sink.output_path", &self.sink.output_path)?;
            validate_path("sink.output_path", path)?;
        }

        Ok(())
    }
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
