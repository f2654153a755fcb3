use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Largest page the posting-list endpoint honours.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// 遠端 API 回傳的一筆出貨單（posting），只在解析前短暫存在
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Posting {
    pub posting_number: String,
    /// 原始商品項目，欄位交給 parser 寬鬆處理
    pub products: Vec<Value>,
}

impl Posting {
    pub fn new(posting_number: impl Into<String>, products: Vec<Value>) -> Self {
        Self {
            posting_number: posting_number.into(),
            products,
        }
    }

    /// Builds a posting from an arbitrary JSON value without failing.
    ///
    /// A non-object value yields an empty posting; a non-array `products`
    /// field yields no products.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let products = obj
            .get("products")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Self {
            posting_number: lenient_string(obj.get("posting_number")),
            products,
        }
    }
}

/// Stringifies a scalar JSON field; `null`, missing and containers become "".
pub fn lenient_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// 一頁查詢結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub postings: Vec<Posting>,
    /// 空字串代表沒有下一頁
    pub cursor: String,
}

impl Page {
    pub fn from_value(value: &Value) -> Self {
        let postings = value
            .get("postings")
            .and_then(|v| v.as_array())
            .map(|items| items.iter().map(Posting::from_value).collect())
            .unwrap_or_default();

        Self {
            postings,
            cursor: lenient_string(value.get("cursor")),
        }
    }

    /// A page ends pagination when it has no cursor or carried no postings.
    pub fn is_terminal(&self) -> bool {
        self.cursor.is_empty() || self.postings.is_empty()
    }
}

/// One product line flattened out of a posting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub posting_number: String,
    pub offer_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: u64,
    pub picture_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDir {
    #[default]
    #[serde(alias = "asc")]
    Asc,
    #[serde(alias = "desc")]
    Desc,
}

/// `filter` object of the posting-list request.
///
/// Both cutoff bounds are mandatory on the wire; [`PostingFilter::resolve`]
/// fills whichever is missing. Anything else the API accepts goes in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_to: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostingFilter {
    /// Fills missing (or blank) bounds: `cutoff_from` becomes `now - lookback_days`,
    /// `cutoff_to` the last millisecond of the current UTC day.
    pub fn resolve(mut self, now: DateTime<Utc>, lookback_days: i64) -> Self {
        if self.cutoff_from.as_deref().map_or(true, str::is_empty) {
            let from = now - Duration::days(lookback_days);
            self.cutoff_from = Some(from.format("%Y-%m-%dT%H:%M:%S.000Z").to_string());
        }
        if self.cutoff_to.as_deref().map_or(true, str::is_empty) {
            self.cutoff_to = Some(now.format("%Y-%m-%dT23:59:59.999Z").to_string());
        }
        self
    }
}

/// Body of one posting-list call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingListRequest {
    pub filter: PostingFilter,
    pub limit: u32,
    pub sort_dir: SortDir,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

pub fn clamp_page_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Warehouse credentials as provided by the configuration layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub warehouse_name: String,
    #[serde(default)]
    pub city: String,
    pub client_id: String,
    pub api_key: String,
}

impl fmt::Debug for Warehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warehouse")
            .field("warehouse_name", &self.warehouse_name)
            .field("city", &self.city)
            .field("client_id", &self.client_id)
            .field("api_key", &"***")
            .finish()
    }
}

/// warehouse name -> allowed chat ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    entries: HashMap<String, BTreeSet<String>>,
}

impl AccessList {
    pub fn grant(&mut self, warehouse_name: &str, chat_id: &str) {
        let chat_id = chat_id.trim();
        if warehouse_name.is_empty() || chat_id.is_empty() {
            return;
        }
        self.entries
            .entry(warehouse_name.to_string())
            .or_default()
            .insert(chat_id.to_string());
    }

    pub fn is_allowed(&self, chat_id: &str, warehouse_name: &str) -> bool {
        self.entries
            .get(warehouse_name)
            .is_some_and(|ids| ids.contains(chat_id.trim()))
    }

    pub fn total_entries(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn warehouse_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// 已排序的商品列
    pub line_items: Vec<LineItem>,
    /// 不重複且非空的出貨單號，保持抓取順序
    pub posting_numbers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub warehouse_name: String,
    pub postings: usize,
    pub rows_written: usize,
    pub postings_logged: usize,
}
