use crate::core::transport::{FetchError, TokioSleeper, TransportSession};
use crate::domain::model::{
    clamp_page_size, Page, Posting, PostingFilter, PostingListRequest, SortDir, MAX_PAGE_SIZE,
};
use crate::domain::ports::{ApiTransport, Sleeper};
use chrono::Utc;
use tracing::{debug, info};

pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub page_size: u32,
    pub sort_dir: SortDir,
    pub lookback_days: i64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            sort_dir: SortDir::Asc,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

/// 以 cursor 分頁抓取全部出貨單
pub struct PaginatedFetcher<T: ApiTransport, S: Sleeper = TokioSleeper> {
    session: TransportSession<T, S>,
    settings: FetchSettings,
}

impl<T: ApiTransport, S: Sleeper> PaginatedFetcher<T, S> {
    pub fn new(session: TransportSession<T, S>, settings: FetchSettings) -> Self {
        Self { session, settings }
    }

    pub fn session(&self) -> &TransportSession<T, S> {
        &self.session
    }

    /// Applies the default time window to whatever bounds the caller left out.
    pub fn resolve_filter(&self, filter: Option<PostingFilter>) -> PostingFilter {
        filter
            .unwrap_or_default()
            .resolve(Utc::now(), self.settings.lookback_days)
    }

    fn build_request(&self, filter: &PostingFilter, cursor: Option<String>) -> PostingListRequest {
        PostingListRequest {
            filter: filter.clone(),
            limit: clamp_page_size(self.settings.page_size),
            sort_dir: self.settings.sort_dir,
            cursor: cursor.filter(|c| !c.is_empty()),
        }
    }

    /// Fetches a single page.
    pub async fn fetch_page(
        &self,
        filter: Option<PostingFilter>,
        cursor: Option<String>,
    ) -> Result<Page, FetchError> {
        let filter = self.resolve_filter(filter);
        self.session.call(&self.build_request(&filter, cursor)).await
    }

    /// Fetches every page in cursor order.
    ///
    /// Stops as soon as a page comes back without a cursor or without
    /// postings. Errors from the session propagate unchanged.
    pub async fn fetch_all(&self, filter: Option<PostingFilter>) -> Result<Vec<Posting>, FetchError> {
        let filter = self.resolve_filter(filter);
        info!(
            "📥 Fetching postings: cutoff_from={}, cutoff_to={}",
            filter.cutoff_from.as_deref().unwrap_or_default(),
            filter.cutoff_to.as_deref().unwrap_or_default()
        );

        let mut postings = Vec::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let request = self.build_request(&filter, cursor.take());
            let page = self.session.call(&request).await?;
            pages += 1;

            let terminal = page.is_terminal();
            debug!(
                "📥 Page {}: {} postings, cursor={:?}",
                pages,
                page.postings.len(),
                page.cursor
            );
            postings.extend(page.postings);

            if terminal {
                break;
            }
            cursor = Some(page.cursor);
        }

        info!("📥 Fetched {} postings across {} page(s)", postings.len(), pages);
        Ok(postings)
    }
}
