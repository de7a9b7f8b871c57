//! Published view of the search state

use crate::controller::channel::{Channel, ChannelPhase, ChannelStatus};
use crate::pagination::{compute_window, PageSlot};
use crate::query::QuerySignature;
use crate::types::{PageInfo, Product, Suggestion, ViewMode};

/// Snapshot of everything a front end renders
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    /// Text as typed
    pub input: String,
    pub signature: QuerySignature,
    /// URL query string mirroring `signature`
    pub query_string: String,
    /// Signature the displayed results belong to
    pub results_for: Option<QuerySignature>,
    pub products: Vec<Product>,
    pub page_info: Option<PageInfo>,
    pub pages: Vec<PageSlot>,
    pub suggestions: Vec<Suggestion>,
    pub previews: Vec<Product>,
    pub recent: Vec<String>,
    pub view_mode: ViewMode,
    pub main: ChannelStatus,
    pub suggest: ChannelStatus,
    pub instant: ChannelStatus,
}

impl SearchView {
    pub fn status(&self, channel: Channel) -> &ChannelStatus {
        match channel {
            Channel::Main => &self.main,
            Channel::Suggest => &self.suggest,
            Channel::Instant => &self.instant,
        }
    }

    pub fn status_mut(&mut self, channel: Channel) -> &mut ChannelStatus {
        match channel {
            Channel::Main => &mut self.main,
            Channel::Suggest => &mut self.suggest,
            Channel::Instant => &mut self.instant,
        }
    }

    /// "Found N products" once a result set is displayed
    pub fn summary(&self) -> Option<String> {
        self.results_for.as_ref()?;
        let total = self.page_info?.total_products;
        let noun = if total == 1 { "product" } else { "products" };
        Some(format!("Found {} {}", total, noun))
    }

    /// A successful search that matched nothing. Rendered as the empty
    /// state with a clear-filters action, not as an error.
    pub fn is_empty_result(&self) -> bool {
        self.results_for.is_some() && self.products.is_empty() && self.main.error.is_none()
    }

    /// Whether the current filters can be cleared from the empty state
    pub fn can_clear_filters(&self) -> bool {
        self.is_empty_result() && self.signature.has_filters()
    }

    pub fn can_retry(&self) -> bool {
        self.main.phase == ChannelPhase::Failed && self.main.error.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.main.is_loading()
    }

    pub(crate) fn show_results(&mut self, signature: QuerySignature, products: Vec<Product>, page_info: PageInfo) {
        self.pages = compute_window(page_info.current_page, page_info.total_pages);
        self.products = products;
        self.page_info = Some(page_info);
        self.results_for = Some(signature);
        self.main.error = None;
    }

    pub(crate) fn clear_results(&mut self) {
        self.products.clear();
        self.page_info = None;
        self.pages.clear();
        self.results_for = None;
    }
}
