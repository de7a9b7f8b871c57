//! Incremental search controller
//!
//! `SearchController` owns the query store, the three channel timers, the
//! fetch gateway, the caches, the recent-search ledger and the view. It
//! reacts to three kinds of input: commands from the front end, debounce
//! timer fires and fetch completions. All of them are processed on a
//! single task (see [`runtime`]), so none of the state needs locking.

pub mod channel;
pub mod debounce;
pub mod gateway;
pub mod providers;
pub mod reconciler;
pub mod runtime;
pub mod view;

use crate::cache::{CacheEntry, CacheStats, ResponseCache};
use crate::client::{SearchApi, SearchRequest};
use crate::config::SearchConfig;
use crate::ledger::RecentSearches;
use crate::query::{FilterChange, QuerySignature, QueryStore, StoreChange};
use crate::storage::{KeyValueStore, VIEW_MODE_KEY};
use crate::types::ViewMode;
use channel::{Channel, ChannelEvent, Settlement};
use debounce::{Debouncer, TimerFired};
use gateway::{ChannelPayload, Completion, FetchGateway, FetchOutcome};
use providers::{PreviewKind, PreviewProvider};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use view::SearchView;

pub use runtime::SearchHandle;

/// Requests a front end can make
#[derive(Debug)]
pub enum SearchCommand {
    /// The text box changed
    SetTerm(String),
    SetFilter(FilterChange),
    ClearFilters,
    /// Explicit submission (Enter, suggestion click, category chip)
    Commit(String),
    /// Submit whatever is currently in the text box
    CommitCurrent,
    GoToPage(u32),
    /// Re-run the current query after a main-channel failure, skipping the cache
    Retry,
    /// Restore state from a URL query string (back/forward)
    Navigate(String),
    ClearRecent,
    SetViewMode(ViewMode),
    /// Reply with the view once every earlier command has been applied
    Snapshot(oneshot::Sender<SearchView>),
    Shutdown,
}

/// Receivers the controller loop listens on besides commands
pub struct ControllerInbox {
    pub timers: mpsc::UnboundedReceiver<TimerFired>,
    pub completions: mpsc::UnboundedReceiver<Completion>,
}

pub struct SearchController {
    config: SearchConfig,
    api: Arc<dyn SearchApi>,
    storage: Arc<dyn KeyValueStore>,
    store: QueryStore,
    main_timer: Debouncer,
    suggestions: PreviewProvider,
    instant: PreviewProvider,
    gateway: FetchGateway,
    cache: ResponseCache,
    ledger: RecentSearches,
    view: SearchView,
}

impl SearchController {
    /// Build a controller around its collaborators. Persisted recent
    /// searches and view mode are restored from `storage`.
    pub fn new(
        config: SearchConfig,
        api: Arc<dyn SearchApi>,
        storage: Arc<dyn KeyValueStore>,
    ) -> (Self, ControllerInbox) {
        let (timer_tx, timers) = mpsc::unbounded_channel();
        let (completion_tx, completions) = mpsc::unbounded_channel();

        let ledger = RecentSearches::load(storage.clone(), config.recent_max);
        let view_mode = load_view_mode(storage.as_ref());

        let mut controller = Self {
            main_timer: Debouncer::new(Channel::Main, config.main_debounce(), timer_tx.clone()),
            suggestions: PreviewProvider::new(PreviewKind::Suggestions, &config, timer_tx.clone()),
            instant: PreviewProvider::new(PreviewKind::Instant, &config, timer_tx),
            gateway: FetchGateway::new(completion_tx),
            cache: ResponseCache::new(config.cache_max),
            store: QueryStore::new(),
            view: SearchView {
                view_mode,
                ..SearchView::default()
            },
            ledger,
            config,
            api,
            storage,
        };
        controller.refresh_view();

        (controller, ControllerInbox { timers, completions })
    }

    pub fn view(&self) -> &SearchView {
        &self.view
    }

    pub fn current(&self) -> &QuerySignature {
        self.store.current()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Apply one command. Returns false once the controller should stop.
    pub fn handle_command(&mut self, command: SearchCommand) -> bool {
        log::trace!("Handling command: {:?}", command);
        match command {
            SearchCommand::SetTerm(text) => self.set_term(&text),
            SearchCommand::SetFilter(change) => self.set_filter(change),
            SearchCommand::ClearFilters => {
                let change = self.store.clear_filters();
                self.after_filter_change(change);
            }
            SearchCommand::Commit(text) => self.commit(&text),
            SearchCommand::CommitCurrent => {
                let text = self.store.input().to_string();
                self.commit(&text);
            }
            SearchCommand::GoToPage(page) => self.go_to_page(page),
            SearchCommand::Retry => self.retry(),
            SearchCommand::Navigate(query) => self.navigate(&query),
            SearchCommand::ClearRecent => {
                if let Err(e) = self.ledger.clear() {
                    log::warn!("Failed to clear recent searches: {}", e);
                }
            }
            SearchCommand::SetViewMode(mode) => self.set_view_mode(mode),
            SearchCommand::Snapshot(reply) => {
                let _ = reply.send(self.view.clone());
            }
            SearchCommand::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        self.refresh_view();
        true
    }

    /// A debounce timer elapsed
    pub fn on_timer(&mut self, fired: TimerFired) {
        match fired.channel {
            Channel::Main => {
                if self.main_timer.accept(&fired) {
                    self.fire_main(false);
                }
            }
            Channel::Suggest => {
                if self.suggestions.debouncer().accept(&fired) {
                    self.fire_preview(Channel::Suggest);
                }
            }
            Channel::Instant => {
                if self.instant.debouncer().accept(&fired) {
                    self.fire_preview(Channel::Instant);
                }
            }
        }
        self.refresh_view();
    }

    /// A dispatch settled. Runs exactly once per dispatch.
    pub fn on_completion(&mut self, completion: Completion) {
        let Completion {
            channel,
            id,
            signature,
            outcome,
        } = completion;

        // A request that lost its pending slot was cancelled, whatever it
        // managed to fetch
        let outcome = if self.gateway.settle(channel, id) {
            outcome
        } else {
            FetchOutcome::Cancelled
        };

        match outcome {
            FetchOutcome::Cancelled => {
                log::debug!("{} request {} cancelled", channel, id);
                self.view
                    .status_mut(channel)
                    .apply(ChannelEvent::Settled(id, Settlement::Cancelled));
            }
            FetchOutcome::Failed(e) => {
                self.view
                    .status_mut(channel)
                    .apply(ChannelEvent::Settled(id, Settlement::Failed));
                self.on_failure(channel, &signature, e.to_string());
            }
            FetchOutcome::Resolved(payload) => {
                self.view
                    .status_mut(channel)
                    .apply(ChannelEvent::Settled(id, Settlement::Resolved));
                self.remember(channel, &signature, &payload);
                reconciler::reconcile(&mut self.view, self.store.current(), channel, signature, payload);
            }
        }
        self.refresh_view();
    }

    /// Stop every timer and abort every request
    pub fn shutdown(&mut self) {
        self.main_timer.cancel();
        self.suggestions.debouncer().cancel();
        self.instant.debouncer().cancel();
        self.gateway.cancel_all();
        log::debug!("Search controller shut down");
    }

    fn set_term(&mut self, text: &str) {
        let change = self.store.set_term(text);
        if change.term_changed {
            self.schedule_main();
            self.schedule_previews();
        }
    }

    fn set_filter(&mut self, change: FilterChange) {
        let change = self.store.apply(change);
        self.after_filter_change(change);
    }

    fn after_filter_change(&mut self, change: StoreChange) {
        // Previews ignore filters, so only the main channel restarts
        if change.signature_changed {
            self.schedule_main();
        }
    }

    fn commit(&mut self, text: &str) {
        self.store.set_term(text);
        let term = self.store.current().term.clone();
        if term.is_empty() {
            self.clear_preview(Channel::Suggest);
            self.clear_preview(Channel::Instant);
            self.schedule_main();
            return;
        }

        match self.ledger.record(&term) {
            Ok(_) => log::debug!("Recorded recent search '{}'", term),
            Err(e) => log::warn!("Failed to persist recent search '{}': {}", term, e),
        }
        self.schedule_main();
        self.schedule_previews();
    }

    fn go_to_page(&mut self, page: u32) {
        let current = self.store.current();
        let known = match &self.view.results_for {
            Some(shown) if shown.same_query(current) => self.view.page_info,
            _ => None,
        };
        let page = match known {
            Some(info) if info.total_pages > 0 => page.clamp(1, info.total_pages),
            _ => page.max(1),
        };
        let change = self.store.apply(FilterChange::Page(page));
        self.after_filter_change(change);
    }

    fn retry(&mut self) {
        if !self.view.can_retry() {
            log::debug!("Nothing to retry");
            return;
        }
        self.main_timer.cancel();
        self.fire_main(true);
    }

    fn navigate(&mut self, query: &str) {
        let change = self.store.replace(QuerySignature::from_query_string(query));
        if change.signature_changed {
            self.schedule_main();
        }
        if change.term_changed {
            self.schedule_previews();
        }
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        self.view.view_mode = mode;
        if let Err(e) = self.storage.set(VIEW_MODE_KEY, mode.as_str()) {
            log::warn!("Failed to persist view mode: {}", e);
        }
    }

    /// Main results need a term or a category to browse
    fn main_eligible(signature: &QuerySignature) -> bool {
        !signature.term.is_empty() || signature.category.is_some()
    }

    fn schedule_main(&mut self) {
        if Self::main_eligible(self.store.current()) {
            self.main_timer.schedule();
            self.view.main.apply(ChannelEvent::Scheduled);
            return;
        }

        self.main_timer.cancel();
        self.gateway.cancel(Channel::Main);
        self.view.clear_results();
        self.view.main.error = None;
        self.view.main.apply(ChannelEvent::Cleared);
    }

    fn schedule_previews(&mut self) {
        for channel in [Channel::Suggest, Channel::Instant] {
            let provider = match channel {
                Channel::Suggest => &mut self.suggestions,
                _ => &mut self.instant,
            };
            if provider.accepts(&self.store.current().term) {
                provider.debouncer().schedule();
                self.view.status_mut(channel).apply(ChannelEvent::Scheduled);
            } else {
                self.clear_preview(channel);
            }
        }
    }

    /// Drop a preview channel's timer, request and visible list
    fn clear_preview(&mut self, channel: Channel) {
        match channel {
            Channel::Suggest => {
                self.suggestions.debouncer().cancel();
                self.view.suggestions.clear();
            }
            Channel::Instant => {
                self.instant.debouncer().cancel();
                self.view.previews.clear();
            }
            Channel::Main => return,
        }
        self.gateway.cancel(channel);
        let status = self.view.status_mut(channel);
        status.error = None;
        status.apply(ChannelEvent::Cleared);
    }

    fn fire_main(&mut self, bypass_cache: bool) {
        let signature = self.store.current().clone();
        if !Self::main_eligible(&signature) {
            self.schedule_main();
            return;
        }

        if !bypass_cache {
            if let Some(entry) = self.cache.get(&signature).cloned() {
                log::debug!("Cache hit for {}", signature);
                self.gateway.cancel(Channel::Main);
                self.view.main.apply(ChannelEvent::CacheHit);
                self.view.show_results(signature, entry.products, entry.pagination);
                return;
            }
        }

        let request = SearchRequest::main(signature.clone(), self.config.page_size);
        let api = self.api.clone();
        let id = self.gateway.dispatch(Channel::Main, signature, async move {
            api.search(request).await.map(ChannelPayload::Results)
        });
        self.view.main.apply(ChannelEvent::Dispatched(id));
    }

    fn fire_preview(&mut self, channel: Channel) {
        let term = self.store.current().term.clone();
        let provider = match channel {
            Channel::Suggest => &mut self.suggestions,
            Channel::Instant => &mut self.instant,
            Channel::Main => return,
        };
        if !provider.accepts(&term) {
            self.clear_preview(channel);
            return;
        }

        let signature = QuerySignature::for_term(term.as_str());
        if let Some(payload) = provider.lookup(&term) {
            log::debug!("{} cache hit for '{}'", channel, term);
            self.gateway.cancel(channel);
            self.view.status_mut(channel).apply(ChannelEvent::CacheHit);
            reconciler::reconcile(&mut self.view, self.store.current(), channel, signature, payload);
            return;
        }

        let fetch = provider.request(self.api.clone(), term);
        let id = self.gateway.dispatch(channel, signature, fetch);
        self.view.status_mut(channel).apply(ChannelEvent::Dispatched(id));
    }

    /// Cache a successful payload. Data is kept even when the query has
    /// moved on, since it is still valid for its own signature.
    fn remember(&mut self, channel: Channel, signature: &QuerySignature, payload: &ChannelPayload) {
        match (channel, payload) {
            (Channel::Main, ChannelPayload::Results(response)) => {
                let entry = CacheEntry::from_response(signature.clone(), response);
                self.cache.put(signature.clone(), entry);
            }
            (Channel::Suggest, _) => self.suggestions.store(&signature.term, payload.clone()),
            (Channel::Instant, _) => self.instant.store(&signature.term, payload.clone()),
            (Channel::Main, _) => {}
        }
    }

    fn on_failure(&mut self, channel: Channel, signature: &QuerySignature, message: String) {
        if !reconciler::is_current(channel, signature, self.store.current()) {
            log::debug!("Ignoring failure of stale {} request: {}", channel, message);
            self.view.status_mut(channel).discarded += 1;
            return;
        }

        match channel {
            Channel::Main => {
                log::warn!("Search failed for {}: {}", signature, message);
                self.view.clear_results();
                self.view.main.error = Some(message);
            }
            Channel::Suggest => {
                log::debug!("Suggestions unavailable: {}", message);
                self.view.suggestions.clear();
                self.view.suggest.error = Some(message);
            }
            Channel::Instant => {
                log::debug!("Instant preview unavailable: {}", message);
                self.view.previews.clear();
                self.view.instant.error = Some(message);
            }
        }
    }

    fn refresh_view(&mut self) {
        let current = self.store.current();
        if self.view.signature != *current {
            self.view.query_string = current.to_query_string();
            self.view.signature = current.clone();
        }
        if self.view.input != self.store.input() {
            self.view.input = self.store.input().to_string();
        }
        if self.view.recent.as_slice() != self.ledger.list() {
            self.view.recent = self.ledger.list().to_vec();
        }
    }
}

fn load_view_mode(storage: &dyn KeyValueStore) -> ViewMode {
    match storage.get(VIEW_MODE_KEY) {
        Ok(Some(raw)) => ViewMode::parse(&raw).unwrap_or_else(|| {
            log::warn!("Ignoring unknown view mode '{}'", raw);
            ViewMode::default()
        }),
        Ok(None) => ViewMode::default(),
        Err(e) => {
            log::warn!("Failed to load view mode: {}", e);
            ViewMode::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClientError, ClientResult};
    use crate::storage::MemoryStore;
    use crate::types::{PageInfo, SearchResponse, Suggestion};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers instantly and records every call
    #[derive(Default)]
    struct RecordingApi {
        searches: Mutex<Vec<SearchRequest>>,
        fail_search: bool,
    }

    #[async_trait]
    impl SearchApi for RecordingApi {
        async fn search(&self, request: SearchRequest) -> ClientResult<SearchResponse> {
            self.searches.lock().unwrap().push(request);
            if self.fail_search {
                return Err(ClientError::Status { status: 500 });
            }
            Ok(SearchResponse {
                success: true,
                products: Vec::new(),
                pagination: PageInfo {
                    current_page: 1,
                    total_pages: 3,
                    total_products: 30,
                    has_next: true,
                    has_prev: false,
                },
                query: None,
                filters: None,
                message: None,
            })
        }

        async fn suggest(&self, _term: String) -> ClientResult<Vec<Suggestion>> {
            Ok(Vec::new())
        }
    }

    fn controller(api: Arc<RecordingApi>) -> (SearchController, ControllerInbox) {
        let _ = env_logger::builder().is_test(true).try_init();
        SearchController::new(SearchConfig::default(), api, Arc::new(MemoryStore::new()))
    }

    impl RecordingApi {
        /// Main-channel searches, leaving out instant previews
        fn main_searches(&self) -> Vec<SearchRequest> {
            let searches = self.searches.lock().unwrap();
            searches
                .iter()
                .filter(|r| r.limit == SearchConfig::default().page_size)
                .cloned()
                .collect()
        }
    }

    /// Process completions until the main channel settles
    async fn settle_next_main(controller: &mut SearchController, inbox: &mut ControllerInbox) {
        loop {
            let completion = inbox.completions.recv().await.unwrap();
            let is_main = completion.channel == Channel::Main;
            controller.on_completion(completion);
            if is_main {
                return;
            }
        }
    }

    /// Feed timer fires until the main one, then wait for its completion
    async fn settle_main(controller: &mut SearchController, inbox: &mut ControllerInbox) {
        loop {
            let fired = inbox.timers.recv().await.unwrap();
            let is_main = fired.channel == Channel::Main;
            controller.on_timer(fired);
            if is_main {
                break;
            }
        }
        settle_next_main(controller, inbox).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_resets_page_and_restarts_only_main() {
        let api = Arc::new(RecordingApi::default());
        let (mut controller, _inbox) = controller(api);

        controller.handle_command(SearchCommand::SetTerm("lamp".into()));
        controller.handle_command(SearchCommand::GoToPage(3));
        assert_eq!(controller.current().page, 3);

        controller.handle_command(SearchCommand::SetFilter(FilterChange::InStock(true)));
        assert_eq!(controller.current().page, 1);
        assert_eq!(controller.view().query_string, "q=lamp&inStock=true");
        assert_eq!(controller.view().main.phase, channel::ChannelPhase::Debouncing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_is_clamped_to_known_total() {
        let api = Arc::new(RecordingApi::default());
        let (mut controller, mut inbox) = controller(api);

        controller.handle_command(SearchCommand::SetTerm("lamp".into()));
        settle_main(&mut controller, &mut inbox).await;
        assert_eq!(controller.view().page_info.map(|p| p.total_pages), Some(3));

        controller.handle_command(SearchCommand::GoToPage(9));
        assert_eq!(controller.current().page, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_is_not_clamped_by_results_of_another_query() {
        let api = Arc::new(RecordingApi::default());
        let (mut controller, mut inbox) = controller(api);

        controller.handle_command(SearchCommand::SetTerm("lamp".into()));
        settle_main(&mut controller, &mut inbox).await;
        assert_eq!(controller.view().page_info.map(|p| p.total_pages), Some(3));

        controller.handle_command(SearchCommand::SetTerm("lamps".into()));
        controller.handle_command(SearchCommand::GoToPage(5));
        assert_eq!(controller.current().page, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bypasses_cache() {
        let api = Arc::new(RecordingApi {
            fail_search: true,
            ..RecordingApi::default()
        });
        let (mut controller, mut inbox) = controller(api.clone());

        controller.handle_command(SearchCommand::SetTerm("lamp".into()));
        settle_main(&mut controller, &mut inbox).await;
        assert!(controller.view().can_retry());
        assert!(controller.view().products.is_empty());

        controller.handle_command(SearchCommand::Retry);
        assert!(controller.view().is_loading());
        settle_next_main(&mut controller, &mut inbox).await;

        assert_eq!(api.main_searches().len(), 2);
        assert_eq!(controller.view().main.failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_category_without_term_browses() {
        let api = Arc::new(RecordingApi::default());
        let (mut controller, mut inbox) = controller(api.clone());

        controller.handle_command(SearchCommand::SetFilter(FilterChange::Category(Some(
            "audio".into(),
        ))));
        settle_main(&mut controller, &mut inbox).await;

        let searches = api.main_searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(searches[0].signature.category.as_deref(), Some("audio"));
    }

    #[tokio::test]
    async fn test_view_mode_is_persisted_and_restored() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let api: Arc<dyn SearchApi> = Arc::new(RecordingApi::default());

        let (mut controller, _inbox) =
            SearchController::new(SearchConfig::default(), api.clone(), storage.clone());
        assert_eq!(controller.view().view_mode, ViewMode::Grid);
        controller.handle_command(SearchCommand::SetViewMode(ViewMode::List));

        let (restored, _inbox) = SearchController::new(SearchConfig::default(), api, storage.clone());
        assert_eq!(restored.view().view_mode, ViewMode::List);
        assert_eq!(storage.get(VIEW_MODE_KEY).unwrap().as_deref(), Some("list"));
    }
}
