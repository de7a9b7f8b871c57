//! Suggestion and instant-preview providers
//!
//! Both providers share one shape: a length gate, a debouncer, a
//! term-keyed cache and a fetch against the `SearchApi`. They differ in
//! endpoint, gate and how the payload is shaped.

use crate::cache::InsertionCache;
use crate::client::{SearchApi, SearchRequest};
use crate::config::SearchConfig;
use crate::controller::channel::Channel;
use crate::controller::debounce::{Debouncer, TimerFired};
use crate::controller::gateway::ChannelPayload;
use crate::error::ClientResult;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Text suggestions from `/search/suggest`
    Suggestions,
    /// Popular product cards from `/search`
    Instant,
}

impl PreviewKind {
    pub fn channel(&self) -> Channel {
        match self {
            PreviewKind::Suggestions => Channel::Suggest,
            PreviewKind::Instant => Channel::Instant,
        }
    }
}

pub struct PreviewProvider {
    kind: PreviewKind,
    min_chars: usize,
    limit: u32,
    debouncer: Debouncer,
    cache: InsertionCache<ChannelPayload>,
}

impl PreviewProvider {
    pub fn new(kind: PreviewKind, config: &SearchConfig, fired: mpsc::UnboundedSender<TimerFired>) -> Self {
        let (min_chars, delay) = match kind {
            PreviewKind::Suggestions => (config.suggest_min_chars, config.suggest_debounce()),
            PreviewKind::Instant => (config.instant_min_chars, config.instant_debounce()),
        };
        Self {
            kind,
            min_chars: min_chars.max(1),
            limit: config.instant_limit,
            debouncer: Debouncer::new(kind.channel(), delay, fired),
            cache: InsertionCache::new(config.preview_cache_max),
        }
    }

    pub fn kind(&self) -> PreviewKind {
        self.kind
    }

    pub fn channel(&self) -> Channel {
        self.kind.channel()
    }

    /// Whether `term` is long enough for this provider
    pub fn accepts(&self, term: &str) -> bool {
        term.trim().chars().count() >= self.min_chars
    }

    pub fn debouncer(&mut self) -> &mut Debouncer {
        &mut self.debouncer
    }

    /// Cached payload for `term`
    pub fn lookup(&mut self, term: &str) -> Option<ChannelPayload> {
        self.cache.get(term.trim()).cloned()
    }

    pub fn store(&mut self, term: &str, payload: ChannelPayload) {
        self.cache.put(term.trim().to_string(), payload);
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Build the fetch for `term`. The returned future owns everything it
    /// needs so it can be handed to the gateway.
    pub fn request(
        &self,
        api: Arc<dyn SearchApi>,
        term: String,
    ) -> impl Future<Output = ClientResult<ChannelPayload>> + Send + 'static {
        let kind = self.kind;
        let limit = self.limit;
        async move {
            match kind {
                PreviewKind::Suggestions => {
                    let suggestions = api.suggest(term).await?;
                    Ok(ChannelPayload::Suggestions(suggestions))
                }
                PreviewKind::Instant => {
                    let response = api.search(SearchRequest::instant(&term, limit)).await?;
                    let mut products = response.products;
                    // Server order is authoritative; only the length is capped
                    products.truncate(limit as usize);
                    Ok(ChannelPayload::Preview(products))
                }
            }
        }
    }
}
