pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod pagination;
pub mod query;
pub mod storage;
pub mod types;

// Public API
pub use cache::{CacheEntry, CacheStats, ResponseCache, CACHE_MAX};
pub use client::{HttpSearchClient, SearchApi, SearchRequest};
pub use config::SearchConfig;
pub use controller::channel::{Channel, ChannelPhase, ChannelStatus};
pub use controller::view::SearchView;
pub use controller::{SearchCommand, SearchController, SearchHandle};
pub use error::{ClientError, ConfigError, ControllerError, StorageError};
pub use ledger::{RecentSearches, RECENT_MAX};
pub use pagination::{compute_window, PageSlot};
pub use query::{FilterChange, QuerySignature, QueryStore, SortOrder};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
