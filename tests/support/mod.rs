//! Shared fixtures for controller integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_search::error::{ClientError, ClientResult};
use storefront_search::{
    KeyValueStore, MemoryStore, PageInfo, Product, SearchApi, SearchConfig, SearchController,
    SearchHandle, SearchRequest, SearchResponse, Suggestion,
};

pub const PAGE_SIZE: u32 = 12;

#[derive(Debug, Clone)]
pub enum Call {
    Main(SearchRequest),
    Instant(SearchRequest),
    Suggest(String),
}

#[derive(Default)]
struct Script {
    totals: HashMap<String, (u64, u32)>,
    latency: HashMap<String, Duration>,
    fail_main: HashSet<String>,
    fail_instant: HashSet<String>,
    fail_suggest: HashSet<String>,
    calls: Vec<Call>,
}

/// `SearchApi` fake with per-term totals, latency and failures
pub struct ScriptedApi {
    default_latency: Duration,
    script: Mutex<Script>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            default_latency: Duration::from_millis(20),
            script: Mutex::new(Script::default()),
        }
    }

    pub fn with_results(self, term: &str, total_products: u64, total_pages: u32) -> Self {
        self.script
            .lock()
            .unwrap()
            .totals
            .insert(term.to_string(), (total_products, total_pages));
        self
    }

    pub fn with_latency(self, term: &str, millis: u64) -> Self {
        self.script
            .lock()
            .unwrap()
            .latency
            .insert(term.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn set_main_failure(&self, term: &str, failing: bool) {
        let mut script = self.script.lock().unwrap();
        if failing {
            script.fail_main.insert(term.to_string());
        } else {
            script.fail_main.remove(term);
        }
    }

    pub fn fail_suggest(self, term: &str) -> Self {
        self.script.lock().unwrap().fail_suggest.insert(term.to_string());
        self
    }

    pub fn fail_instant(self, term: &str) -> Self {
        self.script.lock().unwrap().fail_instant.insert(term.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Terms of main-channel searches, in dispatch order
    pub fn main_terms(&self) -> Vec<String> {
        self.main_calls().into_iter().map(|r| r.signature.term).collect()
    }

    pub fn main_calls(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Main(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn instant_terms(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Instant(request) => Some(request.signature.term),
                _ => None,
            })
            .collect()
    }

    pub fn suggest_terms(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Suggest(term) => Some(term),
                _ => None,
            })
            .collect()
    }

    fn latency_for(&self, term: &str) -> Duration {
        self.script
            .lock()
            .unwrap()
            .latency
            .get(term)
            .copied()
            .unwrap_or(self.default_latency)
    }
}

#[async_trait]
impl SearchApi for ScriptedApi {
    async fn search(&self, request: SearchRequest) -> ClientResult<SearchResponse> {
        let term = request.signature.term.clone();
        let is_main = request.limit == PAGE_SIZE;
        let (total_products, total_pages, failing) = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(if is_main {
                Call::Main(request.clone())
            } else {
                Call::Instant(request.clone())
            });
            let (total_products, total_pages) = script.totals.get(&term).copied().unwrap_or((3, 1));
            let failing = if is_main {
                script.fail_main.contains(&term)
            } else {
                script.fail_instant.contains(&term)
            };
            (total_products, total_pages, failing)
        };

        tokio::time::sleep(self.latency_for(&term)).await;
        if failing {
            return Err(ClientError::Status { status: 503 });
        }

        let page = request.signature.page;
        let count = total_products.min(request.limit as u64) as usize;
        Ok(SearchResponse {
            success: true,
            products: (0..count).map(|i| product(&term, i)).collect(),
            pagination: PageInfo {
                current_page: page,
                total_pages,
                total_products,
                has_next: page < total_pages,
                has_prev: page > 1,
            },
            query: Some(term),
            filters: None,
            message: None,
        })
    }

    async fn suggest(&self, term: String) -> ClientResult<Vec<Suggestion>> {
        let failing = {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Suggest(term.clone()));
            script.fail_suggest.contains(&term)
        };

        tokio::time::sleep(self.latency_for(&term)).await;
        if failing {
            return Err(ClientError::Status { status: 500 });
        }
        Ok(vec![Suggestion {
            id: format!("s-{}", term),
            name: format!("{} suggestion", term),
        }])
    }
}

pub fn product(term: &str, index: usize) -> Product {
    Product {
        id: format!("{}-{}", term, index),
        name: format!("{} {}", term, index),
        price: 10.0 + index as f64,
        image: None,
        category: None,
        rating: None,
        stock: Some(5),
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> SearchConfig {
    SearchConfig {
        page_size: PAGE_SIZE,
        state_file: None,
        ..SearchConfig::default()
    }
}

/// Spawn a controller around `api` with in-memory storage
pub fn spawn(api: Arc<ScriptedApi>) -> (SearchHandle, Arc<MemoryStore>) {
    init_logger();
    let storage = Arc::new(MemoryStore::new());
    let shared: Arc<dyn KeyValueStore> = storage.clone();
    let (controller, inbox) = SearchController::new(config(), api, shared);
    (SearchHandle::spawn(controller, inbox), storage)
}

pub async fn sleep_ms(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

/// Send one `SetTerm` per character, `gap_ms` apart
pub async fn type_text(handle: &SearchHandle, text: &str, gap_ms: u64) {
    let mut typed = String::new();
    for (i, ch) in text.chars().enumerate() {
        if i > 0 {
            sleep_ms(gap_ms).await;
        }
        typed.push(ch);
        handle.set_term(typed.clone()).unwrap();
    }
}
