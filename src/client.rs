//! Search API seam and its reqwest implementation
//!
//! The server is an external collaborator. The controller only talks to
//! it through `SearchApi`, which tests replace with scripted fakes.

use crate::error::{ClientError, ClientResult};
use crate::query::{QuerySignature, SortOrder};
use crate::types::{SearchResponse, SuggestResponse, Suggestion};
use async_trait::async_trait;
use url::Url;

/// One `GET /search` call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub signature: QuerySignature,
    pub limit: u32,
}

impl SearchRequest {
    /// Full, filtered result page
    pub fn main(signature: QuerySignature, page_size: u32) -> Self {
        Self {
            signature,
            limit: page_size,
        }
    }

    /// Instant preview: first page of the most popular matches, no filters
    pub fn instant(term: &str, limit: u32) -> Self {
        let signature = QuerySignature {
            sort: SortOrder::Popular,
            ..QuerySignature::for_term(term)
        };
        Self { signature, limit }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.signature.request_pairs(self.limit)
    }
}

#[async_trait]
pub trait SearchApi: Send + Sync {
    /// `GET /search`
    async fn search(&self, request: SearchRequest) -> ClientResult<SearchResponse>;

    /// `GET /search/suggest`
    async fn suggest(&self, term: String) -> ClientResult<Vec<Suggestion>>;
}

/// reqwest-backed client for the storefront search endpoints
#[derive(Debug, Clone)]
pub struct HttpSearchClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpSearchClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base_url)?;
        // `join` drops the last path segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client, base })
    }

    pub fn search_url(&self, request: &SearchRequest) -> ClientResult<Url> {
        let mut url = self.base.join("search")?;
        url.query_pairs_mut()
            .extend_pairs(request.query_pairs().iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url)
    }

    pub fn suggest_url(&self, term: &str) -> ClientResult<Url> {
        let mut url = self.base.join("search/suggest")?;
        url.query_pairs_mut().append_pair("q", term.trim());
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> ClientResult<T> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl SearchApi for HttpSearchClient {
    async fn search(&self, request: SearchRequest) -> ClientResult<SearchResponse> {
        let url = self.search_url(&request)?;
        let body: SearchResponse = self.get_json(url).await?;
        if !body.success {
            return Err(ClientError::Rejected {
                message: body.message.unwrap_or_else(|| "search failed".to_string()),
            });
        }
        Ok(body)
    }

    async fn suggest(&self, term: String) -> ClientResult<Vec<Suggestion>> {
        let url = self.suggest_url(&term)?;
        let body: SuggestResponse = self.get_json(url).await?;
        if !body.success {
            return Err(ClientError::Rejected {
                message: body.message.unwrap_or_else(|| "suggest failed".to_string()),
            });
        }
        Ok(body.suggestions)
    }
}
