//! Query store and query signatures
//!
//! A `QuerySignature` is the full search intent (term, filters, sort and
//! page). Its serialized key is the identity used by the response cache,
//! the fetch gateway and the reconciler. The `QueryStore` is the single
//! writer of the current signature.

use std::fmt;
use std::hash::{Hash, Hasher};
use url::form_urlencoded;

/// Server-side sort orders understood by `/search`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    Newest,
    Rating,
    Popular,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::Newest => "newest",
            SortOrder::Rating => "rating",
            SortOrder::Popular => "popular",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "relevance" => Some(SortOrder::Relevance),
            "price_asc" => Some(SortOrder::PriceAsc),
            "price_desc" => Some(SortOrder::PriceDesc),
            "newest" => Some(SortOrder::Newest),
            "rating" => Some(SortOrder::Rating),
            "popular" => Some(SortOrder::Popular),
            _ => None,
        }
    }
}

/// Immutable description of what the user currently wants to see.
///
/// Equality and hashing go through [`QuerySignature::key`], so two
/// signatures are equal exactly when their serialized keys are equal.
#[derive(Debug, Clone)]
pub struct QuerySignature {
    pub term: String,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortOrder,
    pub rating: Option<u8>,
    pub in_stock: bool,
    pub page: u32,
}

impl Default for QuerySignature {
    fn default() -> Self {
        Self {
            term: String::new(),
            category: None,
            min_price: None,
            max_price: None,
            sort: SortOrder::default(),
            rating: None,
            in_stock: false,
            page: 1,
        }
    }
}

impl QuerySignature {
    /// Signature carrying only a term. Used by the preview channels, which
    /// ignore filters entirely.
    pub fn for_term(term: impl Into<String>) -> Self {
        Self {
            term: term.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Equal in everything but the page
    pub fn same_query(&self, other: &Self) -> bool {
        let first_page = |s: &Self| Self { page: 1, ..s.clone() };
        first_page(self) == first_page(other)
    }

    /// Deterministic serialized key. Every field is always present, in a
    /// fixed order.
    pub fn key(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer
            .append_pair("q", &self.term)
            .append_pair("category", self.category.as_deref().unwrap_or(""))
            .append_pair("minPrice", &format_price(self.min_price))
            .append_pair("maxPrice", &format_price(self.max_price))
            .append_pair("sort", self.sort.as_str())
            .append_pair("rating", &self.rating.map(|r| r.to_string()).unwrap_or_default())
            .append_pair("inStock", if self.in_stock { "true" } else { "false" })
            .append_pair("page", &self.page.to_string());
        serializer.finish()
    }

    /// Query parameters for `GET /search`, omitting anything unset.
    pub fn request_pairs(&self, limit: u32) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.term.clone()),
            ("page", self.page.to_string()),
            ("limit", limit.to_string()),
        ];
        pairs.extend(self.filter_pairs());
        pairs
    }

    /// Shareable query string mirroring this signature. Defaults are left
    /// out so a plain search produces `q=...` only.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.term.is_empty() {
            serializer.append_pair("q", &self.term);
        }
        for (name, value) in self.filter_pairs() {
            serializer.append_pair(name, &value);
        }
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }
        serializer.finish()
    }

    /// Rebuild a signature from a page query string. Unknown parameters are
    /// ignored and malformed values fall back to their defaults.
    pub fn from_query_string(query: &str) -> Self {
        let mut signature = Self::default();
        let query = query.trim_start_matches('?');
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match &*name {
                "q" => signature.term = value.to_string(),
                "category" if !value.is_empty() => signature.category = Some(value.to_string()),
                "minPrice" => signature.min_price = parse_price(value),
                "maxPrice" => signature.max_price = parse_price(value),
                "sort" => signature.sort = SortOrder::parse(value).unwrap_or_default(),
                "rating" => signature.rating = parse_rating(value),
                "inStock" => signature.in_stock = value == "true" || value == "1",
                "page" => signature.page = value.parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1),
                _ => {}
            }
        }
        signature
    }

    /// True when any filter differs from its default
    pub fn has_filters(&self) -> bool {
        self.category.is_some()
            || self.min_price.is_some()
            || self.max_price.is_some()
            || self.sort != SortOrder::Relevance
            || self.rating.is_some()
            || self.in_stock
    }

    fn filter_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if self.min_price.is_some() {
            pairs.push(("minPrice", format_price(self.min_price)));
        }
        if self.max_price.is_some() {
            pairs.push(("maxPrice", format_price(self.max_price)));
        }
        if self.sort != SortOrder::Relevance {
            pairs.push(("sort", self.sort.as_str().to_string()));
        }
        if let Some(rating) = self.rating {
            pairs.push(("rating", rating.to_string()));
        }
        if self.in_stock {
            pairs.push(("inStock", "true".to_string()));
        }
        pairs
    }
}

impl PartialEq for QuerySignature {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QuerySignature {}

impl Hash for QuerySignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

fn format_price(price: Option<f64>) -> String {
    price.map(|p| p.to_string()).unwrap_or_default()
}

fn parse_price(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0)
}

fn parse_rating(value: &str) -> Option<u8> {
    value.parse::<u8>().ok().filter(|r| (1..=5).contains(r))
}

/// A single filter mutation
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Category(Option<String>),
    MinPrice(Option<f64>),
    MaxPrice(Option<f64>),
    Sort(SortOrder),
    Rating(Option<u8>),
    InStock(bool),
    Page(u32),
}

impl FilterChange {
    /// Parse `name=value` as typed on the command line or found in a URL
    pub fn parse(assignment: &str) -> Option<Self> {
        let (name, value) = assignment.split_once('=')?;
        let value = value.trim();
        let optional = |v: &str| if v.is_empty() { None } else { Some(v.to_string()) };
        match name.trim() {
            "category" => Some(FilterChange::Category(optional(value))),
            "minPrice" | "min" => Some(FilterChange::MinPrice(parse_price(value))),
            "maxPrice" | "max" => Some(FilterChange::MaxPrice(parse_price(value))),
            "sort" => SortOrder::parse(value).map(FilterChange::Sort),
            "rating" => Some(FilterChange::Rating(parse_rating(value))),
            "inStock" | "stock" => Some(FilterChange::InStock(value == "true" || value == "1")),
            "page" => value.parse().ok().map(FilterChange::Page),
            _ => None,
        }
    }
}

/// What a store mutation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreChange {
    pub signature_changed: bool,
    pub term_changed: bool,
}

/// Single source of truth for the current query
#[derive(Debug, Default)]
pub struct QueryStore {
    input: String,
    current: QuerySignature,
}

impl QueryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(signature: QuerySignature) -> Self {
        Self {
            input: signature.term.clone(),
            current: signature,
        }
    }

    pub fn current(&self) -> &QuerySignature {
        &self.current
    }

    /// Raw text as typed, before trimming
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the search term. A new term always starts from page 1.
    pub fn set_term(&mut self, text: &str) -> StoreChange {
        self.input = text.to_string();
        let term = text.trim();
        if term == self.current.term {
            return StoreChange::default();
        }
        self.current.term = term.to_string();
        self.current.page = 1;
        StoreChange {
            signature_changed: true,
            term_changed: true,
        }
    }

    /// Apply a filter change. Anything other than a page change resets the
    /// page to 1.
    pub fn apply(&mut self, change: FilterChange) -> StoreChange {
        let before = self.current.key();
        let resets_page = !matches!(change, FilterChange::Page(_));
        let signature = &mut self.current;
        match change {
            FilterChange::Category(category) => signature.category = category,
            FilterChange::MinPrice(price) => signature.min_price = price,
            FilterChange::MaxPrice(price) => signature.max_price = price,
            FilterChange::Sort(sort) => signature.sort = sort,
            FilterChange::Rating(rating) => signature.rating = rating,
            FilterChange::InStock(in_stock) => signature.in_stock = in_stock,
            FilterChange::Page(page) => signature.page = page.max(1),
        }
        if resets_page {
            signature.page = 1;
        }
        StoreChange {
            signature_changed: before != self.current.key(),
            term_changed: false,
        }
    }

    /// Drop every filter, keeping the term
    pub fn clear_filters(&mut self) -> StoreChange {
        let before = self.current.key();
        self.current = QuerySignature {
            term: self.current.term.clone(),
            ..QuerySignature::default()
        };
        StoreChange {
            signature_changed: before != self.current.key(),
            term_changed: false,
        }
    }

    /// Replace the whole state, e.g. on back/forward navigation
    pub fn replace(&mut self, signature: QuerySignature) -> StoreChange {
        let change = StoreChange {
            signature_changed: signature != self.current,
            term_changed: signature.term != self.current.term,
        };
        self.input = signature.term.clone();
        self.current = signature;
        change
    }
}
