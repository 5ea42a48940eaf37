use serde::{Deserialize, Serialize};

/// Options controlling a `/v2/search` call.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Maximum number of results to return.
    pub limit: Option<u32>,
    /// Search language hint (e.g. "en").
    pub lang: Option<String>,
    /// Restrict results to these domains.
    pub include_domains: Vec<String>,
    /// Never return results from these domains.
    pub exclude_domains: Vec<String>,
    /// Time-bounded search: "day", "week", "month" or "year".
    pub time_range: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(rename = "includeDomains", skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    #[serde(rename = "excludeDomains", skip_serializing_if = "Vec::is_empty")]
    pub exclude_domains: Vec<String>,
    /// Google-style time filter, e.g. "qdr:w" for the past week.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tbs: Option<String>,
    /// Without scrapeOptions the search endpoint returns metadata only
    /// (title, url, description) - no page content.
    #[serde(rename = "scrapeOptions")]
    pub scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeOptions {
    pub formats: Vec<String>,
    #[serde(rename = "onlyMainContent")]
    pub only_main_content: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScrapeRequest {
    pub url: String,
    pub formats: Vec<String>,
    #[serde(rename = "onlyMainContent")]
    pub only_main_content: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<SearchData>,
    #[serde(rename = "creditsUsed", default)]
    pub credits_used: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    #[serde(default)]
    pub web: Vec<WebHit>,
}

/// One web result from `/v2/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    /// Backend relevance score, when present.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScrapeResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ScrapeData>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScrapeData {
    #[serde(default)]
    pub markdown: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Outcome of a search call: the hits plus what the call cost.
#[derive(Debug, Clone)]
pub struct SearchBatch {
    pub hits: Vec<WebHit>,
    pub credits_used: u32,
}

/// Outcome of scraping a single URL.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub metadata: serde_json::Value,
}
