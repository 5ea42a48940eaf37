pub mod error;
pub mod types;

pub use error::{FirecrawlError, Result};
pub use types::{ScrapedPage, SearchBatch, SearchOptions, WebHit};

use std::time::Duration;

use tracing::{debug, info};

use types::{
    ScrapeOptions, ScrapeRequest, ScrapeResponse, SearchData, SearchRequest, SearchResponse,
};

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Firecrawl search and scrape endpoints.
pub struct FirecrawlClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirecrawlClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Run a keyword search with full-page scraping enabled.
    ///
    /// The search endpoint alone returns only metadata; scrapeOptions makes
    /// Firecrawl fetch markdown/html for each hit in the same call.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchBatch> {
        let request = SearchRequest {
            query: query.to_string(),
            limit: options.limit,
            lang: options.lang.clone(),
            include_domains: options.include_domains.clone(),
            exclude_domains: options.exclude_domains.clone(),
            tbs: options.time_range.as_deref().and_then(time_range_to_tbs),
            scrape_options: ScrapeOptions {
                formats: vec!["markdown".to_string(), "html".to_string()],
                only_main_content: true,
            },
        };

        debug!(query, limit = ?options.limit, "Calling Firecrawl search");

        let resp = self
            .client
            .post(format!("{}/v2/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = resp.json().await.map_err(FirecrawlError::from)?;
        if !body.success {
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message: body.error.unwrap_or_else(|| "search failed".to_string()),
            });
        }

        let hits = body.data.map(|SearchData { web }| web).unwrap_or_default();
        let credits_used = body.credits_used.unwrap_or(1);
        info!(query, results = hits.len(), credits_used, "Firecrawl search complete");

        Ok(SearchBatch { hits, credits_used })
    }

    /// Scrape a single URL to markdown/html.
    pub async fn scrape(&self, url: &str) -> Result<ScrapedPage> {
        let request = ScrapeRequest {
            url: url.to_string(),
            formats: vec!["markdown".to_string(), "html".to_string()],
            only_main_content: true,
        };

        let resp = self
            .client
            .post(format!("{}/v2/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FirecrawlError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ScrapeResponse = resp.json().await.map_err(FirecrawlError::from)?;
        let data = match (body.success, body.data) {
            (true, Some(data)) => data,
            _ => {
                return Err(FirecrawlError::Api {
                    status: status.as_u16(),
                    message: body.error.unwrap_or_else(|| "scrape failed".to_string()),
                })
            }
        };

        let metadata = data.metadata.unwrap_or(serde_json::Value::Null);
        let title = metadata
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(ScrapedPage {
            url: url.to_string(),
            title,
            markdown: data.markdown,
            html: data.html,
            metadata,
        })
    }
}

/// Map a human time range to Firecrawl's Google-style `tbs` value.
fn time_range_to_tbs(range: &str) -> Option<String> {
    match range {
        "day" => Some("qdr:d".to_string()),
        "week" => Some("qdr:w".to_string()),
        "month" => Some("qdr:m".to_string()),
        "year" => Some("qdr:y".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_maps_known_values() {
        assert_eq!(time_range_to_tbs("week").as_deref(), Some("qdr:w"));
        assert_eq!(time_range_to_tbs("decade"), None);
    }

    #[test]
    fn search_response_parses_v2_shape() {
        let raw = serde_json::json!({
            "success": true,
            "data": { "web": [
                { "title": "A", "url": "https://a.example", "description": "a", "markdown": "# A", "score": 0.9 }
            ]},
            "creditsUsed": 3
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.credits_used, Some(3));
        let hits = parsed.data.unwrap().web;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "A");
        assert_eq!(hits[0].score, Some(0.9));
    }
}
