//! Minimal OpenAI-compatible chat client exposing one domain call:
//! decomposing a search query into targeted sub-queries.

pub mod error;
pub mod types;

pub use error::{LlmError, Result};
pub use types::{DecomposedQuery, Decomposition, DecompositionContext};

use std::time::Duration;

use tracing::{info, warn};

use types::{ChatMessage, ChatRequest, ChatResponse, RawDecomposition, ResponseFormat};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hard cap on sub-queries; anything beyond this is silently truncated.
const MAX_SUB_QUERIES: usize = 10;

const DECOMPOSITION_SYSTEM_PROMPT: &str = "\
You are a search query optimization expert. Decompose the user's complex query \
into several targeted sub-queries so a search engine can cover it thoroughly.

Decomposition principles:
1. Coverage: sub-queries together cover every key aspect of the original query.
2. Independence: each sub-query can be searched on its own.
3. Focus: each sub-query targets one concrete information need.
4. Restraint: avoid over-splitting; 2-5 sub-queries is usually right.
5. Searchability: phrase sub-queries the way search engines expect.

Respond with strict JSON in exactly this shape:
{
  \"decomposed_queries\": [
    {\"query\": \"...\", \"reasoning\": \"why this sub-query\", \"focus\": \"information dimension\"}
  ],
  \"overall_strategy\": \"one-line description of the decomposition strategy\"
}";

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Decompose a query into sub-queries under the given search context.
    ///
    /// Malformed JSON or a missing/empty `decomposed_queries` list is a hard
    /// `LlmError::Parse` - never a partial result.
    pub async fn decompose(
        &self,
        query: &str,
        context: &DecompositionContext,
    ) -> Result<Decomposition> {
        let user_message = format!(
            "Original query: \"{query}\"\n\n\
             Search context:\n\
             - Target domains: {}\n\
             - Language preference: {}\n\
             - Time range: {}\n\n\
             Decompose this query and return valid JSON.",
            context.target_domains.as_deref().unwrap_or("unrestricted"),
            context.language.as_deref().unwrap_or("any"),
            context.time_range.as_deref().unwrap_or("unbounded"),
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: DECOMPOSITION_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: 0.7,
            max_tokens: 2000,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| LlmError::Parse("response has no choices".to_string()))?;

        let tokens_used = body.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0);
        let mut decomposition = validate_decomposition(content)?;
        decomposition.model = self.model.clone();
        decomposition.tokens_used = tokens_used;

        info!(
            query,
            sub_queries = decomposition.decomposed_queries.len(),
            tokens_used,
            "Query decomposition complete"
        );

        Ok(decomposition)
    }
}

/// Parse and validate the model's JSON payload.
fn validate_decomposition(content: &str) -> Result<Decomposition> {
    let raw: RawDecomposition = serde_json::from_str(content)
        .map_err(|e| LlmError::Parse(format!("{e}: {}", truncate(content, 200))))?;

    if raw.decomposed_queries.is_empty() {
        return Err(LlmError::Parse(
            "decomposed_queries must not be empty".to_string(),
        ));
    }

    let mut queries = raw.decomposed_queries;
    if queries.len() > MAX_SUB_QUERIES {
        warn!(
            count = queries.len(),
            "Model over-produced sub-queries, truncating to {MAX_SUB_QUERIES}"
        );
        queries.truncate(MAX_SUB_QUERIES);
    }

    Ok(Decomposition {
        decomposed_queries: queries,
        overall_strategy: raw.overall_strategy,
        model: String::new(),
        tokens_used: 0,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_payload_parses() {
        let content = r#"{
            "decomposed_queries": [
                {"query": "rust async runtime comparison", "reasoning": "core topic", "focus": "technology"}
            ],
            "overall_strategy": "split by dimension"
        }"#;
        let d = validate_decomposition(content).unwrap();
        assert_eq!(d.decomposed_queries.len(), 1);
        assert_eq!(d.overall_strategy, "split by dimension");
    }

    #[test]
    fn empty_query_list_is_a_hard_failure() {
        let content = r#"{"decomposed_queries": [], "overall_strategy": ""}"#;
        assert!(matches!(
            validate_decomposition(content),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_hard_failure() {
        assert!(matches!(
            validate_decomposition("not json at all"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn over_produced_queries_are_capped_at_ten() {
        let queries: Vec<String> = (0..14)
            .map(|i| format!(r#"{{"query": "q{i}", "reasoning": "", "focus": ""}}"#))
            .collect();
        let content = format!(
            r#"{{"decomposed_queries": [{}], "overall_strategy": "wide"}}"#,
            queries.join(",")
        );
        let d = validate_decomposition(&content).unwrap();
        assert_eq!(d.decomposed_queries.len(), 10);
        assert_eq!(d.decomposed_queries[9].query, "q9");
    }
}
