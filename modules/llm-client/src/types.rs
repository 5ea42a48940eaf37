use serde::{Deserialize, Serialize};

/// Search context fed into the decomposition prompt. The same query under a
/// different context is a different decomposition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DecompositionContext {
    pub target_domains: Option<String>,
    pub language: Option<String>,
    pub time_range: Option<String>,
}

/// One sub-query produced by decomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecomposedQuery {
    pub query: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub focus: String,
}

/// Validated decomposition of a user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub decomposed_queries: Vec<DecomposedQuery>,
    #[serde(default)]
    pub overall_strategy: String,
    /// Model that produced this decomposition.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tokens_used: u32,
}

// --- chat completions wire types ---

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub total_tokens: u32,
}

// The raw decomposition payload before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDecomposition {
    pub decomposed_queries: Vec<DecomposedQuery>,
    #[serde(default)]
    pub overall_strategy: String,
}
