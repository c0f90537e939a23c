use serde::{Deserialize, Serialize};

/// Token usage and cost reported alongside a completion (§4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
}

/// A single-model completion response (§4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub content: String,
    pub model: String,
    pub usage: CompletionUsage,
    pub metadata: serde_json::Value,
}
