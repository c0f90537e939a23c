//! The free-tier model roster the rotator cycles through (§4.10 "candidate
//! list (id + strength tag + context size)").

/// One completion model the rotator can select (§3 glossary "Rotator").
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateModel {
    pub id: String,
    pub name: String,
    pub context: u32,
    pub strength: String,
    pub notes: String,
}

impl CandidateModel {
    fn new(id: &str, name: &str, context: u32, strength: &str, notes: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            context,
            strength: strength.to_string(),
            notes: notes.to_string(),
        }
    }
}

/// The default candidate roster. Callers needing a different fleet build
/// their own `Vec<CandidateModel>` and pass it to `Rotator::with_candidates`.
pub fn default_candidates() -> Vec<CandidateModel> {
    vec![
        CandidateModel::new(
            "deepseek/deepseek-r1-0528:free",
            "DeepSeek R1 0528",
            164_000,
            "reasoning",
            "o1-tier reasoning, fully open-source",
        ),
        CandidateModel::new(
            "nvidia/nemotron-3-nano-30b-a3b:free",
            "NVIDIA Nemotron 3 Nano",
            256_000,
            "agentic",
            "Best for agentic AI, MoE architecture",
        ),
        CandidateModel::new(
            "openai/gpt-oss-120b:free",
            "GPT-OSS 120B",
            131_000,
            "reasoning",
            "OpenAI open-weight, tool use, chain-of-thought",
        ),
        CandidateModel::new(
            "meta-llama/llama-3.3-70b-instruct:free",
            "Llama 3.3 70B",
            131_000,
            "general",
            "GPT-4 tier performance",
        ),
        CandidateModel::new(
            "qwen/qwen3-coder-480b-a35b:free",
            "Qwen3 Coder 480B",
            262_000,
            "coding",
            "Best for code generation, agentic tasks",
        ),
        CandidateModel::new(
            "nous/hermes-3-405b:free",
            "Hermes 3 405B",
            131_000,
            "complex",
            "Fine-tuned Llama 405B, instruction following",
        ),
        CandidateModel::new(
            "z.ai/glm-4.5-air:free",
            "GLM-4.5 Air",
            131_000,
            "multilingual",
            "Strong multilingual support",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roster_has_unique_ids() {
        let candidates = default_candidates();
        let mut ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), candidates.len());
    }
}
