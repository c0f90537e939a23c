//! Heuristic depth recommendation (§4.7 `Depth`, grounded on the original
//! `DepthRecommender`): a few trigger-word lists, checked in priority order.

use intel_orchestrator::Depth;

const DEEP_TRIGGERS: &[&str] = &["analyze", "report", "comprehensive", "full text", "scrape", "deep"];
const SHALLOW_TRIGGERS: &[&str] = &["price", "current", "weather", "who is", "define", "simple"];

pub struct DepthRecommender;

impl DepthRecommender {
    pub fn new() -> Self {
        Self
    }

    /// Recommends a depth for `query`, along with the trigger word that
    /// decided it (or a note that none matched, in which case `Standard` is
    /// the default).
    pub fn recommend(&self, query: &str) -> (Depth, String) {
        let lowered = query.to_lowercase();

        if let Some(trigger) = DEEP_TRIGGERS.iter().find(|t| lowered.contains(*t)) {
            return (Depth::Deep, format!("matched deep trigger \"{trigger}\""));
        }
        if let Some(trigger) = SHALLOW_TRIGGERS.iter().find(|t| lowered.contains(*t)) {
            return (Depth::Shallow, format!("matched shallow trigger \"{trigger}\""));
        }
        (Depth::Standard, "no trigger matched, defaulting to standard".to_string())
    }
}

impl Default for DepthRecommender {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a depth string from a request body, accepting any casing.
pub fn parse_depth(value: &str) -> Option<Depth> {
    match value.to_lowercase().as_str() {
        "shallow" => Some(Depth::Shallow),
        "standard" => Some(Depth::Standard),
        "deep" => Some(Depth::Deep),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_trigger_wins_over_shallow() {
        let recommender = DepthRecommender::new();
        let (depth, _) = recommender.recommend("give me a comprehensive report on the current price");
        assert_eq!(depth, Depth::Deep);
    }

    #[test]
    fn shallow_trigger_without_deep() {
        let recommender = DepthRecommender::new();
        let (depth, reason) = recommender.recommend("what is the current weather");
        assert_eq!(depth, Depth::Shallow);
        assert!(reason.contains("current") || reason.contains("weather"));
    }

    #[test]
    fn no_trigger_defaults_to_standard() {
        let recommender = DepthRecommender::new();
        let (depth, _) = recommender.recommend("rust async runtimes");
        assert_eq!(depth, Depth::Standard);
    }
}
