//! Source merging (§4.7 step 5).

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::types::Source;

/// Deduplicates `sources` by URL, keeping the higher-`relevance_score`
/// contender for each URL and folding the loser's `cost_usd` into the
/// survivor rather than discarding it — the API call that produced the
/// loser still happened and its cost was incurred, so the money has to end
/// up somewhere for `total_cost_usd == Σ sources.cost_usd` (§8) to hold
/// regardless of how dedup resolves. URL-less sources are retained as-is.
/// Result is sorted by `relevance_score` descending, URL-bearing sources
/// first, URL-less sources appended after (§3 `Result` invariants).
pub fn dedup_and_sort(sources: Vec<Source>) -> Vec<Source> {
    let mut by_url: HashMap<String, Source> = HashMap::new();
    let mut urlless: Vec<Source> = Vec::new();

    for source in sources {
        let Some(url) = source.url.clone() else {
            urlless.push(source);
            continue;
        };

        match by_url.get_mut(&url) {
            Some(existing) => {
                let combined_cost = existing.cost_usd + source.cost_usd;
                if source.relevance_score > existing.relevance_score {
                    *existing = source;
                }
                existing.cost_usd = combined_cost;
            }
            None => {
                by_url.insert(url, source);
            }
        }
    }

    let mut url_bearing: Vec<Source> = by_url.into_values().collect();
    url_bearing.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    url_bearing.extend(urlless);
    url_bearing
}

/// Renders the merged narrative from an already sorted/deduplicated source
/// sequence (§4.7 step 5 "merged_text"). Near-duplicate snippets — those
/// sharing the first 100 characters, case-folded and trimmed — are dropped
/// after the first occurrence.
pub fn build_merged_text(sources: &[Source]) -> String {
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut entries: Vec<String> = Vec::new();

    for source in sources {
        let key: String = source
            .snippet
            .trim()
            .to_lowercase()
            .chars()
            .take(100)
            .collect();
        if !seen_keys.insert(key) {
            continue;
        }

        let mut entry = format!("[{}]", source.source_name);
        if !source.title.is_empty() {
            entry.push(' ');
            entry.push_str(&source.title);
        }
        entry.push('\n');
        entry.push_str(&source.snippet);
        entries.push(entry);
    }

    entries.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, url: Option<&str>, score: f64, cost: f64) -> Source {
        Source {
            source_name: name.to_string(),
            url: url.map(str::to_string),
            title: String::new(),
            snippet: format!("snippet for {name}"),
            relevance_score: score,
            cost_usd: cost,
            latency_ms: 10.0,
        }
    }

    #[test]
    fn dedup_keeps_higher_score_and_sums_cost() {
        let sources = vec![
            source("exa", Some("https://shared/1"), 0.9, 0.0005),
            source("tavily", Some("https://shared/1"), 0.8, 0.005),
            source("tavily", Some("https://news/2"), 0.85, 0.005),
        ];
        let merged = dedup_and_sort(sources);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].url.as_deref(), Some("https://shared/1"));
        assert_eq!(merged[0].source_name, "exa");
        assert!((merged[0].cost_usd - 0.0055).abs() < 1e-9);
        assert_eq!(merged[1].url.as_deref(), Some("https://news/2"));

        let total: f64 = merged.iter().map(|s| s.cost_usd).sum();
        assert!((total - 0.0105).abs() < 1e-9);
    }

    #[test]
    fn url_less_sources_are_appended_after_url_bearing() {
        let sources = vec![
            source("firecrawl", None, 0.99, 0.001),
            source("exa", Some("https://ok/1"), 0.5, 0.0005),
        ];
        let merged = dedup_and_sort(sources);
        assert_eq!(merged[0].url.as_deref(), Some("https://ok/1"));
        assert!(merged[1].url.is_none());
    }

    #[test]
    fn sorted_descending_by_relevance() {
        let sources = vec![
            source("exa", Some("https://a"), 0.3, 0.0005),
            source("exa", Some("https://b"), 0.9, 0.0005),
            source("exa", Some("https://c"), 0.6, 0.0005),
        ];
        let merged = dedup_and_sort(sources);
        let scores: Vec<f64> = merged.iter().map(|s| s.relevance_score).collect();
        assert_eq!(scores, vec![0.9, 0.6, 0.3]);
    }

    #[test]
    fn near_duplicate_snippets_are_dropped() {
        let mut a = source("exa", Some("https://a"), 0.9, 0.0005);
        a.snippet = "the quick brown fox jumps over the lazy dog".to_string();
        let mut b = source("tavily", Some("https://b"), 0.8, 0.005);
        b.snippet = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG".to_string();
        let merged_text = build_merged_text(&[a, b]);
        assert_eq!(merged_text.matches("quick brown fox").count(), 1);
    }

    #[test]
    fn entry_includes_title_when_present() {
        let mut s = source("exa", Some("https://a"), 0.9, 0.0005);
        s.title = "Example Title".to_string();
        let merged_text = build_merged_text(&[s]);
        assert!(merged_text.starts_with("[exa] Example Title\n"));
    }
}
