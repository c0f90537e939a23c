//! Round-robin model rotation with rate-limit fallback (C12, §4.10).

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{default_candidates, CandidateModel};

const DEFAULT_WAIT_SECONDS: u64 = 60;

/// Keeps a candidate list, a monotonic round-robin index, and the set of
/// currently rate-limited ids (§4.10 "Rotator").
pub struct Rotator {
    candidates: Vec<CandidateModel>,
    index: Mutex<usize>,
    rate_limited: Mutex<HashSet<String>>,
    wait_seconds: u64,
}

impl Default for Rotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Rotator {
    pub fn new() -> Self {
        Self::with_candidates(default_candidates())
    }

    pub fn with_candidates(candidates: Vec<CandidateModel>) -> Self {
        Self {
            candidates,
            index: Mutex::new(0),
            rate_limited: Mutex::new(HashSet::new()),
            wait_seconds: DEFAULT_WAIT_SECONDS,
        }
    }

    /// Overrides the 60s "all excluded" wait, for tests that can't afford
    /// the real delay.
    pub fn with_wait_seconds(mut self, wait_seconds: u64) -> Self {
        self.wait_seconds = wait_seconds;
        self
    }

    /// Picks the next model id for `task_type` (§4.10): excludes rate-limited
    /// ids, prefers a strength-tag match among what's left, and falls back to
    /// any remaining candidate otherwise. If every candidate is excluded,
    /// waits `wait_seconds` then clears the exclusion set before choosing.
    ///
    /// The round-robin index advances monotonically across calls regardless
    /// of which pool it's indexing into, so a changing candidate pool shifts
    /// which model a given index lands on — this mirrors the reference
    /// rotation logic rather than tracking a per-pool cursor.
    pub async fn next(&self, task_type: &str) -> String {
        let mut available = self.available_candidates();

        if available.is_empty() {
            tokio::time::sleep(Duration::from_secs(self.wait_seconds)).await;
            self.rate_limited.lock().expect("rate_limited mutex poisoned").clear();
            available = self.candidates.iter().collect();
        }

        let preferred: Vec<&CandidateModel> = available.iter().copied().filter(|c| c.strength == task_type).collect();
        let pool = if preferred.is_empty() { available } else { preferred };

        let mut index = self.index.lock().expect("index mutex poisoned");
        let chosen = pool[*index % pool.len()].id.clone();
        *index += 1;
        chosen
    }

    fn available_candidates(&self) -> Vec<&CandidateModel> {
        let rate_limited = self.rate_limited.lock().expect("rate_limited mutex poisoned");
        self.candidates.iter().filter(|c| !rate_limited.contains(&c.id)).collect()
    }

    pub fn mark_rate_limited(&self, model_id: &str) {
        self.rate_limited
            .lock()
            .expect("rate_limited mutex poisoned")
            .insert(model_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_candidates() -> Vec<CandidateModel> {
        vec![
            CandidateModel {
                id: "a".to_string(),
                name: "A".to_string(),
                context: 1000,
                strength: "reasoning".to_string(),
                notes: String::new(),
            },
            CandidateModel {
                id: "b".to_string(),
                name: "B".to_string(),
                context: 1000,
                strength: "general".to_string(),
                notes: String::new(),
            },
            CandidateModel {
                id: "c".to_string(),
                name: "C".to_string(),
                context: 1000,
                strength: "reasoning".to_string(),
                notes: String::new(),
            },
        ]
    }

    #[tokio::test]
    async fn prefers_strength_match_when_available() {
        let rotator = Rotator::with_candidates(three_candidates());
        let first = rotator.next("reasoning").await;
        assert!(first == "a" || first == "c");
    }

    #[tokio::test]
    async fn falls_back_to_any_candidate_without_strength_match() {
        let rotator = Rotator::with_candidates(three_candidates());
        let chosen = rotator.next("coding").await;
        assert!(["a", "b", "c"].contains(&chosen.as_str()));
    }

    #[tokio::test]
    async fn excludes_rate_limited_ids() {
        let rotator = Rotator::with_candidates(three_candidates());
        rotator.mark_rate_limited("a");
        rotator.mark_rate_limited("c");
        let chosen = rotator.next("reasoning").await;
        assert_eq!(chosen, "b");
    }

    #[tokio::test]
    async fn waits_then_clears_exclusions_when_all_rate_limited() {
        let rotator = Rotator::with_candidates(three_candidates()).with_wait_seconds(0);
        rotator.mark_rate_limited("a");
        rotator.mark_rate_limited("b");
        rotator.mark_rate_limited("c");

        let chosen = rotator.next("reasoning").await;
        assert!(["a", "b", "c"].contains(&chosen.as_str()));

        // the exclusion set was cleared, so a second pick doesn't wait again
        let second = rotator.next("reasoning").await;
        assert!(["a", "b", "c"].contains(&second.as_str()));
    }

    #[tokio::test]
    async fn round_robin_advances_monotonically() {
        let rotator = Rotator::with_candidates(three_candidates());
        let first = rotator.next("unmatched").await;
        let second = rotator.next("unmatched").await;
        let third = rotator.next("unmatched").await;
        let fourth = rotator.next("unmatched").await;
        assert_eq!(first, "a");
        assert_eq!(second, "b");
        assert_eq!(third, "c");
        assert_eq!(fourth, "a");
    }
}
