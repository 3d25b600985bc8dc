use serde::{Deserialize, Serialize};

/// A competitor aggregated across one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    /// Case-insensitive identity (lowercased, whitespace collapsed).
    pub key: String,
    /// First-seen spelling, for display.
    pub name: String,
    /// Number of responses that named this competitor.
    pub mention_count: usize,
    /// Distinct normalised domains cited for this competitor, in first-seen order.
    pub domains: Vec<String>,
}

impl CompetitorRecord {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            key: competitor_key(name),
            name: name.trim().to_string(),
            mention_count: 0,
            domains: Vec::new(),
        }
    }

    pub fn add_domain(&mut self, domain: &str) {
        if !domain.is_empty() && !self.domains.iter().any(|d| d == domain) {
            self.domains.push(domain.to_string());
        }
    }
}

/// Identity key for a competitor name: lowercase with runs of whitespace
/// collapsed to one space.
#[must_use]
pub fn competitor_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_case_and_space_insensitive() {
        assert_eq!(competitor_key("  Google   Analytics "), "google analytics");
        assert_eq!(competitor_key("GOOGLE analytics"), "google analytics");
    }

    #[test]
    fn new_record_keeps_display_spelling() {
        let record = CompetitorRecord::new(" PostHog ");
        assert_eq!(record.name, "PostHog");
        assert_eq!(record.key, "posthog");
        assert_eq!(record.mention_count, 0);
    }

    #[test]
    fn add_domain_dedupes() {
        let mut record = CompetitorRecord::new("Heap");
        record.add_domain("heap.io");
        record.add_domain("heap.io");
        record.add_domain("");
        assert_eq!(record.domains, vec!["heap.io".to_string()]);
    }
}
