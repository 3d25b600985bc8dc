use serde::{Deserialize, Serialize};

use crate::companies::{domain_matches, normalize_domain};

/// A competitor the company itself declared, with its normalised domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownCompetitor {
    pub name: String,
    pub domain: Option<String>,
}

/// Grounded profile of the target company, built once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub id: String,
    pub name: String,
    /// Normalised primary domain.
    pub domain: String,
    pub industry: String,
    pub overview: Vec<String>,
    pub knowledge: Vec<String>,
    pub aliases: Vec<String>,
    /// Normalised owned domains. Always contains `domain`.
    pub owned_domains: Vec<String>,
    pub operated_domains: Vec<String>,
    pub competitors: Vec<KnownCompetitor>,
}

impl CompanyContext {
    /// The company name followed by its aliases.
    pub fn name_variants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// `true` if `candidate` is the company's own name or one of its aliases.
    #[must_use]
    pub fn is_target_name(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        self.name_variants()
            .any(|variant| variant.trim().eq_ignore_ascii_case(candidate))
    }

    /// `true` if the host belongs to a declared owned domain.
    #[must_use]
    pub fn is_owned_host(&self, host: &str) -> bool {
        self.owned_domains.iter().any(|d| domain_matches(host, d))
    }

    /// `true` if the host belongs to a declared operated domain.
    #[must_use]
    pub fn is_operated_host(&self, host: &str) -> bool {
        self.operated_domains.iter().any(|d| domain_matches(host, d))
    }

    /// The declared competitor owning `host`, if any.
    #[must_use]
    pub fn competitor_for_host(&self, host: &str) -> Option<&KnownCompetitor> {
        self.competitors.iter().find(|c| {
            c.domain
                .as_deref()
                .is_some_and(|domain| domain_matches(host, domain))
        })
    }

    /// Normalise and deduplicate a list of declared domains, keeping order.
    #[must_use]
    pub fn normalize_domains<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for domain in raw.into_iter().filter_map(normalize_domain) {
            if !out.contains(&domain) {
                out.push(domain);
            }
        }
        out
    }
}
