use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A competitor declared for a company in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorConfig {
    pub name: String,
    pub domain: Option<String>,
}

/// One company entry in `companies.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub owned_domains: Vec<String>,
    #[serde(default)]
    pub operated_domains: Vec<String>,
    #[serde(default)]
    pub competitors: Vec<CompetitorConfig>,
    #[serde(default)]
    pub overview: Vec<String>,
    #[serde(default)]
    pub knowledge: Vec<String>,
}

impl CompanyConfig {
    /// Generate a URL-safe slug from the company name. Used as the company id.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Deserialize)]
pub struct CompaniesFile {
    pub companies: Vec<CompanyConfig>,
}

impl CompaniesFile {
    /// Find a company by id (slug), case-insensitively.
    #[must_use]
    pub fn find(&self, company_id: &str) -> Option<&CompanyConfig> {
        let wanted = company_id.trim().to_lowercase();
        self.companies.iter().find(|c| c.slug() == wanted)
    }
}

/// Load and validate the company registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_companies(path: &Path) -> Result<CompaniesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CompaniesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let companies_file: CompaniesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CompaniesFileParse)?;

    validate_companies(&companies_file)?;

    Ok(companies_file)
}

fn validate_companies(companies_file: &CompaniesFile) -> Result<(), ConfigError> {
    if companies_file.companies.is_empty() {
        return Err(ConfigError::Validation(
            "at least one company must be configured".to_string(),
        ));
    }

    let mut seen_slugs = HashSet::new();

    for company in &companies_file.companies {
        if company.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "company name must be non-empty".to_string(),
            ));
        }

        if normalize_domain(&company.domain).is_none() {
            return Err(ConfigError::Validation(format!(
                "company '{}' has an empty or invalid domain",
                company.name
            )));
        }

        let slug = company.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "company '{}' does not produce a usable id",
                company.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate company: '{}' (from company '{}')",
                slug, company.name
            )));
        }

        if let Some(blank) = company.competitors.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "company '{}' lists a competitor with an empty name (domain {:?})",
                company.name, blank.domain
            )));
        }
    }

    Ok(())
}

/// Reduce a URL or bare host to a lowercase registrable host.
///
/// Strips the scheme, credentials, `www.` prefix, port, path, query and
/// fragment. Returns `None` when nothing host-like remains.
#[must_use]
pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_lowercase();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed.as_str(), |(_, rest)| rest);
    let host_part = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_part = host_part
        .rsplit_once('@')
        .map_or(host_part, |(_, host)| host);
    let host = host_part.split(':').next().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host).trim_end_matches('.');

    if host.is_empty() || !host.contains('.') {
        return None;
    }
    Some(host.to_string())
}

/// `true` when `host` is `domain` or one of its subdomains.
#[must_use]
pub fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

#[cfg(test)]
#[path = "companies_test.rs"]
mod tests;
