use std::sync::Arc;

use async_trait::async_trait;
use aivis_core::{
    normalize_domain, CompaniesFile, CompanyConfig, CompanyContext, KnownCompetitor,
};

use crate::error::{PipelineError, ProviderError};
use crate::services::CompanySource;

/// [`CompanySource`] backed by the YAML company registry.
#[derive(Debug)]
pub struct RegistryCompanySource {
    registry: CompaniesFile,
}

impl RegistryCompanySource {
    #[must_use]
    pub fn new(registry: CompaniesFile) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CompanySource for RegistryCompanySource {
    async fn find_company(&self, company_id: &str) -> Result<Option<CompanyConfig>, ProviderError> {
        Ok(self.registry.find(company_id).cloned())
    }
}

/// Assembles the grounded [`CompanyContext`] for a run.
pub struct CompanyContextBuilder {
    source: Arc<dyn CompanySource>,
}

impl CompanyContextBuilder {
    #[must_use]
    pub fn new(source: Arc<dyn CompanySource>) -> Self {
        Self { source }
    }

    /// Look the company up and build its context. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ContextBuildFailure`] if the company is
    /// unknown, the lookup fails, or the record has an unusable domain or no
    /// knowledge at all.
    pub async fn build(&self, company_id: &str) -> Result<CompanyContext, PipelineError> {
        let failure = |reason: String| PipelineError::ContextBuildFailure {
            company_id: company_id.to_string(),
            reason,
        };

        let record = self
            .source
            .find_company(company_id)
            .await
            .map_err(|e| failure(format!("company lookup failed: {e}")))?
            .ok_or_else(|| failure("no company record exists".to_string()))?;

        build_context(company_id, &record).map_err(failure)
    }
}

fn build_context(company_id: &str, record: &CompanyConfig) -> Result<CompanyContext, String> {
    let domain = normalize_domain(&record.domain)
        .ok_or_else(|| format!("invalid primary domain '{}'", record.domain))?;

    let overview = non_blank(&record.overview);
    let knowledge = non_blank(&record.knowledge);
    if overview.is_empty() && knowledge.is_empty() {
        return Err("company record has no overview or knowledge".to_string());
    }

    let owned_domains = CompanyContext::normalize_domains(
        std::iter::once(domain.as_str()).chain(record.owned_domains.iter().map(String::as_str)),
    );
    let operated_domains: Vec<String> =
        CompanyContext::normalize_domains(record.operated_domains.iter().map(String::as_str))
            .into_iter()
            .filter(|d| !owned_domains.contains(d))
            .collect();

    let competitors = record
        .competitors
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| KnownCompetitor {
            name: c.name.trim().to_string(),
            domain: c.domain.as_deref().and_then(normalize_domain),
        })
        .collect();

    Ok(CompanyContext {
        id: company_id.trim().to_lowercase(),
        name: record.name.trim().to_string(),
        domain,
        industry: record.industry.trim().to_string(),
        overview,
        knowledge,
        aliases: non_blank(&record.aliases),
        owned_domains,
        operated_domains,
        competitors,
    })
}

fn non_blank(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use aivis_core::CompetitorConfig;

    use super::*;

    fn record() -> CompanyConfig {
        CompanyConfig {
            name: "Acme Analytics".to_string(),
            domain: "https://www.Acme.io/".to_string(),
            industry: "product analytics".to_string(),
            aliases: vec!["Acme".to_string(), "  ".to_string()],
            owned_domains: vec!["docs.acme.io".to_string(), "acme.io".to_string()],
            operated_domains: vec!["acme.medium.com".to_string()],
            competitors: vec![
                CompetitorConfig {
                    name: "Mixpanel".to_string(),
                    domain: Some("https://mixpanel.com".to_string()),
                },
                CompetitorConfig {
                    name: "Heap".to_string(),
                    domain: None,
                },
            ],
            overview: vec!["Self-serve analytics.".to_string()],
            knowledge: vec!["funnels".to_string()],
        }
    }

    fn builder_with(records: Vec<CompanyConfig>) -> CompanyContextBuilder {
        CompanyContextBuilder::new(Arc::new(RegistryCompanySource::new(CompaniesFile {
            companies: records,
        })))
    }

    #[tokio::test]
    async fn builds_context_with_normalised_domains() {
        let ctx = builder_with(vec![record()]).build("Acme-Analytics").await.unwrap();
        assert_eq!(ctx.id, "acme-analytics");
        assert_eq!(ctx.domain, "acme.io");
        assert_eq!(
            ctx.owned_domains,
            vec!["acme.io".to_string(), "docs.acme.io".to_string()]
        );
        assert_eq!(ctx.operated_domains, vec!["acme.medium.com".to_string()]);
        assert_eq!(ctx.aliases, vec!["Acme".to_string()]);
        assert_eq!(ctx.competitors[0].domain.as_deref(), Some("mixpanel.com"));
        assert!(ctx.competitors[1].domain.is_none());
    }

    #[tokio::test]
    async fn unknown_company_is_context_failure() {
        let err = builder_with(vec![record()]).build("globex").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ContextBuildFailure { ref company_id, .. } if company_id == "globex"
        ));
    }

    #[tokio::test]
    async fn record_without_knowledge_is_context_failure() {
        let mut bare = record();
        bare.overview = vec![" ".to_string()];
        bare.knowledge.clear();
        let err = builder_with(vec![bare]).build("acme-analytics").await.unwrap_err();
        assert!(matches!(err, PipelineError::ContextBuildFailure { .. }));
    }

    #[tokio::test]
    async fn lookup_error_is_context_failure() {
        struct Broken;

        #[async_trait]
        impl CompanySource for Broken {
            async fn find_company(
                &self,
                _company_id: &str,
            ) -> Result<Option<CompanyConfig>, ProviderError> {
                Err(ProviderError::Unavailable { status: 503 })
            }
        }

        let err = CompanyContextBuilder::new(Arc::new(Broken))
            .build("acme")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lookup failed"));
    }
}
