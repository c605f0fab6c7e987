use async_trait::async_trait;
use serde_json::json;

use super::super::{DiscoveredCompany, DiscoverySource};

/// A small hand-curated company list. The core does not operate a general
/// web crawler; this source is the intended way to seed a known,
/// curated company set rather than discovering one from the open web.
#[derive(Default)]
pub struct SeedListSource;

const SEED_COMPANIES: &[(&str, &str)] = &[
    ("Acme Corp", "acme.test"),
    ("Globex", "globex.test"),
    ("Initech", "initech.test"),
];

#[async_trait]
impl DiscoverySource for SeedListSource {
    fn name(&self) -> &'static str {
        "seed_list"
    }

    fn description(&self) -> &'static str {
        "Hand-curated list of companies to bootstrap the catalog"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn produce(&self, limit: usize) -> anyhow::Result<Vec<DiscoveredCompany>> {
        let companies = SEED_COMPANIES
            .iter()
            .take(limit)
            .map(|(name, domain)| DiscoveredCompany {
                name: name.to_string(),
                domain: Some(domain.to_string()),
                careers_url: Some(format!("https://{domain}/careers")),
                website_url: Some(format!("https://{domain}")),
                metadata: json!({ "source": "seed_list" }),
            })
            .collect();
        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn respects_the_limit() {
        let source = SeedListSource::default();
        let companies = source.produce(1).await.unwrap();
        assert_eq!(companies.len(), 1);
    }
}
