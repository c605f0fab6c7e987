pub mod queue;
pub mod sources;

use async_trait::async_trait;
use serde_json::Value;

/// A candidate company surfaced by a discovery source, not yet resolved to
/// a `companies` row.
#[derive(Debug, Clone)]
pub struct DiscoveredCompany {
    pub name: String,
    pub domain: Option<String>,
    pub careers_url: Option<String>,
    pub website_url: Option<String>,
    pub metadata: Value,
}

/// A pluggable producer of candidate company records. Adding a new source
/// is a registry entry plus an implementation of this trait — no core
/// pipeline changes.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn is_enabled(&self) -> bool;
    async fn produce(&self, limit: usize) -> anyhow::Result<Vec<DiscoveredCompany>>;
}

/// Registry keyed by stable string identifier, mirroring the collector
/// registry's `get_collector` lookup.
pub fn get_source(name: &str) -> Option<Box<dyn DiscoverySource>> {
    match name {
        "seed_list" => Some(Box::new(sources::seed_list::SeedListSource::default())),
        _ => None,
    }
}

pub fn all_source_names() -> &'static [&'static str] {
    &["seed_list"]
}

pub fn enabled_sources(names: Option<&[String]>) -> Vec<Box<dyn DiscoverySource>> {
    let candidates: Vec<&str> = match names {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => all_source_names().to_vec(),
    };
    candidates
        .into_iter()
        .filter_map(get_source)
        .filter(|s| s.is_enabled())
        .collect()
}
