use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use url::Url;

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct RobotsRules {
    disallow_prefixes: Vec<String>,
    fetched_at: Instant,
}

/// A narrow robots.txt parser covering `User-agent`/`Disallow`/`Allow`
/// stanzas for the wildcard agent. Cached per host for a day.
pub struct RobotsCache {
    client: reqwest::Client,
    entries: Mutex<HashMap<String, RobotsRules>>,
}

impl RobotsCache {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Non-API endpoints must honor robots.txt; API endpoints published by
    /// ATS vendors are treated as allowed and never reach this check.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return true;
        };
        let host = host.to_string();

        if let Some(cached) = self.cached(&host) {
            return Self::matches(&cached, url.path());
        }

        let rules = self.fetch(url, &host).await;
        let allowed = Self::matches(&rules, url.path());
        self.entries.lock().expect("robots cache poisoned").insert(host, rules);
        allowed
    }

    fn cached(&self, host: &str) -> Option<RobotsRules> {
        let entries = self.entries.lock().expect("robots cache poisoned");
        entries
            .get(host)
            .filter(|rules| rules.fetched_at.elapsed() < CACHE_TTL)
            .cloned()
    }

    async fn fetch(&self, url: &Url, host: &str) -> RobotsRules {
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);
        let body = match self.client.get(&robots_url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            _ => String::new(),
        };
        RobotsRules {
            disallow_prefixes: parse_disallow_prefixes(&body),
            fetched_at: Instant::now(),
        }
    }

    fn matches(rules: &RobotsRules, path: &str) -> bool {
        !rules
            .disallow_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
    }
}

/// Parses the `User-agent: *` stanza's `Disallow` lines. Any agent-specific
/// stanza is ignored since this crawler identifies with a single UA.
fn parse_disallow_prefixes(body: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut in_wildcard_block = false;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => in_wildcard_block = value == "*",
            "disallow" if in_wildcard_block && !value.is_empty() => {
                prefixes.push(value.to_string());
            }
            "allow" if in_wildcard_block => {
                prefixes.retain(|p| p != value);
            }
            _ => {}
        }
    }
    prefixes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wildcard_disallow_block() {
        let body = "User-agent: *\nDisallow: /admin\nDisallow: /private\n\nUser-agent: Googlebot\nDisallow: /\n";
        let prefixes = parse_disallow_prefixes(body);
        assert_eq!(prefixes, vec!["/admin".to_string(), "/private".to_string()]);
    }

    #[test]
    fn ignores_agent_specific_blocks() {
        let body = "User-agent: Googlebot\nDisallow: /careers\n";
        assert!(parse_disallow_prefixes(body).is_empty());
    }
}
