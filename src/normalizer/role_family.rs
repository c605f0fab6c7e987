use std::sync::LazyLock;

use regex::Regex;

/// The closed set of 14 role families. `Other` is the fallback.
pub const ROLE_FAMILIES: [&str; 14] = [
    "engineering_management",
    "software_engineering",
    "data_engineering",
    "data_science",
    "devops_sre",
    "security",
    "product_management",
    "design",
    "marketing",
    "sales",
    "customer_success",
    "operations",
    "finance",
    "other",
];

/// Ordered rules, first match wins. Order matters: management titles must
/// be checked before the individual-contributor family they manage, e.g.
/// "Engineering Manager" should not land in software_engineering.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"engineering manager|director of engineering|vp of engineering|head of engineering").unwrap(), "engineering_management"),
        (Regex::new(r"site reliability|devops|platform engineer|infrastructure engineer|sre\b").unwrap(), "devops_sre"),
        (Regex::new(r"security engineer|application security|security analyst|infosec").unwrap(), "security"),
        (Regex::new(r"data engineer|analytics engineer|etl").unwrap(), "data_engineering"),
        (Regex::new(r"data scientist|machine learning|ml engineer|research scientist|applied scientist").unwrap(), "data_science"),
        (Regex::new(r"software engineer|backend engineer|frontend engineer|full.?stack|swe\b|developer").unwrap(), "software_engineering"),
        (Regex::new(r"product manager|product owner|product lead").unwrap(), "product_management"),
        (Regex::new(r"product designer|ux designer|ui designer|graphic designer|visual designer").unwrap(), "design"),
        (Regex::new(r"marketing|growth|content strategist|seo\b").unwrap(), "marketing"),
        (Regex::new(r"account executive|sales rep|business development|sdr\b|bdr\b").unwrap(), "sales"),
        (Regex::new(r"customer success|support engineer|customer support").unwrap(), "customer_success"),
        (Regex::new(r"operations manager|office manager|people operations|hr\b|recruiter").unwrap(), "operations"),
        (Regex::new(r"accountant|controller|financial analyst|finance manager").unwrap(), "finance"),
    ]
});

/// Classifies a job title into a role family. Unmatched titles fall to
/// `other`.
pub fn classify(title: &str) -> &'static str {
    let lowered = title.to_ascii_lowercase();
    RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&lowered))
        .map(|(_, family)| *family)
        .unwrap_or("other")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engineering_manager_does_not_become_software_engineering() {
        assert_eq!(classify("Engineering Manager"), "engineering_management");
    }

    #[test]
    fn plain_software_engineer_classifies_correctly() {
        assert_eq!(classify("Senior Software Engineer"), "software_engineering");
    }

    #[test]
    fn unmatched_title_falls_to_other() {
        assert_eq!(classify("Chief Astronaut"), "other");
    }

    #[test]
    fn all_rule_targets_are_declared_role_families() {
        for (_, family) in RULES.iter() {
            assert!(ROLE_FAMILIES.contains(family));
        }
    }
}
