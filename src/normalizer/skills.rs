/// Curated skills vocabulary. Matching is case-insensitive substring
/// intersection against this list rather than free-form NER, keeping the
/// output a closed, de-duplicated set.
const SKILLS_VOCABULARY: &[&str] = &[
    "rust",
    "python",
    "golang",
    "java",
    "javascript",
    "typescript",
    "c++",
    "kubernetes",
    "docker",
    "terraform",
    "aws",
    "gcp",
    "azure",
    "postgresql",
    "mysql",
    "redis",
    "kafka",
    "react",
    "vue",
    "graphql",
    "sql",
    "machine learning",
    "tensorflow",
    "pytorch",
    "spark",
    "airflow",
    "ci/cd",
    "rest api",
    "microservices",
    "figma",
];

/// Strips a trailing "s", "es", or "ing" so "kubernetes" (already singular
/// in the vocabulary) still matches "kubernetes clusters" and similar.
fn stem(word: &str) -> String {
    if let Some(stripped) = word.strip_suffix("ing") {
        return stripped.to_string();
    }
    if let Some(stripped) = word.strip_suffix("es") {
        return stripped.to_string();
    }
    if let Some(stripped) = word.strip_suffix('s') {
        return stripped.to_string();
    }
    word.to_string()
}

/// Extracts the subset of the curated vocabulary present in `text`,
/// preserving vocabulary order and de-duplicating.
pub fn extract_skills(text: &str) -> Vec<String> {
    let lowered = text.to_ascii_lowercase();
    let tokens: Vec<String> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '/')
        .filter(|t| !t.is_empty())
        .map(stem)
        .collect();

    SKILLS_VOCABULARY
        .iter()
        .filter(|skill| {
            if skill.contains(' ') || skill.contains('/') {
                lowered.contains(*skill)
            } else {
                tokens.iter().any(|t| t == *skill)
            }
        })
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_word_skills_with_stemming() {
        let skills = extract_skills("We use Kubernetes clusters and write Rust services");
        assert!(skills.contains(&"kubernetes".to_string()));
        assert!(skills.contains(&"rust".to_string()));
    }

    #[test]
    fn extracts_multi_word_skills() {
        let skills = extract_skills("Experience with machine learning pipelines");
        assert!(skills.contains(&"machine learning".to_string()));
    }

    #[test]
    fn unmatched_text_yields_empty() {
        assert!(extract_skills("We like long walks on the beach").is_empty());
    }

    #[test]
    fn duplicates_collapse() {
        let skills = extract_skills("rust rust rust developer");
        assert_eq!(skills.iter().filter(|s| *s == "rust").count(), 1);
    }
}
