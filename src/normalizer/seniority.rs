/// The closed set of 9 seniority values, ordered from least to most senior
/// so adjacency (one-step tolerance) can be computed by index distance.
pub const SENIORITY_LEVELS: [&str; 9] = [
    "intern",
    "junior",
    "mid",
    "senior",
    "staff",
    "principal",
    "director",
    "vp",
    "c_level",
];

const LEVEL_KEYWORDS: &[(&str, &str)] = &[
    ("intern", "intern"),
    ("junior", "junior"),
    ("jr.", "junior"),
    ("staff", "staff"),
    ("principal", "principal"),
    ("director", "director"),
    ("vp", "vp"),
    ("vice president", "vp"),
    ("chief", "c_level"),
    ("cto", "c_level"),
    ("ceo", "c_level"),
    ("senior", "senior"),
    ("sr.", "senior"),
    ("lead", "senior"),
    ("mid-level", "mid"),
    ("mid level", "mid"),
];

/// Scans title then description for explicit level words; absence yields
/// `None` rather than guessing.
pub fn infer(title: &str, description: Option<&str>) -> Option<&'static str> {
    let title_lower = title.to_ascii_lowercase();
    if let Some(level) = scan(&title_lower) {
        return Some(level);
    }
    if let Some(description) = description {
        let description_lower = description.to_ascii_lowercase();
        if let Some(level) = scan(&description_lower) {
            return Some(level);
        }
    }
    None
}

fn scan(text: &str) -> Option<&'static str> {
    LEVEL_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, level)| SENIORITY_LEVELS.iter().find(|l| **l == *level).copied().unwrap())
}

pub fn index_of(level: &str) -> Option<usize> {
    SENIORITY_LEVELS.iter().position(|l| *l == level)
}

/// True if `a` and `b` are the same level or adjacent in the ordering.
pub fn within_one_step(a: &str, b: &str) -> bool {
    match (index_of(a), index_of(b)) {
        (Some(a), Some(b)) => a.abs_diff(b) <= 1,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_keyword_wins_over_description() {
        assert_eq!(infer("Senior Engineer", Some("entry level role")), Some("senior"));
    }

    #[test]
    fn no_keyword_yields_none() {
        assert_eq!(infer("Engineer", Some("a great job")), None);
    }

    #[test]
    fn one_step_tolerance_allows_adjacent_levels() {
        assert!(within_one_step("mid", "senior"));
        assert!(within_one_step("mid", "junior"));
        assert!(!within_one_step("mid", "staff"));
    }
}
