const REMOTE_KEYWORDS: &[&str] = &["remote", "anywhere", "work from home", "work-from-home", "distributed team"];
const HYBRID_KEYWORDS: &[&str] = &["hybrid"];
const ONSITE_KEYWORDS: &[&str] = &["on-site", "on site", "onsite", "in office", "in-office"];

/// Curated gazetteer of city/region tokens used to lift place names out of
/// a free-text location string. Not exhaustive; grows as new ATS payloads
/// surface unrecognized entries.
const KNOWN_PLACES: &[&str] = &[
    "remote",
    "san francisco",
    "new york",
    "austin",
    "seattle",
    "boston",
    "chicago",
    "denver",
    "los angeles",
    "london",
    "berlin",
    "dublin",
    "toronto",
    "vancouver",
    "amsterdam",
    "paris",
    "singapore",
    "sydney",
    "bangalore",
    "tel aviv",
];

/// Classifies a raw location string into remote/hybrid/onsite, or `None`
/// when the string gives no signal either way.
pub fn classify_location_type(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_ascii_lowercase();
    if REMOTE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Some("remote");
    }
    if HYBRID_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Some("hybrid");
    }
    if ONSITE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Some("onsite");
    }
    None
}

/// Extracts known place names mentioned in the raw string. Order of
/// appearance in `KNOWN_PLACES` is preserved; duplicates are dropped.
pub fn extract_locations(raw: &str) -> Vec<String> {
    let lowered = raw.to_ascii_lowercase();
    let mut found = Vec::new();
    for place in KNOWN_PLACES {
        if lowered.contains(place) && !found.contains(place) {
            found.push(*place);
        }
    }
    found.into_iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_keyword_wins() {
        assert_eq!(classify_location_type("Remote (US)"), Some("remote"));
    }

    #[test]
    fn hybrid_keyword_detected() {
        assert_eq!(classify_location_type("Hybrid - Austin, TX"), Some("hybrid"));
    }

    #[test]
    fn unrecognized_string_yields_none() {
        assert_eq!(classify_location_type("Planet Earth"), None);
    }

    #[test]
    fn known_places_are_extracted() {
        assert_eq!(extract_locations("Austin or Remote"), vec!["remote", "austin"]);
    }
}
