use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

/// Matches `$120k - $150k`, `120,000-150,000`, `$95,000`, `$85k`, etc.
/// Currency symbols and thousands separators are stripped before parsing;
/// the result is currency-agnostic (see DESIGN.md).
static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$?\s*([\d,]+(?:\.\d+)?)\s*(k)?\s*(?:-|to|–)\s*\$?\s*([\d,]+(?:\.\d+)?)\s*(k)?").unwrap()
});

static SINGLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\$?\s*([\d,]+(?:\.\d+)?)\s*(k)?").unwrap());

fn parse_amount(digits: &str, has_k_suffix: bool) -> Option<f64> {
    let cleaned = digits.replace(',', "");
    let value: f64 = cleaned.parse().ok()?;
    Some(if has_k_suffix { value * 1000.0 } else { value })
}

/// Extracts a salary range from free text. A single value is treated as
/// both the floor and ceiling. Returns `None` when nothing parses, or when
/// the parsed range is inverted (min > max).
pub fn extract_salary(raw: &str) -> Option<SalaryRange> {
    if let Some(caps) = RANGE_PATTERN.captures(raw) {
        let min = parse_amount(&caps[1], caps.get(2).is_some())?;
        let max = parse_amount(&caps[3], caps.get(4).is_some())?;
        if min <= max {
            return Some(SalaryRange { min, max });
        }
        return Some(SalaryRange { min: max, max: min });
    }

    if let Some(caps) = SINGLE_PATTERN.captures(raw) {
        let value = parse_amount(&caps[1], caps.get(2).is_some())?;
        return Some(SalaryRange { min: value, max: value });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_k_suffixed_range() {
        let range = extract_salary("$120k - $150k").unwrap();
        assert_eq!(range, SalaryRange { min: 120_000.0, max: 150_000.0 });
    }

    #[test]
    fn parses_comma_separated_full_amounts() {
        let range = extract_salary("Salary: 95,000 - 110,000 USD").unwrap();
        assert_eq!(range, SalaryRange { min: 95_000.0, max: 110_000.0 });
    }

    #[test]
    fn single_value_becomes_a_point_range() {
        let range = extract_salary("$85k").unwrap();
        assert_eq!(range, SalaryRange { min: 85_000.0, max: 85_000.0 });
    }

    #[test]
    fn no_numbers_yields_none() {
        assert_eq!(extract_salary("Competitive salary"), None);
    }
}
