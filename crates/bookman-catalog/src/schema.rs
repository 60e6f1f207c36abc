//! Book validation schema
//!
//! One table of field rules, checked once per submission. Add and edit both
//! go through `BookDraft::parse`, so the two paths cannot drift apart.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationErrors;

/// Earliest accepted publication year.
pub const MIN_YEAR: i64 = -3000;

/// Years accepted past the current one (announced editions).
const FUTURE_YEARS: i64 = 10;

static TITLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[\p{L}\p{N}\s\-.,;:'"()!?]+$"#).expect("valid title pattern"));

static AUTHOR_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s\-.']+$").expect("valid author pattern"));

static GENRE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s\-/]+$").expect("valid genre pattern"));

/// Digits with an optional leading minus. The lower bound of the year range
/// is -3000, which only a signed year can reach, so BCE years are accepted.
static YEAR_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid year pattern"));

pub(crate) struct TextRule {
    pub field: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub max_chars: usize,
    pub allowed: &'static LazyLock<Regex>,
}

pub(crate) static TITLE: TextRule = TextRule {
    field: "title",
    label: "Title",
    required: true,
    max_chars: 255,
    allowed: &TITLE_CHARS,
};

pub(crate) static AUTHOR: TextRule = TextRule {
    field: "author",
    label: "Author",
    required: true,
    max_chars: 255,
    allowed: &AUTHOR_CHARS,
};

pub(crate) static GENRE: TextRule = TextRule {
    field: "genre",
    label: "Genre",
    required: false,
    max_chars: 100,
    allowed: &GENRE_CHARS,
};

impl TextRule {
    /// Trim and check one value. Returns `None` for an empty optional field.
    pub fn check(&self, raw: &str, errors: &mut ValidationErrors) -> Option<String> {
        let value = raw.trim();

        if value.is_empty() {
            if self.required {
                errors.push(self.field, format!("{} is required.", self.label));
            }
            return None;
        }

        if value.chars().count() > self.max_chars {
            errors.push(
                self.field,
                format!("{} cannot exceed {} characters.", self.label, self.max_chars),
            );
            return None;
        }

        if !self.allowed.is_match(value) {
            errors.push(
                self.field,
                format!("{} contains characters that are not allowed.", self.label),
            );
            return None;
        }

        Some(value.to_string())
    }
}

pub fn max_year(current_year: i32) -> i64 {
    i64::from(current_year) + FUTURE_YEARS
}

/// Parse the optional year field against `[MIN_YEAR, current_year + 10]`.
pub(crate) fn check_year(
    raw: &str,
    current_year: i32,
    errors: &mut ValidationErrors,
) -> Option<i32> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let max = max_year(current_year);
    let out_of_range = format!("Year must be between {MIN_YEAR} and {max}.");

    if !YEAR_DIGITS.is_match(value) {
        errors.push("year", "Year must be a whole number.");
        return None;
    }

    // Digit strings too long for i64 are out of range, not malformed
    match value.parse::<i64>() {
        Ok(year) if (MIN_YEAR..=max).contains(&year) => i32::try_from(year).ok(),
        _ => {
            errors.push("year", out_of_range);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_allow_list() {
        let mut errors = ValidationErrors::default();
        let title = TITLE.check("  ¿Cien años de soledad? (1st ed.)  ", &mut errors);
        // '¿' is not in the allow-list
        assert!(title.is_none());
        assert!(errors.has("title"));

        let mut errors = ValidationErrors::default();
        let title = TITLE.check("Cien años de soledad: \"1st ed.\"", &mut errors);
        assert_eq!(title.as_deref(), Some("Cien años de soledad: \"1st ed.\""));
        assert!(errors.is_empty());
    }

    #[test]
    fn author_rejects_digits() {
        let mut errors = ValidationErrors::default();
        assert!(AUTHOR.check("Agent 007", &mut errors).is_none());
        assert!(errors.has("author"));

        let mut errors = ValidationErrors::default();
        assert_eq!(
            AUTHOR.check("Antoine de Saint-Exupéry", &mut errors).as_deref(),
            Some("Antoine de Saint-Exupéry")
        );
    }

    #[test]
    fn optional_genre_may_be_blank() {
        let mut errors = ValidationErrors::default();
        assert!(GENRE.check("   ", &mut errors).is_none());
        assert!(errors.is_empty());

        assert_eq!(
            GENRE.check("Sci-Fi/Fantasy", &mut errors).as_deref(),
            Some("Sci-Fi/Fantasy")
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = ValidationErrors::default();
        let exactly_max = "é".repeat(255);
        assert!(TITLE.check(&exactly_max, &mut errors).is_some());

        let too_long = "é".repeat(256);
        assert!(TITLE.check(&too_long, &mut errors).is_none());
        assert!(errors.has("title"));
    }

    #[test]
    fn year_bounds() {
        let mut errors = ValidationErrors::default();
        assert_eq!(check_year("1965", 2024, &mut errors), Some(1965));
        assert_eq!(check_year("-3000", 2024, &mut errors), Some(-3000));
        assert_eq!(check_year("2034", 2024, &mut errors), Some(2034));
        assert!(errors.is_empty());

        assert_eq!(check_year("2035", 2024, &mut errors), None);
        assert_eq!(check_year("-3001", 2024, &mut errors), None);
        assert_eq!(check_year("99999999999999999999", 2024, &mut errors), None);
        assert_eq!(errors.len(), 3);

        let mut errors = ValidationErrors::default();
        assert_eq!(check_year("19x5", 2024, &mut errors), None);
        assert_eq!(check_year("1965.0", 2024, &mut errors), None);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn year_sign_is_a_single_leading_minus() {
        let mut errors = ValidationErrors::default();
        assert_eq!(check_year("-44", 2024, &mut errors), Some(-44));
        assert!(errors.is_empty());

        for raw in ["+1965", "--44", "- 44", "44-", "\u{2212}44"] {
            let mut errors = ValidationErrors::default();
            assert_eq!(check_year(raw, 2024, &mut errors), None, "{raw:?}");
            assert_eq!(errors.messages(), vec!["Year must be a whole number.".to_string()]);
        }
    }
}
