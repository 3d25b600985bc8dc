//! Label normalisation for enum values arriving from external services and CLI args.

/// Normalise a free-form label into `snake_case`.
///
/// Handles the spellings external judges tend to produce: `"very positive"`,
/// `"Very-Positive"`, `"veryPositive"` and `"VERY_POSITIVE"` all become
/// `"very_positive"`.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;

    for c in raw.trim().chars() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }

    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_and_dashes_become_underscores() {
        assert_eq!(normalize_label("very positive"), "very_positive");
        assert_eq!(normalize_label("Very-Positive"), "very_positive");
    }

    #[test]
    fn camel_case_is_split() {
        assert_eq!(normalize_label("veryPositive"), "very_positive");
        assert_eq!(normalize_label("VeryNegative"), "very_negative");
    }

    #[test]
    fn screaming_case_is_lowered_without_extra_separators() {
        assert_eq!(normalize_label("VERY_POSITIVE"), "very_positive");
        assert_eq!(normalize_label("PRIMARY"), "primary");
    }

    #[test]
    fn surrounding_noise_is_trimmed() {
        assert_eq!(normalize_label("  passing_ "), "passing");
        assert_eq!(normalize_label(""), "");
    }
}
