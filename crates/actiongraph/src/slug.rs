//! Filesystem-safe identifiers derived from free text.

/// Lower-case, ASCII alphanumerics only, runs of anything else collapsed to a
/// single `-`, no leading or trailing separator.
///
/// ```
/// use actiongraph::slug::slugify;
/// assert_eq!(slugify("User logs in (happy path)"), "user-logs-in-happy-path");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    join_words(text, '-')
}

/// Like [`slugify`] but joined with `_`, for Rust module and file names.
#[must_use]
pub fn snake_case(text: &str) -> String {
    let joined = join_words(text, '_');
    match joined.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("s_{joined}"),
        Some(_) => joined,
        None => "scenario".to_string(),
    }
}

fn join_words(text: &str, separator: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending && !out.is_empty() {
                out.push(separator);
            }
            pending = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Log in"), "log-in");
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
        assert_eq!(slugify("Ünïcode ok"), "n-code-ok");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("User logs in"), "user_logs_in");
        assert_eq!(snake_case("2FA prompt"), "s_2fa_prompt");
        assert_eq!(snake_case("!!!"), "scenario");
    }

    proptest! {
        #[test]
        fn prop_slug_is_filesystem_safe(text in ".{0,64}") {
            let slug = slugify(&text);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(!slug.contains("__"));
        }

        #[test]
        fn prop_slug_is_idempotent(text in ".{0,64}") {
            let once = slugify(&text);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
