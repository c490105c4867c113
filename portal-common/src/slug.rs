//! Slug generation for speaker-facing project URLs
//!
//! Slugs keep ASCII letters and digits plus Korean (Hangul syllables and jamo),
//! turn whitespace runs into single hyphens and trim hyphens from both ends.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9가-힣ㄱ-ㅎㅏ-ㅣ\s-]").expect("valid slug regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid slug regex"));
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid slug regex"));

/// Fallback when a title slugifies to nothing (e.g. only punctuation)
pub const EMPTY_SLUG_FALLBACK: &str = "project";

/// Derive a slug from a display title
///
/// # Examples
/// ```
/// use portal_common::slugify;
///
/// assert_eq!(slugify("  Rust Conf 2025! "), "rust-conf-2025");
/// assert_eq!(slugify("2025 한국 개발자 컨퍼런스"), "2025-한국-개발자-컨퍼런스");
/// ```
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

/// Make `base` unique against slugs already in use
///
/// An empty base becomes [`EMPTY_SLUG_FALLBACK`]. Collisions get `-2`, `-3`, ... appended.
pub fn unique_slug(base: &str, taken: &HashSet<String>) -> String {
    let base = if base.is_empty() { EMPTY_SLUG_FALLBACK } else { base };

    if !taken.contains(base) {
        return base.to_string();
    }

    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_hyphenates() {
        assert_eq!(slugify("Annual Developer Summit"), "annual-developer-summit");
    }

    #[test]
    fn test_strips_punctuation() {
        assert_eq!(slugify("AI & ML: What's Next?"), "ai-ml-whats-next");
    }

    #[test]
    fn test_preserves_korean() {
        assert_eq!(slugify("제 3회 데이터 포럼"), "제-3회-데이터-포럼");
        assert_eq!(slugify("ㅋㅋ 모임"), "ㅋㅋ-모임");
    }

    #[test]
    fn test_collapses_whitespace_and_hyphens() {
        assert_eq!(slugify("a  -  b\t\nc"), "a-b-c");
        assert_eq!(slugify("--edge--case--"), "edge-case");
    }

    #[test]
    fn test_drops_other_scripts() {
        assert_eq!(slugify("Café Tokyo 東京"), "caf-tokyo");
    }

    #[test]
    fn test_empty_title() {
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_unique_slug_no_collision() {
        let taken = HashSet::new();
        assert_eq!(unique_slug("rust-conf", &taken), "rust-conf");
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let taken: HashSet<String> = ["rust-conf", "rust-conf-2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(unique_slug("rust-conf", &taken), "rust-conf-3");
    }

    #[test]
    fn test_unique_slug_empty_base_uses_fallback() {
        let taken: HashSet<String> = [EMPTY_SLUG_FALLBACK.to_string()].into_iter().collect();
        assert_eq!(unique_slug("", &HashSet::new()), "project");
        assert_eq!(unique_slug("", &taken), "project-2");
    }
}
