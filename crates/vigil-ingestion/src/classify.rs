//! Keyword-based priority classification.
//!
//! Pure string matching, no model involved: lowercase substring search
//! over title plus abstract. A single high-tier hit outranks any number
//! of medium-tier hits. The function is deterministic and idempotent,
//! which is what lets reclassification re-run it after enrichment.

use vigil_common::Priority;
use vigil_config::KeywordConfig;

/// Classify one article. Returns the priority tier and every matched
/// keyword in configuration order (high tier first).
pub fn classify(
    title: &str,
    abstract_text: Option<&str>,
    keywords: &KeywordConfig,
) -> (Priority, Vec<String>) {
    let haystack = match abstract_text {
        Some(a) => format!("{title} {a}").to_lowercase(),
        None => title.to_lowercase(),
    };

    // A high-tier hit short-circuits; medium terms are not scanned.
    let matched_high = matches_in(&haystack, &keywords.high);
    if !matched_high.is_empty() {
        return (Priority::High, matched_high);
    }
    let matched_medium = matches_in(&haystack, &keywords.medium);
    if !matched_medium.is_empty() {
        return (Priority::Medium, matched_medium);
    }
    (Priority::Normal, Vec::new())
}

fn matches_in(haystack: &str, terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| !term.is_empty() && haystack.contains(&term.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> KeywordConfig {
        KeywordConfig {
            high: vec!["governmentality".into(), "통치성".into(), "assemblage".into()],
            medium: vec!["urban planning".into(), "도시계획".into()],
        }
    }

    #[test]
    fn test_high_tier_outranks_medium() {
        let (priority, matched) = classify(
            "Urban planning as governmentality",
            Some("A study of assemblage thinking."),
            &keywords(),
        );
        assert_eq!(priority, Priority::High);
        // Only high-tier matches are reported once the tier is decided.
        assert_eq!(matched, vec!["governmentality", "assemblage"]);
    }

    #[test]
    fn test_medium_only() {
        let (priority, matched) =
            classify("Rethinking urban planning", None, &keywords());
        assert_eq!(priority, Priority::Medium);
        assert_eq!(matched, vec!["urban planning"]);
    }

    #[test]
    fn test_no_match_is_normal() {
        let (priority, matched) = classify("Fluvial geomorphology", None, &keywords());
        assert_eq!(priority, Priority::Normal);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_title_only_matching_is_case_insensitive() {
        let (priority, _) = classify("GOVERNMENTALITY and the state", None, &keywords());
        assert_eq!(priority, Priority::High);
    }

    #[test]
    fn test_korean_terms_match() {
        let (priority, matched) =
            classify("푸코의 통치성 연구", Some("도시계획의 계보학"), &keywords());
        assert_eq!(priority, Priority::High);
        assert_eq!(matched, vec!["통치성"]);
    }

    #[test]
    fn test_idempotent() {
        let first = classify("assemblage urbanism", Some("text"), &keywords());
        let second = classify("assemblage urbanism", Some("text"), &keywords());
        assert_eq!(first, second);
    }
}
