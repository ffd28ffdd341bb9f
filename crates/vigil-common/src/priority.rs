//! Priority tiers derived from keyword matching.

use serde::{Deserialize, Serialize};

/// How interesting an article is, driving which articles get translated.
/// Ordering matters only for display; `High` always wins during
/// classification regardless of how many medium-tier terms also match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Normal,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Normal => "normal",
        }
    }

    /// Unknown strings fall back to `Normal` rather than failing; the
    /// column default in old databases was free text.
    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Normal,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for p in [Priority::High, Priority::Medium, Priority::Normal] {
            assert_eq!(Priority::parse(p.as_str()), p);
        }
    }

    #[test]
    fn test_unknown_is_normal() {
        assert_eq!(Priority::parse("urgent"), Priority::Normal);
        assert_eq!(Priority::parse(""), Priority::Normal);
    }
}
