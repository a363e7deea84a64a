// Moderation domain models - the verdict produced by the classifier.
//
// These are pure domain types with no storage dependencies.
// The console layer converts them into user-facing notices.

use serde::{Deserialize, Serialize};

/// Kind of harmful content a message can contain.
///
/// Declaration order is the reporting priority: `FilterResult::categories`
/// always lists categories in this order, regardless of where in the text
/// they were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmCategory {
    SelfHarm,
    Violence,
    HateSpeech,
    Harassment,
    SexualContent,
    Profanity,
    Spam,
}

#[cfg(test)]
impl HarmCategory {
    /// Every category, in priority order.
    pub const ALL: [HarmCategory; 7] = [
        HarmCategory::SelfHarm,
        HarmCategory::Violence,
        HarmCategory::HateSpeech,
        HarmCategory::Harassment,
        HarmCategory::SexualContent,
        HarmCategory::Profanity,
        HarmCategory::Spam,
    ];
}

impl std::fmt::Display for HarmCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarmCategory::SelfHarm => write!(f, "self-harm"),
            HarmCategory::Violence => write!(f, "violence"),
            HarmCategory::HateSpeech => write!(f, "hate speech"),
            HarmCategory::Harassment => write!(f, "harassment"),
            HarmCategory::SexualContent => write!(f, "sexual content"),
            HarmCategory::Profanity => write!(f, "profanity"),
            HarmCategory::Spam => write!(f, "spam"),
        }
    }
}

/// How severe a harmful verdict is. Only meaningful when `is_harmful` is true.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Result of classifying a piece of text. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub is_harmful: bool,
    /// Triggered categories in priority order, no duplicates. Empty iff not harmful.
    pub categories: Vec<HarmCategory>,
    pub severity: Severity,
}

impl FilterResult {
    /// A "nothing found" verdict.
    pub fn clean() -> Self {
        Self {
            is_harmful: false,
            categories: Vec::new(),
            severity: Severity::Low,
        }
    }

    /// A harmful verdict. Categories are sorted into priority order and deduplicated.
    pub fn harmful(mut categories: Vec<HarmCategory>, severity: Severity) -> Self {
        categories.sort();
        categories.dedup();
        if categories.is_empty() {
            return Self::clean();
        }
        Self {
            is_harmful: true,
            categories,
            severity,
        }
    }

    /// Categories joined for display, e.g. "violence, harassment".
    pub fn describe_categories(&self, separator: &str) -> String {
        self.categories
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Default for FilterResult {
    fn default() -> Self {
        Self::clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmful_sorts_and_dedups_categories() {
        let result = FilterResult::harmful(
            vec![
                HarmCategory::Profanity,
                HarmCategory::Violence,
                HarmCategory::Profanity,
            ],
            Severity::Medium,
        );

        assert!(result.is_harmful);
        assert_eq!(
            result.categories,
            vec![HarmCategory::Violence, HarmCategory::Profanity]
        );
    }

    #[test]
    fn test_harmful_without_categories_is_clean() {
        let result = FilterResult::harmful(Vec::new(), Severity::High);
        assert_eq!(result, FilterResult::clean());
    }

    #[test]
    fn test_filter_result_json_shape() {
        let result = FilterResult::harmful(vec![HarmCategory::SelfHarm], Severity::High);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["isHarmful"], true);
        assert_eq!(json["categories"][0], "self_harm");
        assert_eq!(json["severity"], "high");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }
}
