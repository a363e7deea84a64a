// Harmful-content classifier - core business logic for message filtering.
//
// This classifier is deliberately simple and explainable:
// - A fixed lexicon of weighted phrases per category
// - Per-category match threshold
// - Severity bucketed from the strongest triggered category
//
// NO I/O here - classification is a pure function of the text.

use super::moderation_models::{FilterResult, HarmCategory, Severity};

/// A score at or above this is at least `Severity::Medium`.
const MEDIUM_CUTOFF: u32 = 3;
/// A score at or above this is `Severity::High`.
const HIGH_CUTOFF: u32 = 6;

/// Lexicon entry for one category.
struct CategoryRule {
    category: HarmCategory,
    /// Minimum number of pattern occurrences before the category triggers.
    min_matches: u32,
    /// (phrase, weight) pairs. Phrases are matched on whole tokens.
    patterns: &'static [(&'static str, u32)],
}

// Rules are listed in the same order as `HarmCategory` declares its priority.
const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: HarmCategory::SelfHarm,
        min_matches: 1,
        patterns: &[
            ("kill yourself", 5),
            ("kys", 5),
            ("end your life", 5),
            ("hurt yourself", 4),
            ("cut yourself", 4),
            ("self harm", 4),
            ("suicide", 3),
            ("want to die", 3),
        ],
    },
    CategoryRule {
        category: HarmCategory::Violence,
        min_matches: 1,
        patterns: &[
            ("hurt", 2),
            ("kill", 3),
            ("murder", 3),
            ("stab", 3),
            ("shoot", 3),
            ("bomb", 3),
            ("beat you up", 3),
            ("punch", 2),
            ("attack", 2),
            ("destroy you", 2),
            ("weapon", 1),
        ],
    },
    CategoryRule {
        category: HarmCategory::HateSpeech,
        min_matches: 1,
        patterns: &[
            ("subhuman", 4),
            ("inferior race", 4),
            ("go back to your country", 4),
            ("vermin", 3),
            ("your kind", 2),
        ],
    },
    CategoryRule {
        category: HarmCategory::Harassment,
        min_matches: 1,
        patterns: &[
            ("nobody likes you", 3),
            ("worthless", 2),
            ("hate you", 2),
            ("idiot", 1),
            ("stupid", 1),
            ("loser", 1),
            ("moron", 1),
            ("pathetic", 1),
            ("dumb", 1),
            ("ugly", 1),
            ("shut up", 1),
        ],
    },
    CategoryRule {
        category: HarmCategory::SexualContent,
        min_matches: 1,
        patterns: &[
            ("nudes", 3),
            ("send pics", 3),
            ("porn", 3),
            ("nude", 2),
            ("sexy", 1),
            ("explicit", 1),
        ],
    },
    CategoryRule {
        category: HarmCategory::Profanity,
        min_matches: 1,
        patterns: &[
            ("fuck", 3),
            ("shit", 2),
            ("bastard", 2),
            ("asshole", 2),
            ("damn", 1),
            ("crap", 1),
            ("wtf", 1),
        ],
    },
    CategoryRule {
        category: HarmCategory::Spam,
        min_matches: 2,
        patterns: &[
            ("click here", 2),
            ("free money", 2),
            ("buy now", 1),
            ("limited offer", 1),
            ("winner", 1),
            ("subscribe", 1),
            ("http", 1),
            ("https", 1),
            ("www", 1),
        ],
    },
];

/// How one category scored against a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScore {
    pub category: HarmCategory,
    /// Total pattern occurrences.
    pub matches: u32,
    /// Sum of occurrence * weight.
    pub score: u32,
    /// Whether `matches` reached the category threshold.
    pub triggered: bool,
}

struct CompiledPattern {
    tokens: Vec<String>,
    weight: u32,
}

struct CompiledRule {
    category: HarmCategory,
    min_matches: u32,
    patterns: Vec<CompiledPattern>,
}

/// Rule-based classifier over a fixed lexicon.
///
/// Deterministic and total: every input yields a `FilterResult`, and the
/// same text always yields the same result.
pub struct MessageClassifier {
    rules: Vec<CompiledRule>,
}

impl MessageClassifier {
    /// Build the classifier with the built-in lexicon.
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .map(|rule| CompiledRule {
                category: rule.category,
                min_matches: rule.min_matches,
                patterns: rule
                    .patterns
                    .iter()
                    .map(|(phrase, weight)| CompiledPattern {
                        tokens: tokenize(phrase),
                        weight: *weight,
                    })
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Classify a message.
    pub fn classify(&self, text: &str) -> FilterResult {
        let scores = self.score(text);

        let triggered: Vec<&CategoryScore> = scores.iter().filter(|s| s.triggered).collect();
        if triggered.is_empty() {
            return FilterResult::clean();
        }

        let max_score = triggered.iter().map(|s| s.score).max().unwrap_or(0);
        FilterResult::harmful(
            triggered.iter().map(|s| s.category).collect(),
            severity_for_score(max_score),
        )
    }

    /// Per-category breakdown, in priority order. Used to explain a verdict.
    pub fn score(&self, text: &str) -> Vec<CategoryScore> {
        let tokens = tokenize(text);

        let mut scores: Vec<CategoryScore> = self
            .rules
            .iter()
            .map(|rule| {
                let mut matches = 0u32;
                let mut score = 0u32;
                for pattern in &rule.patterns {
                    let hits = count_occurrences(&tokens, &pattern.tokens);
                    matches = matches.saturating_add(hits);
                    score = score.saturating_add(hits.saturating_mul(pattern.weight));
                }
                CategoryScore {
                    category: rule.category,
                    matches,
                    score,
                    triggered: matches > 0 && matches >= rule.min_matches,
                }
            })
            .collect();

        // Output order must not depend on lexicon order.
        scores.sort_by_key(|s| s.category);
        scores
    }
}

impl Default for MessageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket a score. A score sitting exactly on a cutoff takes the higher bucket.
fn severity_for_score(score: u32) -> Severity {
    if score >= HIGH_CUTOFF {
        Severity::High
    } else if score >= MEDIUM_CUTOFF {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Lowercase, drop apostrophes ("don't" -> "dont"), split on anything that
/// isn't alphanumeric.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count positions where `needle` appears as a contiguous run of tokens.
fn count_occurrences(haystack: &[String], needle: &[String]) -> u32 {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count() as u32
}

// ============================================================================
// TESTS
// ============================================================================
