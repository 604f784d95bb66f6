//! Answer predicates for guessing rounds.

use crate::models::guess::MatchMode;

/// Default minimum similarity accepted in [`MatchMode::Lenient`].
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Case-insensitive Jaro-Winkler similarity of two strings.
#[must_use]
pub fn similarity(left: &str, right: &str) -> f64 {
    strsim::jaro_winkler(&left.to_lowercase(), &right.to_lowercase())
}

/// Decides whether a chat message answers the current round.
#[derive(Debug, Clone)]
pub struct AnswerMatcher {
    mode: MatchMode,
    threshold: f64,
    answers: Vec<String>,
    /// Lower-cased copies of `answers`, precomputed for lenient matching.
    folded: Vec<String>,
}

impl AnswerMatcher {
    /// Build a matcher over the accepted answers.
    #[must_use]
    pub fn new(answers: Vec<String>, mode: MatchMode, threshold: f64) -> Self {
        let folded = answers.iter().map(|a| a.to_lowercase()).collect();
        Self {
            mode,
            threshold,
            answers,
            folded,
        }
    }

    /// Match mode this matcher applies.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Accepted answers, in the order given.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    /// Highest case-insensitive Jaro-Winkler similarity between `content`
    /// and any answer. Zero when there are no answers.
    #[must_use]
    pub fn best_similarity(&self, content: &str) -> f64 {
        let content = content.to_lowercase();
        self.folded
            .iter()
            .map(|answer| strsim::jaro_winkler(&content, answer))
            .fold(0.0, f64::max)
    }

    /// Whether `content` answers the round.
    #[must_use]
    pub fn matches(&self, content: &str) -> bool {
        match self.mode {
            MatchMode::Strict => self.answers.iter().any(|answer| answer == content),
            MatchMode::Lenient => self.best_similarity(content) >= self.threshold,
        }
    }
}
