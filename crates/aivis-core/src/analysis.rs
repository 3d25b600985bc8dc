use serde::{Deserialize, Serialize};

use crate::labels::normalize_label;
use crate::CoreError;

/// How prominently the target appears in an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentionPosition {
    Primary,
    Secondary,
    Passing,
    #[default]
    None,
}

impl MentionPosition {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MentionPosition::Primary => "primary",
            MentionPosition::Secondary => "secondary",
            MentionPosition::Passing => "passing",
            MentionPosition::None => "none",
        }
    }
}

impl std::fmt::Display for MentionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MentionPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "primary" => Ok(MentionPosition::Primary),
            "secondary" => Ok(MentionPosition::Secondary),
            "passing" | "in_passing" => Ok(MentionPosition::Passing),
            "none" | "absent" | "not_mentioned" => Ok(MentionPosition::None),
            _ => Err(CoreError::UnknownLabel {
                kind: "mention position",
                value: s.to_string(),
            }),
        }
    }
}

/// Five-level sentiment toward the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryPositive,
    Positive,
    #[default]
    Neutral,
    Negative,
    VeryNegative,
}

impl Sentiment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Sentiment::VeryPositive => "very_positive",
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::VeryNegative => "very_negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "very_positive" => Ok(Sentiment::VeryPositive),
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            "very_negative" => Ok(Sentiment::VeryNegative),
            _ => Err(CoreError::UnknownLabel {
                kind: "sentiment",
                value: s.to_string(),
            }),
        }
    }
}

/// Ownership class of a cited source relative to the target company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationBucket {
    Owned,
    Operated,
    Earned,
    Competitor,
}

impl CitationBucket {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CitationBucket::Owned => "owned",
            CitationBucket::Operated => "operated",
            CitationBucket::Earned => "earned",
            CitationBucket::Competitor => "competitor",
        }
    }

    /// `true` for sources the company controls.
    #[must_use]
    pub const fn is_first_party(self) -> bool {
        matches!(self, CitationBucket::Owned | CitationBucket::Operated)
    }
}

impl std::fmt::Display for CitationBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CitationBucket {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "owned" => Ok(CitationBucket::Owned),
            "operated" => Ok(CitationBucket::Operated),
            "earned" => Ok(CitationBucket::Earned),
            "competitor" => Ok(CitationBucket::Competitor),
            _ => Err(CoreError::UnknownLabel {
                kind: "citation bucket",
                value: s.to_string(),
            }),
        }
    }
}

/// Judgment of whether and how the target is mentioned in one response.
///
/// `Default` is the conservative fallback used whenever a judgment cannot be
/// obtained: not mentioned, neutral, zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MentionAnalysis {
    pub mention_detected: bool,
    pub position: MentionPosition,
    pub sentiment: Sentiment,
    /// Judge confidence in [0, 1].
    pub confidence: f64,
    /// Short excerpt around the mention.
    pub context: String,
}

/// Ownership classification of one citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationClassification {
    pub url: String,
    pub domain: String,
    pub bucket: CitationBucket,
    /// Influence in [0, 1].
    pub influence_score: f64,
}
