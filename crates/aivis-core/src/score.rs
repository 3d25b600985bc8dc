use serde::{Deserialize, Serialize};

/// Market-crowding category derived from the number of distinct competitors
/// named across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicheSize {
    Micro,
    Niche,
    Broad,
}

impl NicheSize {
    /// `≤ 3` competitors is micro, `4..=10` niche, anything above broad.
    #[must_use]
    pub const fn for_competitor_count(count: usize) -> Self {
        match count {
            0..=3 => NicheSize::Micro,
            4..=10 => NicheSize::Niche,
            _ => NicheSize::Broad,
        }
    }

    /// Adjustment applied to share of voice. Visibility in a crowded market
    /// is worth more than dominating a thin one.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            NicheSize::Micro => 0.8,
            NicheSize::Niche => 1.0,
            NicheSize::Broad => 1.3,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NicheSize::Micro => "micro",
            NicheSize::Niche => "niche",
            NicheSize::Broad => "broad",
        }
    }
}

impl std::fmt::Display for NicheSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Letter grade over the 0–100 display score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 80.0 {
            Grade::A
        } else if percent >= 60.0 {
            Grade::B
        } else if percent >= 40.0 {
            Grade::C
        } else if percent >= 20.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Grade::A => "exceptional",
            Grade::B => "strong",
            Grade::C => "good",
            Grade::D => "fair",
            Grade::F => "weak",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// One weighted term of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub value: f64,
    pub weight: f64,
    /// `value × weight`, before the toughening curve.
    pub contribution: f64,
}

/// Final, auditable visibility score for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Curved composite in [0, 1].
    pub overall_score: f64,
    /// Weighted sum before the curve, in [0, 1].
    pub raw_score: f64,
    pub grade: Grade,
    pub mention_rate: f64,
    pub difficulty_weighted_mention: f64,
    pub mention_quality: f64,
    pub source_influence: f64,
    pub competitive_positioning: f64,
    pub consistency: f64,
    pub niche_size: NicheSize,
    pub analyzed_responses: usize,
    pub mentions_detected: usize,
    pub breakdown: Vec<ScoreComponent>,
    pub summary: String,
}

impl ScoreResult {
    /// Overall score on the 0–100 display scale.
    #[must_use]
    pub fn display_score(&self) -> f64 {
        self.overall_score * 100.0
    }
}
