use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Teacher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    /// Order in which tiers are filled during section selection.
    pub(crate) const TIERS: [DifficultyLevel; 3] =
        [DifficultyLevel::Easy, DifficultyLevel::Medium, DifficultyLevel::Hard];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "testmode", rename_all = "lowercase")]
pub(crate) enum TestMode {
    Bank,
    Pdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "examtype", rename_all = "lowercase")]
pub(crate) enum ExamType {
    Jee,
    Neet,
    Pcm,
    Pcb,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "distribution", rename_all = "snake_case")]
pub(crate) enum Distribution {
    SingleSet,
    FourSets,
}

impl Distribution {
    pub(crate) fn set_labels(self) -> &'static [SetLabel] {
        match self {
            Distribution::SingleSet => &[SetLabel::A],
            Distribution::FourSets => &[SetLabel::A, SetLabel::B, SetLabel::C, SetLabel::D],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "setlabel")]
pub(crate) enum SetLabel {
    A,
    B,
    C,
    D,
}

impl SetLabel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SetLabel::A => "A",
            SetLabel::B => "B",
            SetLabel::C => "C",
            SetLabel::D => "D",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attemptstatus", rename_all = "lowercase")]
pub(crate) enum AttemptStatus {
    Started,
    Completed,
}
