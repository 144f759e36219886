use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// School year of the lower-secondary KHTN curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Grade(u8);

impl Grade {
    pub(crate) fn new(value: u8) -> Option<Self> {
        (6..=9).contains(&value).then_some(Self(value))
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Grade::new)
            .ok_or_else(|| format!("grade must be one of 6, 7, 8, 9 (got {value:?})"))
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => u8::try_from(value)
                .ok()
                .and_then(Grade::new)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid grade {value}"))),
            Repr::Text(value) => value.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum AssignmentType {
    #[serde(rename = "trắc nghiệm")]
    MultipleChoice,
    #[serde(rename = "tự luận")]
    Essay,
    #[serde(rename = "trắc nghiệm & tự luận")]
    Hybrid,
    #[serde(rename = "thực hành/báo cáo")]
    Practical,
}

impl AssignmentType {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::MultipleChoice => "trắc nghiệm",
            Self::Essay => "tự luận",
            Self::Hybrid => "trắc nghiệm & tự luận",
            Self::Practical => "thực hành/báo cáo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum QuestionType {
    Mcq,
    Essay,
}

/// Cognitive level of a question, in increasing difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub(crate) enum QuestionLevel {
    #[serde(rename = "Biết")]
    Know,
    #[serde(rename = "Hiểu")]
    Understand,
    #[serde(rename = "Vận dụng")]
    Apply,
    #[serde(rename = "Vận dụng cao")]
    ApplyAdvanced,
}

impl QuestionLevel {
    pub(crate) const ALL: [QuestionLevel; 4] =
        [Self::Know, Self::Understand, Self::Apply, Self::ApplyAdvanced];

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Know => "Biết",
            Self::Understand => "Hiểu",
            Self::Apply => "Vận dụng",
            Self::ApplyAdvanced => "Vận dụng cao",
        }
    }

    pub(crate) fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == value.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SubmissionStatus {
    Pending,
    Graded,
    Error,
}

/// Why a grading round-trip ended in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FailureKind {
    ServiceUnavailable,
    SchemaViolation,
}

impl FailureKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUnavailable => "service_unavailable",
            Self::SchemaViolation => "schema_violation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum UserRole {
    Student,
    Teacher,
}
