use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Alert severity, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low = 1,
    Moderate = 2,
    High = 3,
    Extreme = 4,
}

/// Word stems that mark a free-text alert as severe
const SEVERE_STEMS: &[&str] = &[
    "exceptionnel",
    "exceptional",
    "violent",
    "extreme",
    "extrême",
    "severe",
    "sévère",
];

impl Severity {
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Low),
            2 => Some(Self::Moderate),
            3 => Some(Self::High),
            4 => Some(Self::Extreme),
            _ => None,
        }
    }

    /// One step up, saturating at `Extreme`
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate => Self::High,
            Self::High | Self::Extreme => Self::Extreme,
        }
    }

    /// Assess alerts that only come with text (provider alerts)
    pub fn from_description(text: &str) -> Self {
        if contains_severe_keyword(text) {
            Self::High
        } else {
            Self::Moderate
        }
    }
}

pub fn contains_severe_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| SEVERE_STEMS.iter().any(|stem| word.starts_with(stem)))
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}
