//! Driver state categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Driver vigilance state, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum DriverState {
    #[default]
    Lucid,
    Drowsy,
    Asleep,
}

impl DriverState {
    /// Numeric severity (0 = Lucid, 2 = Asleep)
    pub fn severity(&self) -> u8 {
        match self {
            Self::Lucid => 0,
            Self::Drowsy => 1,
            Self::Asleep => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lucid => "Lucid",
            Self::Drowsy => "Drowsy",
            Self::Asleep => "Asleep",
        }
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust annotation on a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StateConfidence {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "LOW")]
    Low,
}

impl fmt::Display for StateConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Low => "LOW",
        })
    }
}
