//! Retention policy configuration.

use std::fmt;
use std::str::FromStr;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Monthly tier of the retention curve.
///
/// `Unlimited` keeps one snapshot per calendar month back to the floor date
/// (2007-01-01); `Count(n)` caps the tier at `n` month boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthlyRetention {
    Count(u32),
    Unlimited,
}

impl MonthlyRetention {
    /// True once `added` boundaries satisfy the tier.
    pub fn is_exhausted(self, added: u32) -> bool {
        match self {
            MonthlyRetention::Count(limit) => added >= limit,
            MonthlyRetention::Unlimited => false,
        }
    }
}

impl fmt::Display for MonthlyRetention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthlyRetention::Count(n) => write!(f, "{n}"),
            MonthlyRetention::Unlimited => write!(f, "unlimited"),
        }
    }
}

impl FromStr for MonthlyRetention {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unlimited" | "true" => Ok(MonthlyRetention::Unlimited),
            "false" => Ok(MonthlyRetention::Count(0)),
            _ => value
                .parse::<u32>()
                .map(MonthlyRetention::Count)
                .map_err(|_| format!("invalid monthly retention: {value}")),
        }
    }
}

// The config file accepts either a count or a boolean, where `true` means
// unlimited and `false` means none.
impl<'de> Deserialize<'de> for MonthlyRetention {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Count(u32),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(MonthlyRetention::Unlimited),
            Raw::Flag(false) => Ok(MonthlyRetention::Count(0)),
            Raw::Count(n) => Ok(MonthlyRetention::Count(n)),
        }
    }
}

impl Serialize for MonthlyRetention {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MonthlyRetention::Count(n) => serializer.serialize_u32(*n),
            MonthlyRetention::Unlimited => serializer.serialize_bool(true),
        }
    }
}

/// Per-tier snapshot counts for the grandfather-father-son schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub hourly: u32,
    pub daily: u32,
    pub weekly: u32,
    pub monthly: MonthlyRetention,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            hourly: 0,
            daily: 7,
            weekly: 4,
            monthly: MonthlyRetention::Unlimited,
        }
    }
}
