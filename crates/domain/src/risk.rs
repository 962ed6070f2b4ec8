// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Risk matrix evaluation.
//!
//! A single canonical 5×5 matrix is used everywhere a risk level is derived:
//! the product of likelihood and severity is banded into four levels.
//!
//! | Product | Level    |
//! |---------|----------|
//! | 1–6     | Low      |
//! | 7–12    | Medium   |
//! | 13–20   | High     |
//! | 21–25   | Critical |

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lowest permitted likelihood or severity score.
pub const MIN_SCORE: u8 = 1;
/// Highest permitted likelihood or severity score.
pub const MAX_SCORE: u8 = 5;

macro_rules! score_type {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub struct $name(u8);

        impl $name {
            /// Creates a score, rejecting values outside 1..=5.
            ///
            /// # Errors
            ///
            /// Returns `DomainError::ScoreOutOfRange` if the value is out of range.
            pub const fn new(value: u8) -> Result<Self, DomainError> {
                if value < MIN_SCORE || value > MAX_SCORE {
                    return Err(DomainError::ScoreOutOfRange {
                        field: $field,
                        value,
                    });
                }
                Ok(Self(value))
            }

            /// Creates a score, clamping the value into 1..=5.
            ///
            /// Used when reading stored values back.
            #[must_use]
            pub fn clamped(value: i64) -> Self {
                let clamped: i64 = value.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE));
                Self(u8::try_from(clamped).unwrap_or(MIN_SCORE))
            }

            /// Returns the score value.
            #[must_use]
            pub const fn value(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = DomainError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u8 {
            fn from(score: $name) -> Self {
                score.0
            }
        }
    };
}

score_type!(
    /// How likely a hazard is to cause harm (1 = rare, 5 = almost certain).
    Likelihood,
    "likelihood"
);

score_type!(
    /// How severe the harm would be (1 = negligible, 5 = catastrophic).
    Severity,
    "severity"
);

/// Risk level derived from the risk matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Returns the string representation used for persistence and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "Critical" => Ok(Self::Critical),
            _ => Err(DomainError::InvalidRiskLevel(s.to_string())),
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a likelihood and severity pair onto a risk level.
///
/// Total over the 5×5 domain and non-decreasing in each argument.
#[must_use]
pub const fn evaluate_risk(likelihood: Likelihood, severity: Severity) -> RiskLevel {
    match likelihood.value() * severity.value() {
        0..=6 => RiskLevel::Low,
        7..=12 => RiskLevel::Medium,
        13..=20 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

/// A likelihood/severity pair.
///
/// The level is always computed from the pair and never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskRating {
    pub likelihood: Likelihood,
    pub severity: Severity,
}

impl RiskRating {
    /// Creates a rating from raw scores.
    ///
    /// # Errors
    ///
    /// Returns an error if either score is outside 1..=5.
    pub fn new(likelihood: u8, severity: u8) -> Result<Self, DomainError> {
        Ok(Self {
            likelihood: Likelihood::new(likelihood)?,
            severity: Severity::new(severity)?,
        })
    }

    /// Creates a rating from stored values, clamping both scores.
    #[must_use]
    pub fn clamped(likelihood: i64, severity: i64) -> Self {
        Self {
            likelihood: Likelihood::clamped(likelihood),
            severity: Severity::clamped(severity),
        }
    }

    /// The product of likelihood and severity.
    #[must_use]
    pub const fn score(&self) -> u8 {
        self.likelihood.value() * self.severity.value()
    }

    /// The risk level from the canonical matrix.
    #[must_use]
    pub const fn level(&self) -> RiskLevel {
        evaluate_risk(self.likelihood, self.severity)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn rate(l: u8, s: u8) -> RiskLevel {
        RiskRating::new(l, s).unwrap().level()
    }

    #[test]
    fn test_matrix_is_total_over_domain() {
        for l in MIN_SCORE..=MAX_SCORE {
            for s in MIN_SCORE..=MAX_SCORE {
                assert!(RiskRating::new(l, s).is_ok(), "({l},{s}) must be accepted");
            }
        }
    }

    #[test]
    fn test_matrix_is_monotonic_in_likelihood() {
        for s in MIN_SCORE..=MAX_SCORE {
            for l in MIN_SCORE..MAX_SCORE {
                assert!(rate(l, s) <= rate(l + 1, s), "likelihood {l}->{} at severity {s}", l + 1);
            }
        }
    }

    #[test]
    fn test_matrix_is_monotonic_in_severity() {
        for l in MIN_SCORE..=MAX_SCORE {
            for s in MIN_SCORE..MAX_SCORE {
                assert!(rate(l, s) <= rate(l, s + 1), "severity {s}->{} at likelihood {l}", s + 1);
            }
        }
    }

    #[test]
    fn test_matrix_is_deterministic() {
        for l in MIN_SCORE..=MAX_SCORE {
            for s in MIN_SCORE..=MAX_SCORE {
                assert_eq!(rate(l, s), rate(l, s));
            }
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(rate(1, 1), RiskLevel::Low);
        assert_eq!(rate(2, 3), RiskLevel::Low);
        assert_eq!(rate(1, 5), RiskLevel::Low);
        assert_eq!(rate(3, 2), RiskLevel::Low);
        assert_eq!(rate(3, 4), RiskLevel::Medium);
        assert_eq!(rate(2, 4), RiskLevel::Medium);
        assert_eq!(rate(4, 4), RiskLevel::High);
        assert_eq!(rate(4, 5), RiskLevel::High);
        assert_eq!(rate(5, 5), RiskLevel::Critical);
    }

    #[test]
    fn test_out_of_range_scores_are_rejected() {
        assert!(matches!(
            Likelihood::new(0),
            Err(DomainError::ScoreOutOfRange {
                field: "likelihood",
                value: 0
            })
        ));
        assert!(matches!(
            Severity::new(6),
            Err(DomainError::ScoreOutOfRange {
                field: "severity",
                value: 6
            })
        ));
    }

    #[test]
    fn test_rating_reports_the_first_out_of_range_score() {
        assert_eq!(
            RiskRating::new(6, 0),
            Err(DomainError::ScoreOutOfRange {
                field: "likelihood",
                value: 6
            })
        );
        assert_eq!(
            RiskRating::new(2, 0),
            Err(DomainError::ScoreOutOfRange {
                field: "severity",
                value: 0
            })
        );
        assert_eq!(RiskRating::new(2, 3).map(|r| r.score()), Ok(6));
    }

    #[test]
    fn test_stored_scores_are_clamped() {
        let rating: RiskRating = RiskRating::clamped(-3, 99);
        assert_eq!(rating.likelihood.value(), 1);
        assert_eq!(rating.severity.value(), 5);
    }

    #[test]
    fn test_score_deserialization_validates_range() {
        let ok: Likelihood = serde_json::from_str("3").unwrap();
        assert_eq!(ok.value(), 3);
        assert!(serde_json::from_str::<Likelihood>("9").is_err());
    }

    #[test]
    fn test_risk_level_string_round_trip() {
        for level in RiskLevel::ALL {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
        assert!("Extreme".parse::<RiskLevel>().is_err());
    }
}
