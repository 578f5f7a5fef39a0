// src/grade.rs
//! Letter grades and the score thresholds that produce them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Ordinal buckets, `A` best through `E` worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub const ALL: [Grade; 5] = [Grade::A, Grade::B, Grade::C, Grade::D, Grade::E];

    /// Grade for `score` under the default thresholds.
    pub fn from_score(score: u8) -> Self {
        GradeThresholds::default().grade_for(score)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            other => Err(format!("unknown grade `{other}` (expected A..E)")),
        }
    }
}

// Same leniency as `FromStr`: "a", " B " and "C" all parse.
impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

pub const GRADE_A_MIN: u8 = 80;
pub const GRADE_B_MIN: u8 = 60;
pub const GRADE_C_MIN: u8 = 40;
pub const GRADE_D_MIN: u8 = 20;

/// Inclusive lower bounds, evaluated top-down. Anything below `d` is `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeThresholds {
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: GRADE_A_MIN,
            b: GRADE_B_MIN,
            c: GRADE_C_MIN,
            d: GRADE_D_MIN,
        }
    }
}

impl GradeThresholds {
    /// Bounds must be non-increasing from `a` to `d` and at most 100.
    pub fn validate(&self) -> Result<(), String> {
        let ordered = self.a <= 100 && self.a >= self.b && self.b >= self.c && self.c >= self.d;
        if ordered {
            Ok(())
        } else {
            Err(format!(
                "grade thresholds must satisfy 100 >= a >= b >= c >= d, got a={} b={} c={} d={}",
                self.a, self.b, self.c, self.d
            ))
        }
    }

    pub fn grade_for(&self, score: u8) -> Grade {
        if score >= self.a {
            Grade::A
        } else if score >= self.b {
            Grade::B
        } else if score >= self.c {
            Grade::C
        } else if score >= self.d {
            Grade::D
        } else {
            Grade::E
        }
    }
}
