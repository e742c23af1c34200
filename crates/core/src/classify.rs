//! Abnormality classification of test results against reference ranges.

use crate::range::ReferenceRange;
use crate::result::LabTestResult;
use serde::Serialize;
use std::fmt;

/// Classification verdict for a single test result.
///
/// `Unknown` covers both a parameter with no reference range and a
/// non-numeric recorded value. It is deliberately distinct from `Normal`: a
/// result outside all known parameters is not asserted normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Normal,
    Flagged,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Flagged => "flagged",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a result against the applicable reference range.
///
/// Lookup is by exact `parameter` match. `Flagged` iff the value falls
/// strictly outside `[normal_min, normal_max]`; boundary values are `Normal`.
pub fn classify(result: &LabTestResult, ranges: &[ReferenceRange]) -> Verdict {
    let range = match ranges.iter().find(|r| r.parameter == result.parameter) {
        Some(range) => range,
        None => return Verdict::Unknown,
    };
    match result.numeric_value() {
        Some(value) if range.contains(value) => Verdict::Normal,
        Some(_) => Verdict::Flagged,
        None => Verdict::Unknown,
    }
}
