//! Lab test results as consumed for classification.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A recorded test result. Owned by the lab-test views; this crate only
/// classifies it against the reference ranges.
///
/// `value` is kept as received: the service records what was entered, which
/// may be a JSON number or a numeric string, and occasionally neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabTestResult {
    pub parameter: String,
    pub value: Value,
    pub unit: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

impl LabTestResult {
    pub fn new(parameter: &str, value: Value) -> Self {
        Self {
            parameter: parameter.to_string(),
            value,
            unit: String::new(),
            date: None,
        }
    }

    /// The numeric reading, if the recorded value is a number or a numeric
    /// string. Anything else is not coerced.
    pub fn numeric_value(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }
}
