//! Reference ranges and form-draft validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The `[normal_min, normal_max]` interval and unit for a named test
/// parameter. The server is the system of record; clients hold a page-local
/// cache and never mutate instances in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub id: i64,
    /// Unique lookup key for classification.
    pub parameter: String,
    pub normal_min: f64,
    pub normal_max: f64,
    pub units: String,
}

impl ReferenceRange {
    /// Build a range, enforcing the domain invariants: `parameter` and
    /// `units` non-empty, both bounds non-negative, `normal_min < normal_max`.
    pub fn new(
        id: i64,
        parameter: &str,
        normal_min: f64,
        normal_max: f64,
        units: &str,
    ) -> crate::Result<Self> {
        let parameter = parameter.trim();
        let units = units.trim();
        if parameter.is_empty() {
            return Err(crate::Error::InvalidRange("parameter is empty".into()));
        }
        if units.is_empty() {
            return Err(crate::Error::InvalidRange("units are empty".into()));
        }
        if normal_min < 0.0 || normal_max < 0.0 {
            return Err(crate::Error::InvalidRange(format!(
                "bounds must be non-negative: [{normal_min}, {normal_max}]"
            )));
        }
        if normal_min >= normal_max {
            return Err(crate::Error::InvalidRange(format!(
                "normal_min {normal_min} must be less than normal_max {normal_max}"
            )));
        }
        Ok(Self {
            id,
            parameter: parameter.to_string(),
            normal_min,
            normal_max,
            units: units.to_string(),
        })
    }

    /// Whether a value lies inside the closed interval. Boundary values are
    /// inside.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.normal_min && value <= self.normal_max
    }
}

/// Per-field validation errors, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Validated numeric payload for create/update requests.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RangePayload {
    pub parameter: String,
    pub normal_min: f64,
    pub normal_max: f64,
    pub units: String,
}

/// Form state for creating or editing a reference range. Numeric fields are
/// kept as entered text so invalid input survives a failed validation pass
/// for the user to correct.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeDraft {
    pub parameter: String,
    pub normal_min: String,
    pub normal_max: String,
    pub units: String,
}

impl RangeDraft {
    /// Load an existing range into the draft for editing.
    pub fn from_range(range: &ReferenceRange) -> Self {
        Self {
            parameter: range.parameter.clone(),
            normal_min: range.normal_min.to_string(),
            normal_max: range.normal_max.to_string(),
            units: range.units.clone(),
        }
    }

    /// Validate the draft. Returns the payload iff no field fails; any
    /// failure yields the full per-field error set and must abort submission
    /// before the network is touched.
    pub fn check(&self) -> std::result::Result<RangePayload, FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.parameter.trim().is_empty() {
            errors.insert("parameter", "parameter is required");
        }
        if self.units.trim().is_empty() {
            errors.insert("units", "units are required");
        }

        let min = parse_bound(&self.normal_min, "normal_min", &mut errors);
        let max = parse_bound(&self.normal_max, "normal_max", &mut errors);

        // The ordering violation attaches to normal_max.
        if let (Some(min), Some(max)) = (min, max) {
            if min >= max {
                errors.insert("normal_max", "normal_max must be greater than normal_min");
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(RangePayload {
            parameter: self.parameter.trim().to_string(),
            normal_min: min.unwrap_or_default(),
            normal_max: max.unwrap_or_default(),
            units: self.units.trim().to_string(),
        })
    }

    /// The error set alone, empty iff the draft is acceptable.
    pub fn validate(&self) -> FieldErrors {
        self.check().err().unwrap_or_default()
    }
}

fn parse_bound(raw: &str, field: &str, errors: &mut FieldErrors) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        Ok(_) => {
            errors.insert(field, format!("{field} must be a non-negative number"));
            None
        }
        Err(_) => {
            errors.insert(field, format!("{field} must be a number"));
            None
        }
    }
}
