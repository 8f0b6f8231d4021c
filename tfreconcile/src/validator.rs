use crate::types::{AttributePath, Diagnostics};
use crate::value::Value;

/// Validates one attribute value. Null and unknown values are never passed in;
/// presence is checked by the schema.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics);
}

/// Allowed-value enumeration for string attributes
pub struct OneOf {
    pub allowed: Vec<String>,
}

impl OneOf {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for OneOf {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.add_attribute_error(
                    path,
                    format!("must be one of: {}", self.allowed.join(", ")),
                    Some(format!("Got '{}'", s)),
                );
            }
        }
    }
}

pub struct StringLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLength {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must have minimum length of {}", min),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must have maximum length of {}", max),
                        Some(format!("Got length {}", len)),
                    );
                }
            }
        }
    }
}

pub struct StringPattern {
    pattern: Result<regex::Regex, regex::Error>,
    description: String,
}

impl StringPattern {
    /// A pattern that fails to compile is reported as a validation error
    pub fn new(pattern: &str, description: impl Into<String>) -> Self {
        Self {
            pattern: regex::Regex::new(pattern),
            description: description.into(),
        }
    }
}

impl Validator for StringPattern {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        let pattern = match &self.pattern {
            Ok(pattern) => pattern,
            Err(e) => {
                diagnostics.add_attribute_error(
                    path,
                    format!("invalid pattern for {}", self.description),
                    Some(e.to_string()),
                );
                return;
            }
        };
        if let Some(s) = value.as_str() {
            if !pattern.is_match(s) {
                diagnostics.add_attribute_error(
                    path,
                    format!("must match {}", self.description),
                    Some(format!("Value '{}' does not match pattern", s)),
                );
            }
        }
    }
}

pub struct IntRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl IntRange {
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

impl Validator for IntRange {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(n) = value.as_int() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must be at least {}", min),
                        Some(format!("Got {}", n)),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must be at most {}", max),
                        Some(format!("Got {}", n)),
                    );
                }
            }
        }
    }
}

pub struct ListLength {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLength {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(items) = value.as_list() {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must have at least {} items", min),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.add_attribute_error(
                        path,
                        format!("must have at most {} items", max),
                        Some(format!("Got {} items", items.len())),
                    );
                }
            }
        }
    }
}

/// String must parse as a JSON object
pub struct JsonObject;

impl Validator for JsonObject {
    fn validate(&self, value: &Value, path: &AttributePath, diagnostics: &mut Diagnostics) {
        if let Some(s) = value.as_str() {
            match serde_json::from_str::<serde_json::Value>(s) {
                Ok(serde_json::Value::Object(_)) => {}
                Ok(_) => diagnostics.add_attribute_error(
                    path,
                    "must be a JSON object",
                    None::<String>,
                ),
                Err(e) => diagnostics.add_attribute_error(
                    path,
                    "must be valid JSON",
                    Some(e.to_string()),
                ),
            }
        }
    }
}
