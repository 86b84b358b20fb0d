//! Required-field collection for request bodies.

use crate::error::{DeliveryError, DeliveryResult};
use serde_json::{Number, Value};

/// Collects the names of absent fields so a request is rejected once,
/// naming everything that is missing.
#[derive(Debug, Default)]
pub struct RequiredFields {
    missing: Vec<&'static str>,
}

impl RequiredFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a text field. Absent and blank values count as missing.
    pub fn text(&mut self, name: &'static str, value: Option<String>) -> String {
        match value {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                self.missing.push(name);
                String::new()
            }
        }
    }

    /// Take any present value. `null`, `""` and `[]` count as missing.
    pub fn value(&mut self, name: &'static str, value: Option<Value>) -> Value {
        match value {
            Some(Value::Null) | None => {
                self.missing.push(name);
                Value::Null
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.missing.push(name);
                Value::Null
            }
            Some(Value::Array(items)) if items.is_empty() => {
                self.missing.push(name);
                Value::Null
            }
            Some(other) => other,
        }
    }

    /// Take a number as sent, integer or not
    pub fn number(&mut self, name: &'static str, value: Option<Number>) -> Number {
        value.unwrap_or_else(|| {
            self.missing.push(name);
            Number::from(0)
        })
    }

    /// Fail with a validation error naming every missing field
    pub fn check(self) -> DeliveryResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError::missing_fields(&self.missing))
        }
    }
}
