//! Argument extraction from the model's JSON.
//!
//! Models are loose with types: numbers arrive as `250`, `250.0` or `"250"`,
//! and absent arguments as missing keys or `null`.  These helpers accept all
//! of those and turn anything else into a validation error naming the field.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::outcome::ToolError;
use crate::subsystems::storage::DATE_FORMAT;

pub struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    /// `args` must be a JSON object or `null`.
    pub fn new(args: &'a Value) -> Result<Self, ToolError> {
        match args {
            Value::Object(map) => Ok(Self { map: Some(map) }),
            Value::Null => Ok(Self { map: None }),
            other => Err(ToolError::Validation(format!("arguments must be an object, got {other}"))),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    /// The untyped value, `None` when absent or null.
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.get(key)
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string()).filter(|s| !s.is_empty())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(ToolError::Validation(format!("'{key}' must be a string, got {other}"))),
        }
    }

    pub fn str(&self, key: &str) -> Result<String, ToolError> {
        self.opt_str(key)?
            .ok_or_else(|| ToolError::Validation(format!("missing required argument '{key}'")))
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, ToolError> {
        let value = match self.get(key) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
            Some(Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(ToolError::Validation(format!("'{key}' must be a number"))),
        }
    }

    /// Optional non-negative number.
    pub fn opt_amount(&self, key: &str) -> Result<Option<f64>, ToolError> {
        match self.opt_f64(key)? {
            Some(v) if v < 0.0 => Err(ToolError::Validation(format!("'{key}' must not be negative"))),
            other => Ok(other),
        }
    }

    pub fn required_amount(&self, key: &str) -> Result<f64, ToolError> {
        self.opt_amount(key)?
            .ok_or_else(|| ToolError::Validation(format!("missing required argument '{key}'")))
    }

    /// Non-negative number, zero when absent.
    pub fn amount(&self, key: &str) -> Result<f64, ToolError> {
        Ok(self.opt_amount(key)?.unwrap_or(0.0))
    }

    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>, ToolError> {
        match self.opt_f64(key)? {
            None => Ok(None),
            Some(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
            Some(_) => Err(ToolError::Validation(format!("'{key}' must be a whole number"))),
        }
    }

    /// Whole number in `min..=max`, `default` when absent.
    pub fn days(&self, key: &str, default: i64, max: i64) -> Result<i64, ToolError> {
        match self.opt_i64(key)? {
            None => Ok(default),
            Some(v) if (1..=max).contains(&v) => Ok(v),
            Some(v) => Err(ToolError::Validation(format!("'{key}' must be between 1 and {max}, got {v}"))),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool, ToolError> {
        match self.get(key) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" | "" => Ok(false),
                _ => Err(ToolError::Validation(format!("'{key}' must be true or false"))),
            },
            Some(_) => Err(ToolError::Validation(format!("'{key}' must be true or false"))),
        }
    }

    /// Parse an enumeration argument.
    pub fn opt_enum<T>(&self, key: &str) -> Result<Option<T>, ToolError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.opt_str(key)?
            .map(|s| s.parse::<T>().map_err(|e| ToolError::Validation(e.to_string())))
            .transpose()
    }

    /// `YYYY-MM-DD`, validated and normalised.
    pub fn opt_date(&self, key: &str) -> Result<Option<String>, ToolError> {
        self.opt_str(key)?.map(|s| parse_date(key, &s)).transpose()
    }

    pub fn array(&self, key: &str) -> Result<&'a Vec<Value>, ToolError> {
        match self.get(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ToolError::Validation(format!("'{key}' must be an array"))),
            None => Err(ToolError::Validation(format!("missing required argument '{key}'"))),
        }
    }
}

pub fn parse_date(key: &str, value: &str) -> Result<String, ToolError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string())
        .map_err(|_| ToolError::Validation(format!("'{key}' must be a date in YYYY-MM-DD format, got '{value}'")))
}
