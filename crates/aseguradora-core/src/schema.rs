//! Write-time schema for policy records
//!
//! Request bodies arrive as [`PolicyInput`], which keeps every field as raw
//! JSON so that absent, `null`, wrongly-typed and valid values can be told
//! apart. Validation turns the input into either a [`NewPolicy`] (create) or
//! a [`PolicyPatch`] (update) and reports every offending field at once.

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::Value;
use std::fmt;

use crate::types::{InsuranceType, NewPolicy, PolicyPatch};

pub const POLICY_NUMBER: &str = "policyNumber";
pub const INSURANCE_TYPE: &str = "insuranceType";
pub const POLICY_HOLDER: &str = "policyHolder";
pub const INSURED_AMOUNT: &str = "insuredAmount";

/// Raw policy fields as received in a request body.
///
/// `None` means the key was absent; `Some(Value::Null)` means it was sent as
/// an explicit `null`. Keys outside the schema are dropped. Only a JSON
/// object deserializes; arrays and scalars are rejected.
#[derive(Debug, Clone, Default)]
pub struct PolicyInput {
    pub policy_number: Option<Value>,
    pub insurance_type: Option<Value>,
    pub policy_holder: Option<Value>,
    pub insured_amount: Option<Value>,
}

impl<'de> Deserialize<'de> for PolicyInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PolicyInputVisitor)
    }
}

struct PolicyInputVisitor;

impl<'de> Visitor<'de> for PolicyInputVisitor {
    type Value = PolicyInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object with policy fields")
    }

    fn visit_map<A>(self, mut map: A) -> Result<PolicyInput, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut input = PolicyInput::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                POLICY_NUMBER => &mut input.policy_number,
                INSURANCE_TYPE => &mut input.insurance_type,
                POLICY_HOLDER => &mut input.policy_holder,
                INSURED_AMOUNT => &mut input.insured_amount,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            *slot = Some(map.next_value::<Value>()?);
        }
        Ok(input)
    }
}

impl PolicyInput {
    /// Validate a create request: all four fields must be present and valid
    pub fn into_new_policy(self) -> Result<NewPolicy, ValidationError> {
        let mut errors = Vec::new();

        let policy_number = collect(&mut errors, text(POLICY_NUMBER, self.policy_number.as_ref()));
        let insurance_type = collect(&mut errors, insurance_type(self.insurance_type.as_ref()));
        let policy_holder = collect(&mut errors, text(POLICY_HOLDER, self.policy_holder.as_ref()));
        let insured_amount = collect(&mut errors, amount(self.insured_amount.as_ref()));

        match (policy_number, insurance_type, policy_holder, insured_amount) {
            (Some(policy_number), Some(insurance_type), Some(policy_holder), Some(insured_amount))
                if errors.is_empty() =>
            {
                Ok(NewPolicy {
                    policy_number,
                    insurance_type,
                    policy_holder,
                    insured_amount,
                })
            }
            _ => Err(ValidationError::new(errors)),
        }
    }

    /// Validate an update request: only the supplied fields are checked.
    ///
    /// An explicit `null` is rejected, since every stored policy must keep all
    /// of its required fields.
    pub fn into_patch(self) -> Result<PolicyPatch, ValidationError> {
        let mut errors = Vec::new();

        let patch = PolicyPatch {
            policy_number: self
                .policy_number
                .and_then(|v| collect(&mut errors, text(POLICY_NUMBER, Some(&v)))),
            insurance_type: self
                .insurance_type
                .and_then(|v| collect(&mut errors, insurance_type(Some(&v)))),
            policy_holder: self
                .policy_holder
                .and_then(|v| collect(&mut errors, text(POLICY_HOLDER, Some(&v)))),
            insured_amount: self
                .insured_amount
                .and_then(|v| collect(&mut errors, amount(Some(&v)))),
        };

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(ValidationError::new(errors))
        }
    }
}

fn collect<T>(errors: &mut Vec<FieldError>, result: Result<T, FieldError>) -> Option<T> {
    result.map_err(|e| errors.push(e)).ok()
}

fn text(field: &'static str, value: Option<&Value>) -> Result<String, FieldError> {
    match value {
        None | Some(Value::Null) => Err(FieldError::required(field)),
        Some(Value::String(s)) if s.is_empty() => Err(FieldError::required(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(FieldError::new(field, "must be a string")),
    }
}

fn insurance_type(value: Option<&Value>) -> Result<InsuranceType, FieldError> {
    let raw = match value {
        None | Some(Value::Null) => return Err(FieldError::required(INSURANCE_TYPE)),
        Some(Value::String(s)) if s.is_empty() => return Err(FieldError::required(INSURANCE_TYPE)),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    raw.parse().map_err(|_| {
        let expected: Vec<&str> = InsuranceType::ALL.iter().map(|t| t.as_str()).collect();
        FieldError::new(
            INSURANCE_TYPE,
            format!(
                "'{}' is not a valid insurance type (expected one of {})",
                raw,
                expected.join(", ")
            ),
        )
    })
}

fn amount(value: Option<&Value>) -> Result<f64, FieldError> {
    match value {
        None | Some(Value::Null) => Err(FieldError::required(INSURED_AMOUNT)),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FieldError::new(INSURED_AMOUNT, "must be a number")),
        // Numeric strings are cast, as document mappers commonly do.
        Some(Value::String(s)) if s.trim().is_empty() => Err(FieldError::required(INSURED_AMOUNT)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FieldError::new(INSURED_AMOUNT, "must be a number")),
        Some(_) => Err(FieldError::new(INSURED_AMOUNT, "must be a number")),
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field
    pub field: &'static str,

    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

/// Schema violation for a create or update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Whether the given field was among the rejected ones
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("policy validation failed")?;
        for (i, err) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{}{}: {}", sep, err.field, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
