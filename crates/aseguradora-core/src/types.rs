//! Core types for Aseguradora

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Line of business a policy belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceType {
    Auto,
    Life,
    Home,
    Health,
}

impl InsuranceType {
    /// Every accepted insurance type, in declaration order
    pub const ALL: [InsuranceType; 4] = [Self::Auto, Self::Life, Self::Home, Self::Health];

    /// Canonical name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "Auto",
            Self::Life => "Life",
            Self::Home => "Home",
            Self::Health => "Health",
        }
    }
}

impl fmt::Display for InsuranceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsuranceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown insurance type: {}", s))
    }
}

/// A persisted insurance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Storage-generated identifier
    pub id: String,

    /// Unique policy number
    pub policy_number: String,

    /// Line of business
    pub insurance_type: InsuranceType,

    /// Name of the policy holder
    pub policy_holder: String,

    /// Insured amount
    pub insured_amount: f64,

    /// Set once when the record is created
    pub created_at: DateTime<Utc>,

    /// Refreshed on every update
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Build a freshly created record from validated fields
    pub fn new(id: impl Into<String>, fields: NewPolicy, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            policy_number: fields.policy_number,
            insurance_type: fields.insurance_type,
            policy_holder: fields.policy_holder,
            insured_amount: fields.insured_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated fields for a policy that does not exist yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewPolicy {
    pub policy_number: String,
    pub insurance_type: InsuranceType,
    pub policy_holder: String,
    pub insured_amount: f64,
}

/// Validated subset of fields to merge into an existing policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyPatch {
    pub policy_number: Option<String>,
    pub insurance_type: Option<InsuranceType>,
    pub policy_holder: Option<String>,
    pub insured_amount: Option<f64>,
}

impl PolicyPatch {
    /// True when the patch carries no field changes
    pub fn is_empty(&self) -> bool {
        self.policy_number.is_none()
            && self.insurance_type.is_none()
            && self.policy_holder.is_none()
            && self.insured_amount.is_none()
    }

    /// Overwrite the supplied fields on `policy` and stamp `updated_at`.
    ///
    /// Fields absent from the patch keep their current values.
    pub fn apply(&self, policy: &mut Policy, now: DateTime<Utc>) {
        if let Some(number) = &self.policy_number {
            policy.policy_number = number.clone();
        }
        if let Some(kind) = self.insurance_type {
            policy.insurance_type = kind;
        }
        if let Some(holder) = &self.policy_holder {
            policy.policy_holder = holder.clone();
        }
        if let Some(amount) = self.insured_amount {
            policy.insured_amount = amount;
        }
        policy.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Policy {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Policy::new(
            "abc",
            NewPolicy {
                policy_number: "P123".to_string(),
                insurance_type: InsuranceType::Auto,
                policy_holder: "Juan Pérez".to_string(),
                insured_amount: 12000.0,
            },
            created,
        )
    }

    #[test]
    fn test_insurance_type_round_trips_through_str() {
        for kind in InsuranceType::ALL {
            assert_eq!(kind.as_str().parse::<InsuranceType>().unwrap(), kind);
        }
        assert!("auto".parse::<InsuranceType>().is_err());
        assert!("Vida".parse::<InsuranceType>().is_err());
    }

    #[test]
    fn test_policy_serializes_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["policyNumber"], "P123");
        assert_eq!(json["insuranceType"], "Auto");
        assert_eq!(json["policyHolder"], "Juan Pérez");
        assert_eq!(json["insuredAmount"], 12000.0);
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
        assert!(json.get("policy_number").is_none());
    }

    #[test]
    fn test_patch_only_touches_supplied_fields() {
        let mut policy = sample();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let patch = PolicyPatch {
            policy_holder: Some("María López".to_string()),
            ..Default::default()
        };

        patch.apply(&mut policy, later);

        assert_eq!(policy.policy_holder, "María López");
        assert_eq!(policy.policy_number, "P123");
        assert_eq!(policy.insurance_type, InsuranceType::Auto);
        assert_eq!(policy.insured_amount, 12000.0);
        assert_eq!(policy.updated_at, later);
        assert_ne!(policy.created_at, later);
    }

    #[test]
    fn test_empty_patch() {
        assert!(PolicyPatch::default().is_empty());
        let patch = PolicyPatch {
            insured_amount: Some(1.0),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
