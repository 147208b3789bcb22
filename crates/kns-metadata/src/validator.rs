//!
//! # Namespace validators
//!
//! Constraints a namespace places on the configuration of its topics and
//! connectors. Constraints are evaluated in declaration order and every
//! violation yields one error string.
//!
use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};

use kns_types::defaults::{CONNECTOR_CLASS_KEY, PARTITIONS_KEY, REPLICATION_FACTOR_KEY};

use crate::connector::ConnectorSpec;
use crate::topic::TopicSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Constraint {
    /// numeric value within inclusive bounds
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
        #[serde(default)]
        optional: bool,
    },
    /// exactly one value out of a set
    ValidString {
        values: Vec<String>,
        #[serde(default)]
        optional: bool,
    },
    /// comma separated list, every member out of a set
    ValidList {
        values: Vec<String>,
        #[serde(default)]
        optional: bool,
    },
    NonEmptyString {
        #[serde(default)]
        optional: bool,
    },
    Fixed { value: String },
}

impl Constraint {
    pub fn range(min: i64, max: i64) -> Self {
        Self::Range {
            min: Some(min),
            max: Some(max),
            optional: false,
        }
    }

    pub fn at_least(min: i64) -> Self {
        Self::Range {
            min: Some(min),
            max: None,
            optional: false,
        }
    }

    pub fn valid_string(values: &[&str]) -> Self {
        Self::ValidString {
            values: values.iter().map(|v| v.to_string()).collect(),
            optional: false,
        }
    }

    pub fn valid_list(values: &[&str]) -> Self {
        Self::ValidList {
            values: values.iter().map(|v| v.to_string()).collect(),
            optional: false,
        }
    }

    fn is_optional(&self) -> bool {
        match self {
            Self::Range { optional, .. }
            | Self::ValidString { optional, .. }
            | Self::ValidList { optional, .. }
            | Self::NonEmptyString { optional } => *optional,
            Self::Fixed { .. } => false,
        }
    }

    /// reason the value is rejected, if any
    fn check(&self, value: Option<&str>) -> Option<String> {
        let Some(value) = value else {
            return if self.is_optional() {
                None
            } else {
                Some("Value must be non-null".to_owned())
            };
        };

        match self {
            Self::Range { min, max, .. } => {
                let Ok(number) = value.trim().parse::<i64>() else {
                    return Some(format!("Not a number: {value}"));
                };
                if let Some(min) = min {
                    if number < *min {
                        return Some(format!("Value must be at least {min}"));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        return Some(format!("Value must be no more than {max}"));
                    }
                }
                None
            }
            Self::ValidString { values, .. } => {
                if values.iter().any(|v| v == value) {
                    None
                } else {
                    Some(format!("String must be one of: {}", values.join(", ")))
                }
            }
            Self::ValidList { values, .. } => {
                let all_valid = value
                    .split(',')
                    .map(str::trim)
                    .all(|item| values.iter().any(|v| v == item));
                if all_valid {
                    None
                } else {
                    Some(format!("String must be one of: {}", values.join(", ")))
                }
            }
            Self::NonEmptyString { .. } => {
                if value.trim().is_empty() {
                    Some("String cannot be empty".to_owned())
                } else {
                    None
                }
            }
            Self::Fixed { value: expected } => {
                if expected == value {
                    None
                } else {
                    Some(format!("Value must be {expected}"))
                }
            }
        }
    }
}

/// constraint bound to a configuration field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraint {
    pub field: String,
    #[serde(flatten)]
    pub constraint: Constraint,
}

impl FieldConstraint {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }

    pub fn validate(&self, value: Option<&str>) -> Option<String> {
        self.constraint
            .check(value)
            .map(|reason| invalid_value(value.unwrap_or("null"), &self.field, reason))
    }
}

impl fmt::Display for FieldConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.field, self.constraint)
    }
}

pub fn invalid_value(value: impl fmt::Display, field: &str, reason: impl fmt::Display) -> String {
    format!("Invalid value {value} for configuration {field}: {reason}")
}

fn validate_fields<'a, F>(constraints: &[FieldConstraint], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    constraints
        .iter()
        .filter_map(|constraint| constraint.validate(lookup(&constraint.field)))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicValidator {
    #[serde(default)]
    pub validation_constraints: Vec<FieldConstraint>,
}

impl TopicValidator {
    pub fn new(validation_constraints: Vec<FieldConstraint>) -> Self {
        Self {
            validation_constraints,
        }
    }

    pub fn make_default() -> Self {
        Self::new(vec![
            FieldConstraint::new(REPLICATION_FACTOR_KEY, Constraint::range(3, 3)),
            FieldConstraint::new(PARTITIONS_KEY, Constraint::range(3, 6)),
            FieldConstraint::new("cleanup.policy", Constraint::valid_list(&["delete", "compact"])),
            FieldConstraint::new("min.insync.replicas", Constraint::range(2, 2)),
            FieldConstraint::new("retention.ms", Constraint::range(60000, 604800000)),
        ])
    }

    pub fn make_default_one_broker() -> Self {
        Self::new(vec![
            FieldConstraint::new(REPLICATION_FACTOR_KEY, Constraint::range(1, 1)),
            FieldConstraint::new(PARTITIONS_KEY, Constraint::range(3, 6)),
            FieldConstraint::new("cleanup.policy", Constraint::valid_list(&["delete", "compact"])),
            FieldConstraint::new("min.insync.replicas", Constraint::range(1, 1)),
            FieldConstraint::new("retention.ms", Constraint::range(60000, 604800000)),
        ])
    }

    fn declares(&self, field: &str) -> bool {
        self.validation_constraints.iter().any(|c| c.field == field)
    }

    /// partitions and replication factor are checked like any config key
    pub fn validate(&self, spec: &TopicSpec) -> Vec<String> {
        let partitions = spec.partitions.to_string();
        let replication_factor = spec.replication_factor.to_string();

        let mut errors = validate_fields(&self.validation_constraints, |field| match field {
            PARTITIONS_KEY => Some(partitions.as_str()),
            REPLICATION_FACTOR_KEY => Some(replication_factor.as_str()),
            key => spec.configs.get(key).map(String::as_str),
        });

        if !self.validation_constraints.is_empty() {
            for (key, value) in &spec.configs {
                if !self.declares(key) {
                    errors.push(invalid_value(value, key, "Configuration not allowed"));
                }
            }
        }

        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectValidator {
    #[serde(default)]
    pub validation_constraints: Vec<FieldConstraint>,
    #[serde(default)]
    pub source_validation_constraints: Vec<FieldConstraint>,
    #[serde(default)]
    pub sink_validation_constraints: Vec<FieldConstraint>,
    /// keyed by connector.class
    #[serde(default)]
    pub class_validation_constraints: BTreeMap<String, Vec<FieldConstraint>>,
}

impl ConnectValidator {
    pub fn validate(&self, spec: &ConnectorSpec) -> Vec<String> {
        let lookup = |field: &str| spec.config.get(field).map(String::as_str);

        let Some(class) = spec.connector_class() else {
            return vec![invalid_value(
                "null",
                CONNECTOR_CLASS_KEY,
                "Value must be non-null",
            )];
        };

        let mut errors = validate_fields(&self.validation_constraints, lookup);
        if spec.is_sink() {
            errors.extend(validate_fields(&self.sink_validation_constraints, lookup));
        } else {
            errors.extend(validate_fields(&self.source_validation_constraints, lookup));
        }
        if let Some(constraints) = self.class_validation_constraints.get(class) {
            errors.extend(validate_fields(constraints, lookup));
        }
        errors
    }
}

#[cfg(test)]
mod test {

    use std::collections::BTreeMap;

    use crate::connector::ConnectorSpec;
    use crate::topic::TopicSpec;

    use super::{Constraint, ConnectValidator, FieldConstraint, TopicValidator};

    fn topic(partitions: i32, replication_factor: i32, configs: &[(&str, &str)]) -> TopicSpec {
        TopicSpec {
            partitions,
            replication_factor,
            configs: configs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    const VALID_CONFIGS: [(&str, &str); 3] = [
        ("cleanup.policy", "delete"),
        ("min.insync.replicas", "2"),
        ("retention.ms", "60000"),
    ];

    #[test]
    fn test_default_topic_validator_accepts() {
        let errors = TopicValidator::make_default().validate(&topic(3, 3, &VALID_CONFIGS));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_replication_factor_rejected() {
        let errors = TopicValidator::make_default().validate(&topic(3, 1, &VALID_CONFIGS));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("replication.factor"));
        assert_eq!(
            errors[0],
            "Invalid value 1 for configuration replication.factor: Value must be at least 3"
        );
    }

    #[test]
    fn test_errors_follow_declaration_order() {
        let errors = TopicValidator::make_default().validate(&topic(
            10,
            1,
            &[
                ("cleanup.policy", "delete,archive"),
                ("min.insync.replicas", "2"),
                ("retention.ms", "60000"),
                ("segment.bytes", "1024"),
            ],
        ));
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("replication.factor"));
        assert!(errors[1].contains("partitions"));
        assert!(errors[2].contains("cleanup.policy"));
        assert!(errors[3].ends_with("segment.bytes: Configuration not allowed"));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let errors = TopicValidator::make_default().validate(&topic(3, 3, &[]));
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| e.contains("Value must be non-null")));
    }

    #[test]
    fn test_constraints_from_yaml() {
        let yaml = r#"
validationConstraints:
  - field: partitions
    type: range
    min: 1
  - field: compression.type
    type: validString
    values: [lz4, zstd]
    optional: true
  - field: owner
    type: fixed
    value: platform
"#;
        let validator: TopicValidator = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(
            validator.validation_constraints[0],
            FieldConstraint::new("partitions", Constraint::at_least(1))
        );
        let errors = validator.validate(&topic(1, 1, &[("owner", "platform")]));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_connect_validator_sink_constraints() {
        let validator = ConnectValidator {
            validation_constraints: vec![FieldConstraint::new(
                "key.converter",
                Constraint::NonEmptyString { optional: false },
            )],
            sink_validation_constraints: vec![FieldConstraint::new(
                "consumer.override.auto.offset.reset",
                Constraint::valid_string(&["earliest", "latest"]),
            )],
            class_validation_constraints: BTreeMap::from([(
                "io.example.FileSink".to_owned(),
                vec![FieldConstraint::new("file", Constraint::NonEmptyString { optional: false })],
            )]),
            ..Default::default()
        };

        let mut spec = ConnectorSpec::new("local-connect");
        spec.config
            .insert("connector.class".to_owned(), "io.example.FileSink".to_owned());
        spec.config.insert("topics".to_owned(), "ns1-a".to_owned());
        spec.config.insert("key.converter".to_owned(), String::new());
        spec.config.insert("file".to_owned(), "/tmp/out".to_owned());

        let errors = validator.validate(&spec);
        assert_eq!(errors.len(), 2, "{errors:?}");
        // empty value is present, not absent
        assert!(errors[0].contains("String cannot be empty"));
        assert!(errors[1].contains("Value must be non-null"));
    }

    #[test]
    fn test_connect_validator_requires_class() {
        let errors = ConnectValidator::default().validate(&ConnectorSpec::new("local-connect"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("connector.class"));
    }
}
