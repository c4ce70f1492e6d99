//! # Record Mapping
//!
//! Converts source-shaped records into destination-shaped records. Mapping is a
//! pure function: the same source record always yields the same destination
//! record, and a mapping failure is a data-quality fault that is never retried.

pub mod student;

use crate::models::{DestinationRecord, FieldType, FieldValue, Record, SourceRecord};
use thiserror::Error;

pub use student::{student_mapping, STUDENT_COLUMNS};

/// Data-shape fault raised while mapping a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("Required source field '{field}' is missing")]
    MissingField { field: String },

    #[error("Source field '{field}' is {found}, expected {expected}")]
    IncompatibleType {
        field: String,
        expected: FieldType,
        found: String,
    },

    #[error("Source field '{field}' is null but the destination requires a value")]
    NullValue { field: String },
}

/// Transforms a source record into a destination record
pub trait RecordMapper: Send + Sync {
    fn map(&self, source: &SourceRecord) -> Result<DestinationRecord, MappingError>;
}

impl<F> RecordMapper for F
where
    F: Fn(&SourceRecord) -> Result<DestinationRecord, MappingError> + Send + Sync,
{
    fn map(&self, source: &SourceRecord) -> Result<DestinationRecord, MappingError> {
        self(source)
    }
}

/// How one destination field is derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    /// Direct copy; the source value must already have type `ty`
    Copy {
        from: String,
        ty: FieldType,
        nullable: bool,
    },
    /// Copy with type conversion to `ty`
    Coerce {
        from: String,
        ty: FieldType,
        nullable: bool,
    },
    /// Fixed value, no source field involved
    Default(FieldValue),
}

impl FieldRule {
    pub fn copy(from: impl Into<String>, ty: FieldType) -> Self {
        Self::Copy {
            from: from.into(),
            ty,
            nullable: false,
        }
    }

    pub fn coerce(from: impl Into<String>, ty: FieldType) -> Self {
        Self::Coerce {
            from: from.into(),
            ty,
            nullable: false,
        }
    }

    pub fn default_value(value: impl Into<FieldValue>) -> Self {
        Self::Default(value.into())
    }

    /// Allow a null source value to pass through as null
    pub fn nullable(self) -> Self {
        match self {
            Self::Copy { from, ty, .. } => Self::Copy {
                from,
                ty,
                nullable: true,
            },
            Self::Coerce { from, ty, .. } => Self::Coerce {
                from,
                ty,
                nullable: true,
            },
            other => other,
        }
    }

    fn apply(&self, source: &SourceRecord) -> Result<FieldValue, MappingError> {
        let (from, ty, nullable, coerce) = match self {
            Self::Default(value) => return Ok(value.clone()),
            Self::Copy { from, ty, nullable } => (from, *ty, *nullable, false),
            Self::Coerce { from, ty, nullable } => (from, *ty, *nullable, true),
        };

        let value = source
            .get(from)
            .ok_or_else(|| MappingError::MissingField { field: from.clone() })?;

        if value.is_null() {
            return if nullable {
                Ok(FieldValue::Null)
            } else {
                Err(MappingError::NullValue { field: from.clone() })
            };
        }

        if value.field_type() == Some(ty) {
            return Ok(value.clone());
        }

        let incompatible = || MappingError::IncompatibleType {
            field: from.clone(),
            expected: ty,
            found: describe(value),
        };

        if coerce {
            coerce_value(value, ty).ok_or_else(incompatible)
        } else {
            Err(incompatible())
        }
    }
}

fn describe(value: &FieldValue) -> String {
    match value.field_type() {
        Some(ty) => format!("{ty} '{value}'"),
        None => "null".to_string(),
    }
}

/// Convert a non-null value to `target`, `None` when no lossless conversion exists
pub fn coerce_value(value: &FieldValue, target: FieldType) -> Option<FieldValue> {
    match (value, target) {
        (FieldValue::Int(v), FieldType::Int) => Some(FieldValue::Int(*v)),
        (FieldValue::Int(v), FieldType::Text) => Some(FieldValue::Text(v.to_string())),
        (FieldValue::Int(0), FieldType::Bool) => Some(FieldValue::Bool(false)),
        (FieldValue::Int(1), FieldType::Bool) => Some(FieldValue::Bool(true)),
        (FieldValue::Text(v), FieldType::Text) => Some(FieldValue::Text(v.clone())),
        (FieldValue::Text(v), FieldType::Int) => v.trim().parse().ok().map(FieldValue::Int),
        (FieldValue::Text(v), FieldType::Bool) => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(FieldValue::Bool(true)),
            "false" | "f" | "0" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        (FieldValue::Bool(v), FieldType::Bool) => Some(FieldValue::Bool(*v)),
        (FieldValue::Bool(v), FieldType::Int) => Some(FieldValue::Int(i64::from(*v))),
        (FieldValue::Bool(v), FieldType::Text) => Some(FieldValue::Text(v.to_string())),
        _ => None,
    }
}

/// Declarative, total field-by-field mapping. Every destination field has
/// exactly one rule; the destination record's field order is declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    rules: Vec<(String, FieldRule)>,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) the rule for a destination field
    pub fn field(mut self, destination: impl Into<String>, rule: FieldRule) -> Self {
        let destination = destination.into();
        match self.rules.iter_mut().find(|(name, _)| *name == destination) {
            Some((_, existing)) => *existing = rule,
            None => self.rules.push((destination, rule)),
        }
        self
    }

    /// Destination field names in declaration order
    pub fn destination_fields(&self) -> Vec<&str> {
        self.rules.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl RecordMapper for FieldMapper {
    fn map(&self, source: &SourceRecord) -> Result<DestinationRecord, MappingError> {
        let mut record = Record::new();
        for (destination, rule) in &self.rules {
            record.set(destination.clone(), rule.apply(source)?);
        }
        Ok(DestinationRecord(record))
    }
}
