//! Declared per-stage feature schemas
//!
//! A schema is the authoritative, ordered list of fields a scoring stage expects.
//! Every field carries an explicit kind and default; the default is what the
//! adapter substitutes (with a diagnostic) when the row lacks the field or holds
//! an unusable value.

use crate::models::Stage;
use flybeta_common::config::FieldEntry;
use flybeta_common::{Error, Result};
use std::collections::HashSet;
use std::str::FromStr;

/// Airport weather attributes included for both the origin and destination side
const WEATHER_ATTRIBUTES: &[&str] = &[
    "temp_c",
    "humidity_pct",
    "wind_speed_kmph",
    "visibility_km",
    "precip_mm",
    "cloud_cover_pct",
    "pressure_mb",
];

/// Built-in field order used by both stages when none is configured
pub fn default_feature_order() -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::new("sched_dep_hour", FieldKind::Integer),
        FieldSpec::new("sched_dep_dow", FieldKind::Integer),
        FieldSpec::new("sched_dep_month", FieldKind::Integer),
        FieldSpec::new("sched_block_minutes", FieldKind::Float),
    ];
    for side in ["origin", "dest"] {
        for attribute in WEATHER_ATTRIBUTES {
            fields.push(FieldSpec::new(
                format!("{}_{}", side, attribute),
                FieldKind::Float,
            ));
        }
    }
    fields
}

/// Value domain of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Float,
    /// Rounded to the nearest integer before sending
    Integer,
    /// Must be exactly 0 or 1
    Flag,
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float" => Ok(FieldKind::Float),
            "integer" | "int" => Ok(FieldKind::Integer),
            "flag" | "bool" => Ok(FieldKind::Flag),
            other => Err(format!("unknown field kind '{}'", other)),
        }
    }
}

impl FieldKind {
    /// Map a raw value into this kind's domain
    pub fn coerce(self, value: f64) -> std::result::Result<f64, String> {
        match self {
            FieldKind::Float => Ok(value),
            FieldKind::Integer => Ok(value.round()),
            FieldKind::Flag => {
                if value == 0.0 || value == 1.0 {
                    Ok(value)
                } else {
                    Err("flag must be 0 or 1".to_string())
                }
            }
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Substituted when the value is missing, invalid or non-finite
    pub default: f64,
}

impl FieldSpec {
    /// Field with the standard default of 0.0
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: 0.0,
        }
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }
}

/// What to do when a declared field is missing or invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Use the field default, log a warning, record the field on the result
    #[default]
    Substitute,
    /// Fail the record's stage with a FeatureSchemaError
    Reject,
}

impl FromStr for MissingFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substitute" | "default" => Ok(MissingFieldPolicy::Substitute),
            "reject" | "error" => Ok(MissingFieldPolicy::Reject),
            other => Err(format!(
                "unknown missing_field_policy '{}' (expected substitute or reject)",
                other
            )),
        }
    }
}

/// Ordered field list for one stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageSchema {
    stage: Stage,
    fields: Vec<FieldSpec>,
}

impl StageSchema {
    /// Validate and build a schema; names must be non-empty and unique
    pub fn new(stage: Stage, fields: Vec<FieldSpec>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::Config(format!(
                "Feature schema for stage {} is empty",
                stage
            )));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Feature schema for stage {} has an empty field name",
                    stage
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Config(format!(
                    "Feature schema for stage {} declares '{}' twice",
                    stage, field.name
                )));
            }
            if !field.default.is_finite() {
                return Err(Error::Config(format!(
                    "Default for '{}' must be finite",
                    field.name
                )));
            }
            // Substituted as-is, so it must already lie in the field's domain
            if field.kind.coerce(field.default) != Ok(field.default) {
                return Err(Error::Config(format!(
                    "Default {} for '{}' is not a valid {:?} value",
                    field.default, field.name, field.kind
                )));
            }
        }

        Ok(Self { stage, fields })
    }

    /// Built-in schema for a stage
    pub fn default_for(stage: Stage) -> Self {
        Self {
            stage,
            fields: default_feature_order(),
        }
    }

    /// Build from `[features] stageN = [...]` config entries
    pub fn from_entries(stage: Stage, entries: &[FieldEntry]) -> Result<Self> {
        let fields = entries
            .iter()
            .map(|entry| match entry {
                FieldEntry::Name(name) => Ok(FieldSpec::new(name.clone(), FieldKind::Float)),
                FieldEntry::Spec {
                    name,
                    kind,
                    default,
                } => {
                    let kind = match kind {
                        Some(kind) => kind.parse::<FieldKind>().map_err(|e| {
                            Error::Config(format!("Field '{}' in stage {}: {}", name, stage, e))
                        })?,
                        None => FieldKind::Float,
                    };
                    Ok(FieldSpec::new(name.clone(), kind).with_default(default.unwrap_or(0.0)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(stage, fields)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
