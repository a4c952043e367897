//! Feature adapter: row + stage schema → ordered numeric vector

use super::row::FeatureRow;
use super::schema::{MissingFieldPolicy, StageSchema};
use crate::error::FeatureSchemaError;
use crate::models::Stage;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

/// Ordered feature values for one scoring call
///
/// Serializes as a JSON object whose keys follow schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    stage: Stage,
    entries: Vec<(String, f64)>,
    defaulted: Vec<String>,
}

impl FeatureVector {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, value)| *value).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    /// Fields that received their declared default
    pub fn defaulted(&self) -> &[String] {
        &self.defaulted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Builds vectors for one stage
#[derive(Debug, Clone)]
pub struct FeatureAdapter {
    schema: StageSchema,
    policy: MissingFieldPolicy,
}

impl FeatureAdapter {
    pub fn new(schema: StageSchema, policy: MissingFieldPolicy) -> Self {
        Self { schema, policy }
    }

    pub fn schema(&self) -> &StageSchema {
        &self.schema
    }

    pub fn policy(&self) -> MissingFieldPolicy {
        self.policy
    }

    /// Produce the vector in exact schema order
    ///
    /// Missing, invalid and non-finite values are replaced by the field default
    /// and logged. Under [`MissingFieldPolicy::Reject`] a missing or invalid
    /// value is an error instead; non-finite values are always normalized.
    pub fn vectorize(
        &self,
        row: &FeatureRow,
        unique_key: &str,
    ) -> Result<FeatureVector, FeatureSchemaError> {
        let stage = self.schema.stage();
        let mut entries = Vec::with_capacity(self.schema.len());
        let mut defaulted = Vec::new();

        for field in self.schema.fields() {
            let value = match row.get(&field.name) {
                None => {
                    if self.policy == MissingFieldPolicy::Reject {
                        return Err(FeatureSchemaError::MissingField {
                            stage: stage.number(),
                            field: field.name.clone(),
                        });
                    }
                    warn!(
                        unique_key,
                        stage = stage.number(),
                        field = %field.name,
                        default = field.default,
                        "Missing feature field, using default"
                    );
                    defaulted.push(field.name.clone());
                    field.default
                }
                Some(raw) if !raw.is_finite() => {
                    warn!(
                        unique_key,
                        stage = stage.number(),
                        field = %field.name,
                        value = raw,
                        "Non-finite feature value, using default"
                    );
                    defaulted.push(field.name.clone());
                    field.default
                }
                Some(raw) => match field.kind.coerce(raw) {
                    Ok(value) => value,
                    Err(reason) => {
                        if self.policy == MissingFieldPolicy::Reject {
                            return Err(FeatureSchemaError::InvalidField {
                                stage: stage.number(),
                                field: field.name.clone(),
                                value: raw,
                                reason,
                            });
                        }
                        warn!(
                            unique_key,
                            stage = stage.number(),
                            field = %field.name,
                            value = raw,
                            reason = %reason,
                            "Invalid feature value, using default"
                        );
                        defaulted.push(field.name.clone());
                        field.default
                    }
                },
            };
            entries.push((field.name.clone(), value));
        }

        Ok(FeatureVector {
            stage,
            entries,
            defaulted,
        })
    }
}
