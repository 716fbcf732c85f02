//! Vector-config validation against a dataset schema.
//!
//! Pure gate run at experiment creation: an experiment whose vector config
//! does not structurally match its dataset's schema is never persisted.

use crate::config::{SchemaConfig, SchemaVector, VectorConfig, VectorSpec};
use std::collections::BTreeMap;

/// Why an experiment's vector config was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Dataset schema missing vector configuration")]
    SchemaMissingVector,

    #[error("vector_config missing 'size' field")]
    MissingSize,

    #[error("Dimension mismatch: dataset expects {expected}, config has {actual}")]
    DimensionMismatch { expected: u64, actual: u64 },

    #[error("Multi-vector dataset requires 'vectors' in config")]
    MissingVectors,

    #[error("Vector '{name}' not in dataset. Available: {available}")]
    UnknownVector { name: String, available: String },

    #[error("Vector '{name}' dimension mismatch: expected {expected}, got {actual}")]
    NamedDimensionMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },
}

/// Validate an experiment's vector config against the dataset schema.
///
/// Single-vector schemas require a top-level `size` that equals the declared
/// `dim` (when the schema declares one). Multi-vector schemas require a
/// `vectors` map whose names are a subset of the declared names, with matching
/// dimensions where both sides declare them.
pub fn validate_vector_config(
    vector_config: &VectorConfig,
    schema_config: &SchemaConfig,
) -> Result<(), ValidationError> {
    if let Some(schema_vector) = &schema_config.vector {
        return validate_single_vector(vector_config, schema_vector);
    }

    if let Some(schema_vectors) = &schema_config.vectors {
        return validate_multi_vector(vector_config, schema_vectors);
    }

    Err(ValidationError::SchemaMissingVector)
}

fn validate_single_vector(
    vector_config: &VectorConfig,
    schema_vector: &SchemaVector,
) -> Result<(), ValidationError> {
    let actual = vector_config.size.ok_or(ValidationError::MissingSize)?;

    if let Some(expected) = schema_vector.dim {
        if expected != actual {
            return Err(ValidationError::DimensionMismatch { expected, actual });
        }
    }

    Ok(())
}

fn validate_multi_vector(
    vector_config: &VectorConfig,
    schema_vectors: &BTreeMap<String, SchemaVector>,
) -> Result<(), ValidationError> {
    let configured: &BTreeMap<String, VectorSpec> = match &vector_config.vectors {
        Some(v) if !v.is_empty() => v,
        _ => return Err(ValidationError::MissingVectors),
    };

    for (name, spec) in configured {
        let Some(declared) = schema_vectors.get(name) else {
            let available = schema_vectors
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::UnknownVector {
                name: name.clone(),
                available,
            });
        };

        if let (Some(expected), Some(actual)) = (declared.dim, spec.size) {
            if expected != actual {
                return Err(ValidationError::NamedDimensionMismatch {
                    name: name.clone(),
                    expected,
                    actual,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_schema(dim: Option<u64>) -> SchemaConfig {
        SchemaConfig {
            vector: Some(SchemaVector {
                dim,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn single_config(size: Option<u64>) -> VectorConfig {
        VectorConfig {
            size,
            ..Default::default()
        }
    }

    fn multi_schema(entries: &[(&str, u64)]) -> SchemaConfig {
        let vectors = entries
            .iter()
            .map(|(name, dim)| {
                (
                    name.to_string(),
                    SchemaVector {
                        dim: Some(*dim),
                        ..Default::default()
                    },
                )
            })
            .collect();
        SchemaConfig {
            vectors: Some(vectors),
            ..Default::default()
        }
    }

    fn multi_config(entries: &[(&str, u64)]) -> VectorConfig {
        let vectors = entries
            .iter()
            .map(|(name, size)| {
                (
                    name.to_string(),
                    VectorSpec {
                        size: Some(*size),
                        ..Default::default()
                    },
                )
            })
            .collect();
        VectorConfig {
            vectors: Some(vectors),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_vector_matching_dim_passes() {
        let result = validate_vector_config(&single_config(Some(384)), &single_schema(Some(384)));
        assert!(result.is_ok());
    }

    #[test]
    fn test_single_vector_schema_without_dim_passes() {
        let result = validate_vector_config(&single_config(Some(1536)), &single_schema(None));
        assert!(result.is_ok());
    }

    #[test]
    fn test_single_vector_missing_size_fails() {
        let err = validate_vector_config(&single_config(None), &single_schema(Some(384)))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingSize);
    }

    #[test]
    fn test_single_vector_mismatch_names_both_dims() {
        let err = validate_vector_config(&single_config(Some(512)), &single_schema(Some(384)))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("384"), "missing expected dim: {}", msg);
        assert!(msg.contains("512"), "missing actual dim: {}", msg);
    }

    #[test]
    fn test_multi_vector_subset_allowed() {
        let schema = multi_schema(&[("text", 384), ("image", 512)]);
        let config = multi_config(&[("text", 384)]);
        assert!(validate_vector_config(&config, &schema).is_ok());
    }

    #[test]
    fn test_multi_vector_unknown_name_lists_available() {
        let schema = multi_schema(&[("image", 512), ("text", 384)]);
        let config = multi_config(&[("audio", 128)]);
        let err = validate_vector_config(&config, &schema).unwrap_err();
        match &err {
            ValidationError::UnknownVector { name, available } => {
                assert_eq!(name, "audio");
                assert_eq!(available, "image, text");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_multi_vector_dim_mismatch_names_vector() {
        let schema = multi_schema(&[("text", 384)]);
        let config = multi_config(&[("text", 768)]);
        let err = validate_vector_config(&config, &schema).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'text'"));
        assert!(msg.contains("384"));
        assert!(msg.contains("768"));
    }

    #[test]
    fn test_multi_vector_missing_vectors_map_fails() {
        let schema = multi_schema(&[("text", 384)]);
        let err = validate_vector_config(&VectorConfig::default(), &schema).unwrap_err();
        assert_eq!(err, ValidationError::MissingVectors);
    }

    #[test]
    fn test_empty_schema_fails() {
        let err = validate_vector_config(&single_config(Some(384)), &SchemaConfig::default())
            .unwrap_err();
        assert_eq!(err, ValidationError::SchemaMissingVector);
        assert_eq!(
            err.to_string(),
            "Dataset schema missing vector configuration"
        );
    }
}
