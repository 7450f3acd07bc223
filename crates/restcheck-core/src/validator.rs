//! Validator capability: checks a JSON value against a declared schema.
//!
//! Validation failures are data, not control flow; the executor folds them
//! into the contract's result instead of aborting the run.

use crate::error::ValidationError;
use jsonschema::Draft;

/// Capability checking a value against a schema.
pub trait Validator: Send + Sync {
    /// Validate `value` against `schema`, reporting the first violation.
    fn validate(
        &self,
        value: &serde_json::Value,
        schema: &serde_json::Value,
    ) -> Result<(), ValidationError>;
}

/// JSON Schema (Draft 2020-12) validator.
pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn validate(
        &self,
        value: &serde_json::Value,
        schema: &serde_json::Value,
    ) -> Result<(), ValidationError> {
        // Schemas are compiled at suite load time too; a failure here means
        // the schema was handed in without going through Suite::validate.
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| ValidationError::new(format!("schema failed to compile: {err}")))?;

        compiled
            .validate(value)
            .map_err(|err| ValidationError::new(err.to_string()))
    }
}
