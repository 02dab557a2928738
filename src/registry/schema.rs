//! Schema derivation: from declarative parameter specs to a structural
//! schema.
//!
//! `derive` is a pure function: it checks every declaration for internal
//! consistency, compiles pattern constraints, and renders the JSON schema
//! document served by the discovery endpoints. Any inconsistency is
//! returned as a [`SchemaError`] so registration aborts process startup
//! instead of degrading at first call.

use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;

use super::descriptor::{ParamType, ParameterSpec};

/// Fatal schema-derivation failures, reported at registration time.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A capability was declared without a bound behavior.
    #[error("capability '{capability}' has no behavior bound")]
    MissingBehavior { capability: String },

    /// Two parameters share a name.
    #[error("capability '{capability}': duplicate parameter '{param}'")]
    DuplicateParam { capability: String, param: String },

    /// A constraint was attached to a type that cannot carry it.
    #[error("capability '{capability}': parameter '{param}': {reason}")]
    UnsupportedConstraint {
        capability: String,
        param: String,
        reason: String,
    },

    /// A pattern constraint failed to compile.
    #[error("capability '{capability}': parameter '{param}': invalid pattern: {source}")]
    InvalidPattern {
        capability: String,
        param: String,
        source: regex::Error,
    },

    /// A declared default violates the parameter's own type or constraints.
    #[error("capability '{capability}': parameter '{param}': bad default: {reason}")]
    BadDefault {
        capability: String,
        param: String,
        reason: String,
    },
}

/// Derive the checked parameter specs and the discovery JSON schema for one
/// capability.
///
/// Returns the specs with compiled patterns filled in, plus a JSON-schema
/// object of the form `{"type": "object", "properties": {...},
/// "required": [...]}` with properties in declaration order.
pub fn derive(
    capability: &str,
    params: Vec<ParameterSpec>,
) -> Result<(Vec<ParameterSpec>, Value), SchemaError> {
    let mut checked: Vec<ParameterSpec> = Vec::with_capacity(params.len());
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    for mut spec in params {
        if checked.iter().any(|p| p.name == spec.name) {
            return Err(SchemaError::DuplicateParam {
                capability: capability.to_string(),
                param: spec.name,
            });
        }

        check_constraints(capability, &spec)?;

        if let Some(pattern) = &spec.constraints.pattern {
            let compiled = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                capability: capability.to_string(),
                param: spec.name.clone(),
                source,
            })?;
            spec.compiled_pattern = Some(compiled);
        }

        if let Some(default) = &spec.default {
            check_default(capability, &spec, default)?;
        }

        if spec.required() {
            required.push(Value::String(spec.name.clone()));
        }
        properties.insert(spec.name.clone(), render_param(&spec));
        checked.push(spec);
    }

    let schema = json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
    });
    Ok((checked, schema))
}

/// Whether a JSON value conforms to a declared parameter type.
pub(crate) fn value_conforms(param_type: ParamType, value: &Value) -> bool {
    match param_type {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    }
}

fn check_constraints(capability: &str, spec: &ParameterSpec) -> Result<(), SchemaError> {
    let unsupported = |reason: String| SchemaError::UnsupportedConstraint {
        capability: capability.to_string(),
        param: spec.name.clone(),
        reason,
    };

    let has_length =
        spec.constraints.min_length.is_some() || spec.constraints.max_length.is_some();
    if has_length && !matches!(spec.param_type, ParamType::String | ParamType::StringList) {
        return Err(unsupported(format!(
            "length constraint on {} parameter",
            spec.param_type.json_type()
        )));
    }
    if spec.constraints.pattern.is_some() && spec.param_type != ParamType::String {
        return Err(unsupported(format!(
            "pattern constraint on {} parameter",
            spec.param_type.json_type()
        )));
    }
    if let (Some(min), Some(max)) = (spec.constraints.min_length, spec.constraints.max_length) {
        if min > max {
            return Err(unsupported(format!(
                "min length {} exceeds max length {}",
                min, max
            )));
        }
    }
    Ok(())
}

fn check_default(
    capability: &str,
    spec: &ParameterSpec,
    default: &Value,
) -> Result<(), SchemaError> {
    let bad = |reason: String| SchemaError::BadDefault {
        capability: capability.to_string(),
        param: spec.name.clone(),
        reason,
    };

    if !value_conforms(spec.param_type, default) {
        return Err(bad(format!(
            "default is not a {}",
            spec.param_type.json_type()
        )));
    }

    let length = match default {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    };
    if let Some(length) = length {
        if spec.constraints.min_length.is_some_and(|min| length < min)
            || spec.constraints.max_length.is_some_and(|max| length > max)
        {
            return Err(bad("default violates length bounds".to_string()));
        }
    }
    if let (Some(regex), Value::String(s)) = (&spec.compiled_pattern, default) {
        if !regex.is_match(s) {
            return Err(bad("default does not match pattern".to_string()));
        }
    }
    Ok(())
}

fn render_param(spec: &ParameterSpec) -> Value {
    let mut out = Map::new();
    out.insert(
        "type".to_string(),
        Value::String(spec.param_type.json_type().to_string()),
    );
    if let Some(description) = &spec.description {
        out.insert("description".to_string(), Value::String(description.clone()));
    }
    match spec.param_type {
        ParamType::StringList => {
            out.insert("items".to_string(), json!({"type": "string"}));
            if let Some(min) = spec.constraints.min_length {
                out.insert("minItems".to_string(), json!(min));
            }
            if let Some(max) = spec.constraints.max_length {
                out.insert("maxItems".to_string(), json!(max));
            }
        }
        ParamType::String => {
            if let Some(min) = spec.constraints.min_length {
                out.insert("minLength".to_string(), json!(min));
            }
            if let Some(max) = spec.constraints.max_length {
                out.insert("maxLength".to_string(), json!(max));
            }
            if let Some(pattern) = &spec.constraints.pattern {
                out.insert("pattern".to_string(), Value::String(pattern.clone()));
            }
        }
        _ => {}
    }
    if let Some(default) = &spec.default {
        out.insert("default".to_string(), default.clone());
    }
    Value::Object(out)
}
