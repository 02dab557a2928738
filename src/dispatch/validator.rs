//! Schema-driven input validation.
//!
//! Runs identically for every transport adapter: required-field presence,
//! type conformance, constraint predicates, then construction of the typed
//! argument view with defaults applied. Fail-fast: the first violation is
//! reported and no further checks run. Unknown fields are ignored for
//! forward compatibility with callers sending extra metadata.

use serde_json::{Map, Value};

use crate::registry::schema::value_conforms;
use crate::registry::{CapabilityDescriptor, ParamType, ParameterSpec};

pub const REASON_MISSING: &str = "missing required parameter";
pub const REASON_TYPE: &str = "type mismatch";
pub const REASON_BOUNDS: &str = "out of bounds";
pub const REASON_PATTERN: &str = "pattern mismatch";

/// A single validation violation: the offending field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: String,
    pub reason: String,
}

impl ValidationFailure {
    fn new(field: &str, reason: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Arguments that passed validation, with defaults applied for absent
/// optional parameters. Only fields declared in the schema are retained.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    /// String accessor. Total for validated string parameters; returns ""
    /// for anything else so handlers never need to unwrap.
    pub fn str(&self, name: &str) -> &str {
        self.values.get(name).and_then(Value::as_str).unwrap_or("")
    }

    /// String-list accessor, empty for absent or non-list fields.
    pub fn str_list(&self, name: &str) -> Vec<String> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw value accessor.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

/// Validate a raw argument mapping against a descriptor's schema.
pub fn validate(
    descriptor: &CapabilityDescriptor,
    raw: &Map<String, Value>,
) -> Result<ValidatedArgs, ValidationFailure> {
    // Pass 1: required presence, fail at the first absent field.
    for spec in &descriptor.params {
        if spec.required() && !raw.contains_key(&spec.name) {
            return Err(ValidationFailure::new(&spec.name, REASON_MISSING));
        }
    }

    // Pass 2: type conformance and constraints for every present field.
    for spec in &descriptor.params {
        if let Some(value) = raw.get(&spec.name) {
            check_value(spec, value)?;
        }
    }

    // Pass 3: build the typed view, applying defaults for absent optionals.
    let mut values = Map::new();
    for spec in &descriptor.params {
        let value = raw
            .get(&spec.name)
            .cloned()
            .unwrap_or_else(|| spec.effective_default());
        values.insert(spec.name.clone(), value);
    }
    Ok(ValidatedArgs { values })
}

fn check_value(spec: &ParameterSpec, value: &Value) -> Result<(), ValidationFailure> {
    if !value_conforms(spec.param_type, value) {
        return Err(ValidationFailure::new(&spec.name, REASON_TYPE));
    }

    let length = match (spec.param_type, value) {
        (ParamType::String, Value::String(s)) => Some(s.chars().count()),
        (ParamType::StringList, Value::Array(items)) => Some(items.len()),
        _ => None,
    };
    if let Some(length) = length {
        if spec.constraints.min_length.is_some_and(|min| length < min)
            || spec.constraints.max_length.is_some_and(|max| length > max)
        {
            return Err(ValidationFailure::new(&spec.name, REASON_BOUNDS));
        }
    }

    if let (Some(regex), Value::String(s)) = (&spec.compiled_pattern, value) {
        if !regex.is_match(s) {
            return Err(ValidationFailure::new(&spec.name, REASON_PATTERN));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CapabilityDescriptor, FnHandler, ParameterSpec};
    use serde_json::json;

    fn quote_tool() -> CapabilityDescriptor {
        CapabilityDescriptor::tool("get_stock_price")
            .summary("Fetch current stock price for a single symbol")
            .param(ParameterSpec::string("symbol").length(1, 10))
            .param(ParameterSpec::string("currency").default_value(json!("USD")))
            .handler(FnHandler::new(|_args| Box::pin(async { Ok(Value::Null) })))
            .build()
            .unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_valid_args_pass_and_defaults_apply() {
        let validated = validate(&quote_tool(), &args(json!({"symbol": "AAPL"}))).unwrap();
        assert_eq!(validated.str("symbol"), "AAPL");
        assert_eq!(validated.str("currency"), "USD");
    }

    #[test]
    fn test_missing_required_names_the_field() {
        let failure = validate(&quote_tool(), &args(json!({}))).unwrap_err();
        assert_eq!(failure.field, "symbol");
        assert_eq!(failure.reason, REASON_MISSING);
    }

    #[test]
    fn test_type_mismatch() {
        let failure = validate(&quote_tool(), &args(json!({"symbol": 42}))).unwrap_err();
        assert_eq!(failure.field, "symbol");
        assert_eq!(failure.reason, REASON_TYPE);
    }

    #[test]
    fn test_length_out_of_bounds() {
        let failure =
            validate(&quote_tool(), &args(json!({"symbol": "ZZZZZZZZZZZ"}))).unwrap_err();
        assert_eq!(failure.field, "symbol");
        assert_eq!(failure.reason, REASON_BOUNDS);

        let failure = validate(&quote_tool(), &args(json!({"symbol": ""}))).unwrap_err();
        assert_eq!(failure.reason, REASON_BOUNDS);
    }

    #[test]
    fn test_unknown_fields_ignored_and_dropped() {
        let validated = validate(
            &quote_tool(),
            &args(json!({"symbol": "AAPL", "trace_id": "abc-123"})),
        )
        .unwrap();
        assert!(validated.get("trace_id").is_none());
    }

    #[test]
    fn test_list_bounds() {
        let batch = CapabilityDescriptor::tool("get_multiple_stock_prices")
            .param(ParameterSpec::string_list("symbols").length(1, 3))
            .handler(FnHandler::new(|_args| Box::pin(async { Ok(Value::Null) })))
            .build()
            .unwrap();

        let ok = validate(&batch, &args(json!({"symbols": ["AAPL", "MSFT"]}))).unwrap();
        assert_eq!(ok.str_list("symbols"), vec!["AAPL", "MSFT"]);

        let failure = validate(&batch, &args(json!({"symbols": []}))).unwrap_err();
        assert_eq!(failure.reason, REASON_BOUNDS);

        let failure =
            validate(&batch, &args(json!({"symbols": ["A", "B", "C", "D"]}))).unwrap_err();
        assert_eq!(failure.reason, REASON_BOUNDS);

        let failure = validate(&batch, &args(json!({"symbols": ["A", 2]}))).unwrap_err();
        assert_eq!(failure.reason, REASON_TYPE);
    }

    #[test]
    fn test_pattern_mismatch() {
        let tool = CapabilityDescriptor::tool("lookup")
            .param(ParameterSpec::string("symbol").pattern("^[A-Z.^]+$"))
            .handler(FnHandler::new(|_args| Box::pin(async { Ok(Value::Null) })))
            .build()
            .unwrap();

        assert!(validate(&tool, &args(json!({"symbol": "AAPL"}))).is_ok());
        let failure = validate(&tool, &args(json!({"symbol": "aapl"}))).unwrap_err();
        assert_eq!(failure.reason, REASON_PATTERN);
    }

    #[test]
    fn test_optional_without_default_becomes_null() {
        let tool = CapabilityDescriptor::tool("t")
            .param(ParameterSpec::string("note").optional())
            .handler(FnHandler::new(|_args| Box::pin(async { Ok(Value::Null) })))
            .build()
            .unwrap();

        let validated = validate(&tool, &args(json!({}))).unwrap();
        assert_eq!(validated.get("note"), Some(&Value::Null));
    }
}
