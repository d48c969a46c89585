//! The closed transactions schema and its validator.

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{Value, json};

/// Fields every transaction must carry, and the only ones it may carry.
pub const TRANSACTION_FIELDS: [&str; 6] = ["date", "type", "stock_name", "amount", "price", "currency"];

/// JSON Schema for `{ "transactions": [Transaction] }`. Additional
/// properties are forbidden at both levels.
pub fn transactions_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "transactions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "date": { "type": "string" },
                        "type": { "type": "string" },
                        "stock_name": { "type": "string" },
                        "amount": { "type": "number" },
                        "price": { "type": "number" },
                        "currency": { "type": "string" }
                    },
                    "required": TRANSACTION_FIELDS,
                    "additionalProperties": false
                }
            }
        },
        "required": ["transactions"],
        "additionalProperties": false
    })
}

static VALIDATOR: Lazy<Result<Validator, String>> =
    Lazy::new(|| Validator::new(&transactions_schema()).map_err(|e| e.to_string()));

/// Validate `instance` against [`transactions_schema`], collecting every
/// violation rather than stopping at the first.
pub fn validate_transactions(instance: &Value) -> Result<(), Vec<String>> {
    let validator = match VALIDATOR.as_ref() {
        Ok(v) => v,
        Err(e) => return Err(vec![format!("Schema compilation error: {e}")]),
    };
    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|error| format!("At path '{}': {}", error.instance_path, error))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade() -> Value {
        json!({
            "date": "2024-01-05",
            "type": "Buy",
            "stock_name": "ACME",
            "amount": 10,
            "price": 25.5,
            "currency": "USD"
        })
    }

    #[test]
    fn accepts_valid_and_empty() {
        assert!(validate_transactions(&json!({"transactions": [trade()]})).is_ok());
        assert!(validate_transactions(&json!({"transactions": []})).is_ok());
    }

    #[test]
    fn missing_amount_is_named() {
        let mut t = trade();
        t.as_object_mut().unwrap().remove("amount");
        let violations = validate_transactions(&json!({"transactions": [t]})).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("amount"));
        assert!(violations[0].starts_with("At path '/transactions/0'"));
    }

    #[test]
    fn extra_fields_rejected_at_both_levels() {
        let mut t = trade();
        t["fee"] = json!(1.0);
        let violations =
            validate_transactions(&json!({"transactions": [t], "total": 1})).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| v.contains("fee")));
        assert!(violations.iter().any(|v| v.contains("total")));
    }

    #[test]
    fn collects_every_violation() {
        let bad = json!({
            "transactions": [
                {"date": 20240105, "type": "Buy", "stock_name": "ACME", "amount": "ten", "price": 25.5, "currency": "USD"}
            ]
        });
        let violations = validate_transactions(&bad).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn transactions_key_required() {
        let violations = validate_transactions(&json!({})).unwrap_err();
        assert!(violations[0].contains("transactions"));
    }

    #[test]
    fn non_object_rejected() {
        assert!(validate_transactions(&json!([trade()])).is_err());
    }
}
