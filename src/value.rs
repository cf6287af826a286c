//! typed row materialization: converts JSON-decoded values into native
//! values driven by a server-provided [TypeSignature].

use base64::Engine;
use indexmap::IndexMap;

use crate::{
    error::ValueCoercionError,
    type_signature::{TypeSignature, TypeSignatureParameter},
};

/// a fixed, typed value produced from a JSON payload and its column's type
/// signature.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(IndexMap<Value, Value>),
    /// `row` values keep field order, hence an insertion-ordered map.
    Row(IndexMap<String, Value>),
}

// `Value` is used as both a map key (for `map` types, which may themselves be
// keyed by any fixed value) and a map value, so it must be totally ordered and
// hashable. floats are compared by bit pattern; this is adequate for a value
// fixer that never averages or otherwise arithmetically combines values.
impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::I64(n) => n.hash(state),
            Value::F64(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Array(a) => a.hash(state),
            Value::Map(m) => {
                for (k, v) in m {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Row(r) => {
                for (k, v) in r {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

/// fix a JSON-decoded value using the supplied type signature. nulls pass
/// through for any signature.
pub fn fix(sig: &TypeSignature, value: &serde_json::Value) -> Result<Value, ValueCoercionError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match sig.base() {
        "array" => fix_array(sig, value),
        "map" => fix_map(sig, value),
        "row" => fix_row(sig, value),
        "bigint" => fix_int(sig, value, i64::MIN, i64::MAX).map(Value::I64),
        "integer" => fix_int(sig, value, i32::MIN as i64, i32::MAX as i64).map(Value::I64),
        "smallint" => fix_int(sig, value, i16::MIN as i64, i16::MAX as i64).map(Value::I64),
        "tinyint" => fix_int(sig, value, i8::MIN as i64, i8::MAX as i64).map(Value::I64),
        "double" | "real" => fix_float(sig, value).map(Value::F64),
        "boolean" => fix_bool(sig, value).map(Value::Bool),
        "varchar" | "char" | "json" | "time" | "time with time zone" | "timestamp"
        | "timestamp with time zone" | "date" | "interval year to month" | "interval day to second"
        | "decimal" => fix_string(sig, value).map(Value::Str),
        _ => fix_unknown(sig, value),
    }
}

fn mismatch(sig: &TypeSignature, value: &serde_json::Value) -> ValueCoercionError {
    ValueCoercionError::new(sig.clone(), value)
}

fn fix_array(sig: &TypeSignature, value: &serde_json::Value) -> Result<Value, ValueCoercionError> {
    let elem_sig = match sig.params().first() {
        Some(TypeSignatureParameter::Type(t)) => t,
        _ => return Err(mismatch(sig, value)),
    };
    let arr = value.as_array().ok_or_else(|| mismatch(sig, value))?;
    let mut out = Vec::with_capacity(arr.len());
    for v in arr {
        out.push(fix(elem_sig, v)?);
    }
    Ok(Value::Array(out))
}

fn fix_map(sig: &TypeSignature, value: &serde_json::Value) -> Result<Value, ValueCoercionError> {
    let (key_sig, val_sig) = match sig.params() {
        [TypeSignatureParameter::Type(k), TypeSignatureParameter::Type(v)] => (k, v),
        _ => return Err(mismatch(sig, value)),
    };
    let obj = value.as_object().ok_or_else(|| mismatch(sig, value))?;
    let mut out = IndexMap::with_capacity(obj.len());
    for (k, v) in obj {
        // presto always sends map keys as JSON object keys (strings), regardless
        // of the declared key type, so fix against a string JSON value.
        let key = fix(key_sig, &serde_json::Value::String(k.clone()))?;
        out.insert(key, fix(val_sig, v)?);
    }
    Ok(Value::Map(out))
}

fn fix_row(sig: &TypeSignature, value: &serde_json::Value) -> Result<Value, ValueCoercionError> {
    let fields: Vec<(&str, &TypeSignature)> = sig
        .params()
        .iter()
        .filter_map(|p| match p {
            TypeSignatureParameter::NamedType { name, ty } => Some((name.as_str(), ty)),
            _ => None,
        })
        .collect();
    let arr = value.as_array().ok_or_else(|| mismatch(sig, value))?;
    if arr.len() != fields.len() {
        return Err(mismatch(sig, value));
    }
    let mut out = IndexMap::with_capacity(fields.len());
    for ((name, field_sig), v) in fields.into_iter().zip(arr) {
        out.insert(name.to_string(), fix(field_sig, v)?);
    }
    Ok(Value::Row(out))
}

fn fix_int(sig: &TypeSignature, value: &serde_json::Value, min: i64, max: i64) -> Result<i64, ValueCoercionError> {
    let n = if let Some(s) = value.as_str() {
        s.parse::<i64>().map_err(|_| mismatch(sig, value))?
    } else {
        value.as_i64().ok_or_else(|| mismatch(sig, value))?
    };
    if n < min || n > max {
        return Err(mismatch(sig, value));
    }
    Ok(n)
}

fn fix_float(sig: &TypeSignature, value: &serde_json::Value) -> Result<f64, ValueCoercionError> {
    if let Some(s) = value.as_str() {
        s.parse::<f64>().map_err(|_| mismatch(sig, value))
    } else {
        value.as_f64().ok_or_else(|| mismatch(sig, value))
    }
}

fn fix_bool(sig: &TypeSignature, value: &serde_json::Value) -> Result<bool, ValueCoercionError> {
    if let Some(s) = value.as_str() {
        match s.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(mismatch(sig, value)),
        }
    } else {
        value.as_bool().ok_or_else(|| mismatch(sig, value))
    }
}

fn fix_string(sig: &TypeSignature, value: &serde_json::Value) -> Result<String, ValueCoercionError> {
    value.as_str().map(str::to_owned).ok_or_else(|| mismatch(sig, value))
}

fn fix_unknown(sig: &TypeSignature, value: &serde_json::Value) -> Result<Value, ValueCoercionError> {
    match value.as_str() {
        Some(s) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .map(Value::Bytes)
            .map_err(|_| mismatch(sig, value)),
        None => Ok(json_passthrough(value)),
    }
}

/// best-effort conversion for values whose base type carries no fixing rule
/// and whose JSON shape wasn't a string (so base64 decoding doesn't apply).
fn json_passthrough(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::I64)
            .or_else(|| n.as_f64().map(Value::F64))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(a) => Value::Array(a.iter().map(json_passthrough).collect()),
        serde_json::Value::Object(o) => {
            let mut map = IndexMap::with_capacity(o.len());
            for (k, v) in o {
                map.insert(Value::Str(k.clone()), json_passthrough(v));
            }
            Value::Map(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_signature::TypeSignature;

    #[test]
    fn fixes_bigint_from_number_and_string() {
        let sig = TypeSignature::parse("bigint").unwrap();
        assert_eq!(fix(&sig, &serde_json::json!(7)).unwrap(), Value::I64(7));
        assert_eq!(fix(&sig, &serde_json::json!("7")).unwrap(), Value::I64(7));
    }

    #[test]
    fn bigint_overflow_of_narrower_width_fails() {
        let sig = TypeSignature::parse("tinyint").unwrap();
        assert!(fix(&sig, &serde_json::json!(200)).is_err());
    }

    #[test]
    fn fixes_boolean_case_insensitive_string() {
        let sig = TypeSignature::parse("boolean").unwrap();
        assert_eq!(fix(&sig, &serde_json::json!("TRUE")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn keeps_varchar_as_string_and_rejects_non_string() {
        let sig = TypeSignature::parse("varchar").unwrap();
        assert_eq!(fix(&sig, &serde_json::json!("hi")).unwrap(), Value::Str("hi".into()));
        assert!(fix(&sig, &serde_json::json!(1)).is_err());
    }

    #[test]
    fn fixes_nested_array_of_map() {
        let sig = TypeSignature::parse("array(map(varchar,bigint))").unwrap();
        let v = serde_json::json!([{"a": 1}, {"b": 2}]);
        let fixed = fix(&sig, &v).unwrap();
        match fixed {
            Value::Array(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn fixes_row_preserving_field_order() {
        let sig = TypeSignature::parse(r#"row("a" bigint,"b" array(varchar))"#).unwrap();
        let v = serde_json::json!([7, ["x", "y"]]);
        let fixed = fix(&sig, &v).unwrap();
        match fixed {
            Value::Row(map) => {
                let keys: Vec<_> = map.keys().cloned().collect();
                assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(map["a"], Value::I64(7));
                assert_eq!(
                    map["b"],
                    Value::Array(vec![Value::Str("x".into()), Value::Str("y".into())])
                );
            }
            _ => panic!("expected row"),
        }
    }

    #[test]
    fn null_passes_through_any_signature() {
        let sig = TypeSignature::parse(r#"row("a" bigint)"#).unwrap();
        assert_eq!(fix(&sig, &serde_json::Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn unknown_base_base64_decodes_string_values() {
        let sig = TypeSignature::parse("ipaddress").unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
        let fixed = fix(&sig, &serde_json::Value::String(encoded)).unwrap();
        assert_eq!(fixed, Value::Bytes(vec![1, 2, 3, 4]));
    }

    #[test]
    fn value_fixer_is_idempotent_on_varchar_strings() {
        let sig = TypeSignature::parse("varchar").unwrap();
        let once = fix(&sig, &serde_json::json!("abc")).unwrap();
        let Value::Str(s) = &once else { panic!("expected string") };
        let twice = fix(&sig, &serde_json::Value::String(s.clone())).unwrap();
        assert_eq!(once, twice);
    }
}
