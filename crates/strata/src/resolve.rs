//! Address resolution: substituting every `Address` leaf in a [`Shape`]
//! with the corresponding value from a materialized results map.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::address::Address;
use crate::error::{Result, StrataError};
use crate::shape::Shape;

/// `address -> value`, populated during planning (placeholders) and
/// execution (concrete artifact/resource/step results).
pub type Results = BTreeMap<Address, Value>;

/// Recursively substitutes every address leaf in `shape` using `results`.
/// Pure: never mutates `results`. Total given a sufficient `results` map.
pub fn resolve(shape: &Shape, results: &Results) -> Result<Value> {
    match shape {
        Shape::Addr(addr) => {
            let value = results
                .get(addr)
                .ok_or_else(|| StrataError::UnresolvableAddress(addr.clone()))?;

            match addr.attr() {
                Some(path) => project_attr(addr, value, path),
                None => Ok(value.clone()),
            }
        }
        Shape::Map(m) | Shape::Record(m) => {
            let mut out = Map::new();
            for (key, child) in m {
                out.insert(key.clone(), resolve(child, results)?);
            }
            Ok(Value::Object(out))
        }
        Shape::Seq(items) | Shape::Set(items) => {
            let mut out = Vec::with_capacity(items.len());
            for child in items {
                out.push(resolve(child, results)?);
            }
            Ok(Value::Array(out))
        }
        Shape::Inline(value) => Ok(value.clone()),
    }
}

/// Resolves a whole `dependencies()` map into a single JSON object keyed
/// by field name, the shape every step/check hook receives as `deps`.
pub fn resolve_map(deps: &BTreeMap<String, Shape>, results: &Results) -> Result<Value> {
    let mut out = Map::new();
    for (field, shape) in deps {
        out.insert(field.clone(), resolve(shape, results)?);
    }
    Ok(Value::Object(out))
}

fn project_attr(addr: &Address, value: &Value, path: &str) -> Result<Value> {
    let mut cursor = value;
    for part in path.split('.') {
        cursor = match cursor {
            Value::Object(map) => map.get(part).ok_or_else(|| StrataError::InvalidAttribute {
                address: addr.clone(),
                attr: path.to_string(),
            })?,
            _ => {
                return Err(StrataError::InvalidAttribute {
                    address: addr.clone(),
                    attr: path.to_string(),
                });
            }
        };
    }
    Ok(cursor.clone())
}
