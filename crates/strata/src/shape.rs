//! Dependency shapes.
//!
//! A spec's statically-declared field types are mirrored, with addresses
//! in place of concrete values, as a [`Shape`] tree. This replaces the
//! runtime field-type introspection a dynamically typed host would use:
//! each spec kind builds its own `dependencies()` map by hand, and the
//! compound cases here (`Map`/`Seq`/`Set`/`Record`) give it the vocabulary
//! to describe compound fields without reflection.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::address::Address;

#[derive(Debug, Clone)]
pub enum Shape {
    Addr(Address),
    Map(BTreeMap<String, Shape>),
    Seq(Vec<Shape>),
    Set(Vec<Shape>),
    Record(BTreeMap<String, Shape>),
    Inline(Value),
}

impl Shape {
    pub fn addr(addr: Address) -> Shape {
        Shape::Addr(addr)
    }

    pub fn inline(value: impl Into<Value>) -> Shape {
        Shape::Inline(value.into())
    }
}

/// Collects every `Address` leaf reachable from a shape, without
/// attempting resolution. Used by the planner to test dependency
/// *presence* against the results map without triggering attribute
/// projection against placeholder values.
pub fn leaf_addresses(shape: &Shape, out: &mut Vec<Address>) {
    match shape {
        Shape::Addr(addr) => out.push(addr.clone()),
        Shape::Map(m) | Shape::Record(m) => {
            for v in m.values() {
                leaf_addresses(v, out);
            }
        }
        Shape::Seq(items) | Shape::Set(items) => {
            for v in items {
                leaf_addresses(v, out);
            }
        }
        Shape::Inline(_) => {}
    }
}

/// Collects every leaf address across a whole `dependencies()` map.
pub fn leaf_addresses_map(deps: &BTreeMap<String, Shape>) -> Vec<Address> {
    let mut out = Vec::new();
    for shape in deps.values() {
        leaf_addresses(shape, &mut out);
    }
    out
}
