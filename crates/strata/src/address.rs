//! Canonical node identity.
//!
//! An [`Address`] is `(base, name, attr?)`. Equality, hashing, and ordering
//! are defined over `(base, name)` only — `attr` is a projection applied
//! after resolution, not part of the node's identity. Two addresses that
//! differ only in `attr` name the same graph node.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    base: String,
    name: String,
    attr: Option<String>,
}

impl Address {
    /// Constructs an address directly, validating `name`.
    pub fn new(base: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            base: base.into(),
            name,
            attr: None,
        })
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        let attr = attr.into();
        self.attr = if attr.is_empty() { None } else { Some(attr) };
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// The same node identity with any attribute projection stripped.
    pub fn without_attr(&self) -> Address {
        Address {
            base: self.base.clone(),
            name: self.name.clone(),
            attr: None,
        }
    }

    /// Parses a relative (`:name[#attr]`) or absolute (`//base:name[#attr]`)
    /// address string. `from_base` supplies the base for relative forms.
    pub fn parse(from_base: &str, s: &str) -> Result<Self> {
        let (main, attr) = match s.split_once('#') {
            Some((main, attr)) if !attr.is_empty() => (main, Some(attr.to_string())),
            Some((main, _)) => (main, None),
            None => (s, None),
        };

        let (base, name) = if let Some(rest) = main.strip_prefix("//") {
            match rest.rsplit_once(':') {
                Some((base, name)) => (base.to_string(), name.to_string()),
                None => return Err(StrataError::InvalidAddress(s.to_string())),
            }
        } else if let Some(rest) = main.strip_prefix(':') {
            (from_base.to_string(), rest.to_string())
        } else {
            return Err(StrataError::InvalidAddress(s.to_string()));
        };

        validate_name(&name).map_err(|_| StrataError::InvalidAddress(s.to_string()))?;

        Ok(Self { base, name, attr })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.clone().all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => false,
    };

    if !valid || name.ends_with('-') {
        return Err(StrataError::InvalidAddress(name.to_string()));
    }

    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.base, self.name)?;
        if let Some(attr) = &self.attr {
            write!(f, "#{attr}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Address {
    type Error = StrataError;

    fn try_from(value: String) -> Result<Self> {
        Address::parse("", &value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> String {
        addr.to_string()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.name == other.name
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.name.hash(state);
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.base, &self.name).cmp(&(&other.base, &other.name))
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
