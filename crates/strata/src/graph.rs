//! Strategy graph builder.
//!
//! Accepts registrations (from a deploy-file loader or a test harness),
//! maintains the address-keyed spec registry, and exposes the accessors
//! the planner and executor need: per-kind iteration and the
//! `dependencies()`/`after()` lookups that make up the dependency graph.

use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::{Result, StrataError};
use crate::shape::Shape;
use crate::spec::{ArtifactSpec, CheckSpec, ResourceSpec, Spec, StepSpec};

#[derive(Default)]
pub struct Strategy {
    specs: BTreeMap<Address, Spec>,
}

impl Strategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_artifact(&mut self, base: &str, spec: impl ArtifactSpec + 'static) -> Result<Address> {
        self.register(base, Spec::Artifact(Box::new(spec)))
    }

    pub fn register_resource(&mut self, base: &str, spec: impl ResourceSpec + 'static) -> Result<Address> {
        self.register(base, Spec::Resource(Box::new(spec)))
    }

    pub fn register_step(&mut self, base: &str, spec: impl StepSpec + 'static) -> Result<Address> {
        self.register(base, Spec::Step(Box::new(spec)))
    }

    pub fn register_check(&mut self, base: &str, spec: impl CheckSpec + 'static) -> Result<Address> {
        self.register(base, Spec::Check(Box::new(spec)))
    }

    fn register(&mut self, base: &str, spec: Spec) -> Result<Address> {
        let addr = Address::new(base, spec.name())?;
        if self.specs.contains_key(&addr) {
            return Err(StrataError::DuplicateAddress(addr));
        }
        self.specs.insert(addr.clone(), spec);
        Ok(addr)
    }

    pub fn specs(&self) -> &BTreeMap<Address, Spec> {
        &self.specs
    }

    pub fn artifacts(&self) -> impl Iterator<Item = (&Address, &dyn ArtifactSpec)> {
        self.specs.iter().filter_map(|(a, s)| s.as_artifact().map(|s| (a, s)))
    }

    pub fn resources(&self) -> impl Iterator<Item = (&Address, &dyn ResourceSpec)> {
        self.specs.iter().filter_map(|(a, s)| s.as_resource().map(|s| (a, s)))
    }

    pub fn steps(&self) -> impl Iterator<Item = (&Address, &dyn StepSpec)> {
        self.specs.iter().filter_map(|(a, s)| s.as_step().map(|s| (a, s)))
    }

    pub fn checks(&self) -> impl Iterator<Item = (&Address, &dyn CheckSpec)> {
        self.specs.iter().filter_map(|(a, s)| s.as_check().map(|s| (a, s)))
    }

    pub fn after(&self, addr: &Address) -> &[Address] {
        self.specs.get(addr).map(Spec::after).unwrap_or(&[])
    }

    pub fn dependencies(&self, addr: &Address) -> BTreeMap<String, Shape> {
        self.specs.get(addr).map(Spec::dependencies).unwrap_or_default()
    }
}
