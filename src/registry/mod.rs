// Resource registry: immutable table of descriptors keyed by id, built once at startup.

pub mod catalog;
pub mod descriptor;

use std::collections::{BTreeMap, HashSet};

use crate::config::LoaderConfig;
use crate::error::{LoadError, RegistryError};
use descriptor::ResourceDescriptor;

#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: BTreeMap<String, ResourceDescriptor>,
}

impl Registry {
    /// Build and validate a registry.
    ///
    /// Dependencies must name registered resources and must not form a
    /// cycle: a cyclic chain would have each load wait on the other forever.
    pub fn new(
        descriptors: impl IntoIterator<Item = ResourceDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for descriptor in descriptors {
            if descriptor.locations.is_empty() {
                return Err(RegistryError::NoLocations(descriptor.id));
            }
            if map.contains_key(&descriptor.id) {
                return Err(RegistryError::DuplicateId(descriptor.id));
            }
            map.insert(descriptor.id.clone(), descriptor);
        }

        for descriptor in map.values() {
            if let Some(dep) = &descriptor.dependency {
                if !map.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        resource: descriptor.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        for id in map.keys() {
            let mut seen = HashSet::new();
            let mut cursor = Some(id.as_str());
            while let Some(current) = cursor {
                if !seen.insert(current) {
                    return Err(RegistryError::DependencyCycle(id.clone()));
                }
                cursor = map.get(current).and_then(|d| d.dependency.as_deref());
            }
        }

        Ok(Self { descriptors: map })
    }

    pub fn descriptor_for(&self, id: &str) -> Result<&ResourceDescriptor, LoadError> {
        self.descriptors
            .get(id)
            .ok_or_else(|| LoadError::UnknownResource(id.to_string()))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Apply location overrides and the base URL from `config`.
    pub fn with_config(mut self, config: &LoaderConfig) -> Self {
        for descriptor in self.descriptors.values_mut() {
            if let Some(mirror) = config.location_overrides.get(&descriptor.id) {
                if !mirror.is_empty() {
                    descriptor.locations = mirror.clone();
                }
            }
            descriptor.locations = descriptor
                .locations
                .iter()
                .map(|loc| config.resolve_location(loc))
                .collect();
        }
        self
    }
}
