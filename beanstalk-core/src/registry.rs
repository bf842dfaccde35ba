//! Bean definition registry
//!
//! Holds the declarative recipes ahead of resolution. Definitions are kept in
//! registration order so that listings and eager initialisation are
//! deterministic.

use std::any::TypeId;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::bean::{BeanDefinition, DependencyRef};
use crate::error::{ContainerError, ContainerResult};
use crate::utils::dependency::{find_cycle, topological_sort};

#[derive(Debug, Default)]
pub struct BeanDefinitionRegistry {
    definitions: IndexMap<String, Arc<BeanDefinition>>,
}

impl BeanDefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition, rejecting a name that is already taken
    pub fn register(&mut self, definition: BeanDefinition) -> ContainerResult<()> {
        if self.definitions.contains_key(definition.name()) {
            tracing::warn!(
                "Bean '{}' already exists, registration failed",
                definition.name()
            );
            return Err(ContainerError::DuplicateName(definition.name().to_string()));
        }

        tracing::debug!(
            "Bean definition registered: name='{}', type='{}', scope={}",
            definition.name(),
            definition.target_type_name(),
            definition.scope()
        );
        self.definitions
            .insert(definition.name().to_string(), Arc::new(definition));
        Ok(())
    }

    pub fn get(&self, name: &str) -> ContainerResult<&Arc<BeanDefinition>> {
        self.definitions
            .get(name)
            .ok_or_else(|| ContainerError::UnknownBean(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered names in registration order. The iterator is cheap to
    /// clone, so it can be restarted.
    pub fn all_names(&self) -> BeanNames<'_> {
        BeanNames {
            inner: self.definitions.keys(),
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<BeanDefinition>> + '_ {
        self.definitions.values()
    }

    /// Names of every definition producing `type_id`, in registration order
    pub fn names_for_type(&self, type_id: TypeId) -> Vec<&str> {
        self.definitions
            .values()
            .filter(|definition| definition.target_type_id() == type_id)
            .map(|definition| definition.name())
            .collect()
    }

    /// Maps a dependency reference to the name of the definition it denotes
    pub fn resolve_reference<'a>(
        &'a self,
        dependency: &'a DependencyRef,
    ) -> ContainerResult<&'a str> {
        match dependency {
            DependencyRef::ByName(name) => {
                if self.contains(name) {
                    Ok(name.as_str())
                } else {
                    Err(ContainerError::UnknownBean(name.clone()))
                }
            }
            DependencyRef::ByType { type_id, type_name } => {
                match self.names_for_type(*type_id).as_slice() {
                    [] => Err(ContainerError::NoBeanOfType((*type_name).to_string())),
                    [name] => Ok(*name),
                    candidates => Err(ContainerError::AmbiguousType {
                        type_name: (*type_name).to_string(),
                        candidates: candidates.iter().map(|name| name.to_string()).collect(),
                    }),
                }
            }
        }
    }

    /// Builds the name-level dependency graph, failing on the first
    /// reference that does not denote exactly one definition
    pub fn dependency_graph(&self) -> ContainerResult<IndexMap<String, Vec<String>>> {
        self.definitions
            .values()
            .map(|definition| {
                let deps = definition
                    .dependencies()
                    .map(|dependency| {
                        self.resolve_reference(dependency).map(str::to_string).map_err(|e| {
                            tracing::debug!(
                                "Bean '{}' has an unresolvable dependency {}: {}",
                                definition.name(),
                                dependency,
                                e
                            );
                            e
                        })
                    })
                    .collect::<ContainerResult<Vec<_>>>()?;
                Ok((definition.name().to_string(), deps))
            })
            .collect()
    }

    /// Static check of every definition
    ///
    /// Reports the first dependency reference that does not resolve, then
    /// any cycle (A -> B -> C -> A).
    pub fn validate(&self) -> ContainerResult<()> {
        let graph = self.dependency_graph()?;

        if let Some(chain) = find_cycle(&graph) {
            return Err(ContainerError::CircularDependency { chain });
        }

        tracing::info!("Dependency validation passed for {} bean(s)", graph.len());
        Ok(())
    }

    /// Names ordered so every bean follows the beans it depends on
    pub fn dependency_order(&self) -> ContainerResult<Vec<String>> {
        let graph = self.dependency_graph()?;
        topological_sort(&graph).map_err(|chain| ContainerError::CircularDependency { chain })
    }
}

/// A module contributing bean definitions, the programmatic counterpart of a
/// configuration class
///
/// Implemented for any `Fn(&mut BeanDefinitionRegistry) -> ContainerResult<()>`.
pub trait Configuration {
    fn register_beans(&self, registry: &mut BeanDefinitionRegistry) -> ContainerResult<()>;
}

impl<F> Configuration for F
where
    F: Fn(&mut BeanDefinitionRegistry) -> ContainerResult<()>,
{
    fn register_beans(&self, registry: &mut BeanDefinitionRegistry) -> ContainerResult<()> {
        self(registry)
    }
}

/// Lazy, restartable iterator over registered bean names
#[derive(Clone)]
pub struct BeanNames<'a> {
    inner: indexmap::map::Keys<'a, String, Arc<BeanDefinition>>,
}

impl<'a> Iterator for BeanNames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for BeanNames<'_> {}
