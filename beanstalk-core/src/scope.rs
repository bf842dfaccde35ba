use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;

use crate::bean::BeanRef;
use crate::error::ContainerResult;

pub const SCOPE_SINGLETON: &str = "singleton";
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// Lifetime policy of a bean
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One instance per container, shared by every resolution
    #[default]
    Singleton,

    /// A fresh instance per resolution, never cached
    Prototype,

    /// A scope backed by a [`ScopePolicy`] registered on the builder under this name
    Custom(String),
}

impl Scope {
    pub fn custom(name: impl Into<String>) -> Self {
        Scope::Custom(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Scope::Singleton => SCOPE_SINGLETON,
            Scope::Prototype => SCOPE_PROTOTYPE,
            Scope::Custom(name) => name,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            SCOPE_SINGLETON => Scope::Singleton,
            SCOPE_PROTOTYPE => Scope::Prototype,
            other => Scope::Custom(other.to_string()),
        })
    }
}

/// Storage strategy for a custom scope.
///
/// The container asks the policy for an instance and passes `create` along;
/// the policy either returns something it already holds or calls `create`
/// and decides whether to keep the result. How the bean is built is never the
/// policy's business.
pub trait ScopePolicy: Send + Sync {
    fn get(
        &self,
        name: &str,
        create: &mut dyn FnMut() -> ContainerResult<BeanRef>,
    ) -> ContainerResult<BeanRef>;
}

/// Shares one instance per bean until [`RequestScope::reset`] is called.
///
/// Models a per-logical-request lifetime: call `reset` when the request ends
/// and the next resolution builds a fresh instance.
#[derive(Default)]
pub struct RequestScope {
    instances: Mutex<HashMap<String, BeanRef>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the current request, discarding every instance held so far
    pub fn reset(&self) {
        let dropped = std::mem::take(&mut *self.instances.lock());
        tracing::debug!("Request scope reset, discarded {} instance(s)", dropped.len());
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl ScopePolicy for RequestScope {
    fn get(
        &self,
        name: &str,
        create: &mut dyn FnMut() -> ContainerResult<BeanRef>,
    ) -> ContainerResult<BeanRef> {
        if let Some(bean) = self.instances.lock().get(name) {
            return Ok(BeanRef::clone(bean));
        }

        // `create` may resolve other request-scoped beans, so the lock is not
        // held while it runs. First insert wins.
        let bean = create()?;
        let mut instances = self.instances.lock();
        Ok(BeanRef::clone(
            instances.entry(name.to_string()).or_insert(bean),
        ))
    }
}
