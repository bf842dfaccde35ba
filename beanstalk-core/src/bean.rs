use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{ContainerError, ContainerResult};
use crate::Scope;

/// A resolved bean instance. Identity is pointer identity (`Arc::ptr_eq`).
pub type BeanRef = Arc<dyn Any + Send + Sync>;

/// Reference from one definition to another, by bean name or by target type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyRef {
    ByName(String),
    ByType {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl DependencyRef {
    pub fn name(name: impl Into<String>) -> Self {
        DependencyRef::ByName(name.into())
    }

    pub fn of_type<T: Any + Send + Sync>() -> Self {
        DependencyRef::ByType {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyRef::ByName(name) => write!(f, "'{}'", name),
            DependencyRef::ByType { type_name, .. } => write!(f, "<{}>", type_name),
        }
    }
}

impl From<&str> for DependencyRef {
    fn from(name: &str) -> Self {
        DependencyRef::ByName(name.to_string())
    }
}

impl From<String> for DependencyRef {
    fn from(name: String) -> Self {
        DependencyRef::ByName(name)
    }
}

/// Constructor arguments handed to a factory, in declaration order
pub struct ConstructorArgs {
    bean: String,
    args: Vec<(DependencyRef, BeanRef)>,
}

impl ConstructorArgs {
    pub(crate) fn new(bean: impl Into<String>, args: Vec<(DependencyRef, BeanRef)>) -> Self {
        Self {
            bean: bean.into(),
            args,
        }
    }

    /// Typed access to the argument at `index`
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> ContainerResult<Arc<T>> {
        let (dependency, bean) = self.args.get(index).ok_or_else(|| {
            ContainerError::Other(anyhow::anyhow!(
                "bean '{}' declares {} constructor argument(s), index {} is out of range",
                self.bean,
                self.args.len(),
                index
            ))
        })?;

        Arc::clone(bean)
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: dependency.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Builds bean instances from resolved constructor arguments
pub trait ObjectFactory: Send + Sync {
    fn create(&self, args: &ConstructorArgs) -> ContainerResult<Box<dyn Any + Send + Sync>>;

    /// Type tag of the instances this factory produces. Named apart from
    /// `Any::type_id`, which would otherwise win method lookup on a
    /// `Box<dyn ObjectFactory>`.
    fn target_type_id(&self) -> TypeId;

    fn target_type_name(&self) -> &'static str;
}

/// Closure-backed factory
pub struct FunctionFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&ConstructorArgs) -> ContainerResult<T> + Send + Sync,
{
    factory_fn: F,
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T, F> FunctionFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&ConstructorArgs) -> ContainerResult<T> + Send + Sync,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T, F> ObjectFactory for FunctionFactory<T, F>
where
    T: Any + Send + Sync,
    F: Fn(&ConstructorArgs) -> ContainerResult<T> + Send + Sync,
{
    fn create(&self, args: &ConstructorArgs) -> ContainerResult<Box<dyn Any + Send + Sync>> {
        let instance = (self.factory_fn)(args)?;
        Ok(Box::new(instance))
    }

    fn target_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn target_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Setter applied to a freshly constructed bean
pub type SetterFn = Box<dyn Fn(&mut dyn Any, BeanRef) -> ContainerResult<()> + Send + Sync>;

/// Lifecycle callbacks, run on the concrete bean type
pub type InitCallback = Box<dyn Fn(&mut dyn Any) -> ContainerResult<()> + Send + Sync>;
pub type DestroyCallback = Box<dyn Fn(&dyn Any) -> ContainerResult<()> + Send + Sync>;

/// One post-construction injection: which bean to resolve and where to put it
pub struct SetterInjection {
    pub dependency: DependencyRef,
    pub(crate) apply: SetterFn,
}

impl fmt::Debug for SetterInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterInjection")
            .field("dependency", &self.dependency)
            .finish()
    }
}

/// Recipe for one bean: how to build it, what it depends on, and its scope
pub struct BeanDefinition {
    pub(crate) name: String,

    pub(crate) scope: Scope,

    pub(crate) factory: Box<dyn ObjectFactory>,

    /// Skipped by eager initialisation. Only meaningful for singletons.
    pub(crate) lazy: bool,

    /// Resolved in order and passed to the factory
    pub(crate) constructor_args: Vec<DependencyRef>,

    /// Applied in order after construction
    pub(crate) setters: Vec<SetterInjection>,

    /// Runs after setter injection
    pub(crate) init_callback: Option<InitCallback>,

    /// Runs at container shutdown, singletons only
    pub(crate) destroy_callback: Option<DestroyCallback>,
}

impl BeanDefinition {
    /// Creates a definition whose factory receives the resolved constructor
    /// arguments. The target type is the factory's return type.
    pub fn new<T, F>(name: impl Into<String>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&ConstructorArgs) -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::from_factory(name, FunctionFactory::new(factory))
    }

    /// Creates a definition from a zero-argument factory
    pub fn supplier<T, F>(name: impl Into<String>, supplier: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        Self::new(name, move |_: &ConstructorArgs| supplier())
    }

    pub fn from_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: ObjectFactory + 'static,
    {
        Self {
            name: name.into(),
            scope: Scope::default(),
            factory: Box::new(factory),
            lazy: false,
            constructor_args: Vec::new(),
            setters: Vec::new(),
            init_callback: None,
            destroy_callback: None,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Appends a constructor argument
    pub fn with_constructor_arg(mut self, dependency: impl Into<DependencyRef>) -> Self {
        self.constructor_args.push(dependency.into());
        self
    }

    /// Appends constructor arguments referring to beans by name
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constructor_args
            .extend(names.into_iter().map(|name| DependencyRef::ByName(name.into())));
        self
    }

    /// Appends a setter injection. `setter` receives the bean under
    /// construction and the resolved dependency.
    pub fn with_setter<T, D, F>(mut self, dependency: impl Into<DependencyRef>, setter: F) -> Self
    where
        T: Any,
        D: Any + Send + Sync,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        let dependency = dependency.into();
        let target_name = self.name.clone();
        let dependency_label = dependency.to_string();

        let apply: SetterFn = Box::new(move |target: &mut dyn Any, bean: BeanRef| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| ContainerError::TypeMismatch {
                    name: target_name.clone(),
                    expected: std::any::type_name::<T>().to_string(),
                })?;
            let bean = bean
                .downcast::<D>()
                .map_err(|_| ContainerError::TypeMismatch {
                    name: dependency_label.clone(),
                    expected: std::any::type_name::<D>().to_string(),
                })?;
            setter(target, bean);
            Ok(())
        });

        self.setters.push(SetterInjection { dependency, apply });
        self
    }

    /// Sets the init callback
    pub fn with_init<T, F>(mut self, init_fn: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.init_callback = Some(Box::new(move |bean: &mut dyn Any| {
            let bean = bean
                .downcast_mut::<T>()
                .ok_or_else(|| ContainerError::TypeMismatch {
                    name: name.clone(),
                    expected: std::any::type_name::<T>().to_string(),
                })?;
            init_fn(bean)
        }));
        self
    }

    /// Sets the destroy callback
    pub fn with_destroy<T, F>(mut self, destroy_fn: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> ContainerResult<()> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        self.destroy_callback = Some(Box::new(move |bean: &dyn Any| {
            let bean = bean
                .downcast_ref::<T>()
                .ok_or_else(|| ContainerError::TypeMismatch {
                    name: name.clone(),
                    expected: std::any::type_name::<T>().to_string(),
                })?;
            destroy_fn(bean)
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn target_type_id(&self) -> TypeId {
        self.factory.target_type_id()
    }

    pub fn target_type_name(&self) -> &'static str {
        self.factory.target_type_name()
    }

    pub fn constructor_args(&self) -> &[DependencyRef] {
        &self.constructor_args
    }

    pub fn setters(&self) -> &[SetterInjection] {
        &self.setters
    }

    /// Every dependency reference, constructor arguments first
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyRef> + '_ {
        self.constructor_args
            .iter()
            .chain(self.setters.iter().map(|setter| &setter.dependency))
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("lazy", &self.lazy)
            .field("constructor_args", &self.constructor_args)
            .field("setters", &self.setters)
            .field("type_name", &self.factory.target_type_name())
            .finish()
    }
}
