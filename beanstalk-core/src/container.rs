use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};

use crate::bean::{BeanDefinition, BeanRef, ConstructorArgs, DependencyRef};
use crate::config::ContainerConfig;
use crate::error::{ContainerError, ContainerResult};
use crate::registry::{BeanDefinitionRegistry, BeanNames, Configuration};
use crate::scope::{Scope, ScopePolicy, SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::utils::dependency::ResolutionPath;
use crate::utils::naming::default_bean_name;

/// Dependency injection container
///
/// Owns the (frozen) definitions, the singleton cache and the custom scope
/// policies. Resolution is synchronous and safe to call from many threads.
pub struct Container {
    /// Frozen at build
    registry: BeanDefinitionRegistry,

    /// Singleton instances in creation order
    singletons: RwLock<IndexMap<String, BeanRef>>,

    /// Serializes first-time singleton construction. Reentrant so that a
    /// singleton's own singleton dependencies can be built on the same thread.
    creation_lock: ReentrantMutex<()>,

    /// Custom scopes by name
    scopes: HashMap<String, Arc<dyn ScopePolicy>>,

    closed: AtomicBool,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn new(
        registry: BeanDefinitionRegistry,
        scopes: HashMap<String, Arc<dyn ScopePolicy>>,
    ) -> Self {
        Self {
            registry,
            singletons: RwLock::new(IndexMap::new()),
            creation_lock: ReentrantMutex::new(()),
            scopes,
            closed: AtomicBool::new(false),
        }
    }

    pub fn resolve(&self, name: &str) -> ContainerResult<BeanRef> {
        let mut path = ResolutionPath::new();
        self.resolve_on_path(name, &mut path)
    }

    /// Resolves `name` and downcasts it to `T`
    pub fn resolve_as<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.resolve(name)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// Resolves the only bean of type `T`
    pub fn resolve_by_type<T: Any + Send + Sync>(&self) -> ContainerResult<Arc<T>> {
        let dependency = DependencyRef::of_type::<T>();
        let name = self.registry.resolve_reference(&dependency)?;
        self.resolve_as::<T>(name)
    }

    /// Every bean of type `T`, keyed by name in registration order
    pub fn resolve_all<T: Any + Send + Sync>(&self) -> ContainerResult<IndexMap<String, Arc<T>>> {
        self.registry
            .names_for_type(std::any::TypeId::of::<T>())
            .into_iter()
            .map(|name| Ok((name.to_string(), self.resolve_as::<T>(name)?)))
            .collect()
    }

    /// Builds an object the container does not manage, handing it the
    /// resolved `dependencies` in order
    pub fn inject_via_constructor<T, F>(
        &self,
        dependencies: &[DependencyRef],
        constructor: F,
    ) -> ContainerResult<T>
    where
        T: Any,
        F: FnOnce(&ConstructorArgs) -> ContainerResult<T>,
    {
        let label = std::any::type_name::<T>();
        let mut path = ResolutionPath::new();
        let args = dependencies
            .iter()
            .map(|dependency| {
                let bean = self.resolve_dependency(dependency, &mut path)?;
                Ok((dependency.clone(), bean))
            })
            .collect::<ContainerResult<Vec<_>>>()?;

        constructor(&ConstructorArgs::new(label, args))
    }

    /// Resolves `dependency` and hands it to `setter` on an existing object
    pub fn inject_via_setter<T, D, F>(
        &self,
        target: &mut T,
        dependency: impl Into<DependencyRef>,
        setter: F,
    ) -> ContainerResult<()>
    where
        D: Any + Send + Sync,
        F: FnOnce(&mut T, Arc<D>),
    {
        let dependency = dependency.into();
        let bean = self
            .resolve_dependency(&dependency, &mut ResolutionPath::new())?
            .downcast::<D>()
            .map_err(|_| ContainerError::TypeMismatch {
                name: dependency.to_string(),
                expected: std::any::type_name::<D>().to_string(),
            })?;

        setter(target, bean);
        Ok(())
    }

    /// Registered bean names in registration order
    pub fn bean_names(&self) -> BeanNames<'_> {
        self.registry.all_names()
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Whether a singleton instance for `name` has been created and cached
    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    pub fn is_singleton(&self, name: &str) -> ContainerResult<bool> {
        Ok(*self.registry.get(name)?.scope() == Scope::Singleton)
    }

    pub fn is_prototype(&self, name: &str) -> ContainerResult<bool> {
        Ok(*self.registry.get(name)?.scope() == Scope::Prototype)
    }

    pub fn registry(&self) -> &BeanDefinitionRegistry {
        &self.registry
    }

    /// Static check of the whole graph, see [`BeanDefinitionRegistry::validate`]
    pub fn validate_dependencies(&self) -> ContainerResult<()> {
        self.registry.validate()
    }

    /// Builds every non-lazy singleton, in registration order
    pub fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names: Vec<&str> = self
            .registry
            .definitions()
            .filter(|definition| *definition.scope() == Scope::Singleton && !definition.is_lazy())
            .map(|definition| definition.name())
            .collect();

        tracing::debug!("Pre-instantiating {} singleton bean(s)", names.len());
        for name in names {
            self.resolve(name)?;
        }
        Ok(())
    }

    /// Runs the destroy callbacks of every cached singleton
    ///
    /// Dependents are destroyed before their dependencies. Runs once; later
    /// calls are no-ops. Every destroy callback runs even if an earlier one
    /// failed, and the first failure is returned. Resolution fails with
    /// [`ContainerError::Closed`] from here on.
    pub fn shutdown(&self) -> ContainerResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        tracing::info!("Destroying singleton beans");
        let singletons: Vec<(String, BeanRef)> = {
            // Waits out any singleton still being built
            let _creating = self.creation_lock.lock();
            self.singletons.write().drain(..).collect()
        };

        let mut first_error = None;
        for (name, bean) in singletons.into_iter().rev() {
            let Ok(definition) = self.registry.get(&name) else {
                continue;
            };
            let Some(destroy_fn) = &definition.destroy_callback else {
                continue;
            };

            match destroy_fn(&*bean) {
                Ok(()) => tracing::debug!("Bean '{}' destroyed successfully", name),
                Err(e) => {
                    tracing::warn!("Failed to destroy bean '{}': {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::info!("Container shutdown complete");
        first_error.map_or(Ok(()), Err)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn resolve_on_path(&self, name: &str, path: &mut ResolutionPath) -> ContainerResult<BeanRef> {
        tracing::trace!("Requesting bean: '{}'", name);

        if self.is_closed() {
            return Err(ContainerError::Closed);
        }

        let definition = self.registry.get(name).map_err(|e| {
            tracing::debug!("Bean '{}' not found in container", name);
            e
        })?;

        match definition.scope() {
            Scope::Singleton => self.resolve_singleton(definition, path),
            Scope::Prototype => {
                tracing::debug!("Creating new instance of prototype bean '{}'", name);
                self.create_bean(definition, path)
            }
            Scope::Custom(scope) => {
                let policy = self.scopes.get(scope).ok_or_else(|| ContainerError::UnknownScope {
                    bean: name.to_string(),
                    scope: scope.clone(),
                })?;
                policy.get(name, &mut || self.create_bean(definition, path))
            }
        }
    }

    fn resolve_singleton(
        &self,
        definition: &Arc<BeanDefinition>,
        path: &mut ResolutionPath,
    ) -> ContainerResult<BeanRef> {
        let name = definition.name();

        if let Some(bean) = self.cached_singleton(name) {
            tracing::debug!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean);
        }

        let _creating = self.creation_lock.lock();

        if self.is_closed() {
            return Err(ContainerError::Closed);
        }

        // Another thread may have finished it while we waited
        if let Some(bean) = self.cached_singleton(name) {
            return Ok(bean);
        }

        tracing::info!("Creating shared instance of singleton bean '{}'", name);
        let bean = self.create_bean(definition, path)?;
        self.singletons
            .write()
            .insert(name.to_string(), Arc::clone(&bean));

        tracing::debug!("Singleton bean '{}' created and cached", name);
        Ok(bean)
    }

    fn cached_singleton(&self, name: &str) -> Option<BeanRef> {
        self.singletons.read().get(name).cloned()
    }

    fn resolve_dependency(
        &self,
        dependency: &DependencyRef,
        path: &mut ResolutionPath,
    ) -> ContainerResult<BeanRef> {
        let name = self.registry.resolve_reference(dependency)?;
        self.resolve_on_path(name, path)
    }

    /// Builds one instance:
    ///
    /// 1. resolve constructor arguments
    /// 2. call the factory
    /// 3. apply setters in declaration order
    /// 4. run the init callback
    fn create_bean(
        &self,
        definition: &Arc<BeanDefinition>,
        path: &mut ResolutionPath,
    ) -> ContainerResult<BeanRef> {
        let name = definition.name();

        path.enter(name).map_err(|chain| {
            tracing::error!(
                "Circular dependency detected while creating '{}'. Creation chain: {:?}",
                name,
                chain
            );
            ContainerError::CircularDependency { chain }
        })?;

        let result = self.instantiate(definition, path);
        path.exit(name);
        result
    }

    fn instantiate(
        &self,
        definition: &BeanDefinition,
        path: &mut ResolutionPath,
    ) -> ContainerResult<BeanRef> {
        let name = definition.name();

        let args = definition
            .constructor_args()
            .iter()
            .map(|dependency| {
                let bean = self.resolve_dependency(dependency, path)?;
                Ok((dependency.clone(), bean))
            })
            .collect::<ContainerResult<Vec<_>>>()?;

        let mut instance = definition
            .factory
            .create(&ConstructorArgs::new(name, args))
            .map_err(|e| ContainerError::creating(name, e))?;

        for setter in definition.setters() {
            let dependency = self.resolve_dependency(&setter.dependency, path)?;
            tracing::trace!("Injecting {} into '{}'", setter.dependency, name);
            (setter.apply)(&mut *instance, dependency)
                .map_err(|e| ContainerError::creating(name, e))?;
        }

        if let Some(init_fn) = &definition.init_callback {
            init_fn(&mut *instance).map_err(|e| ContainerError::creating(name, e))?;
        }

        Ok(Arc::from(instance))
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Container shutdown on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("beans", &self.registry.len())
            .field("singletons", &self.singletons.read().len())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Collects definitions, scopes and configuration, then builds a [`Container`]
pub struct ContainerBuilder {
    registry: BeanDefinitionRegistry,
    scopes: HashMap<String, Arc<dyn ScopePolicy>>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            registry: BeanDefinitionRegistry::new(),
            scopes: HashMap::new(),
            config: ContainerConfig::default(),
        }
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register(mut self, definition: BeanDefinition) -> ContainerResult<Self> {
        self.registry.register(definition)?;
        Ok(self)
    }

    pub fn register_singleton<T, F>(
        self,
        name: impl Into<String>,
        factory: F,
    ) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register(BeanDefinition::supplier(name, factory).with_scope(Scope::Singleton))
    }

    pub fn register_prototype<T, F>(
        self,
        name: impl Into<String>,
        factory: F,
    ) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register(BeanDefinition::supplier(name, factory).with_scope(Scope::Prototype))
    }

    /// Registers a singleton named after its type (`BookDao` -> `bookDao`)
    pub fn register_component<T, F>(self, factory: F) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn() -> ContainerResult<T> + Send + Sync + 'static,
    {
        self.register_singleton(default_bean_name::<T>(), factory)
    }

    /// Registers a bean from its name, scope, the names it depends on and a
    /// factory receiving those dependencies in order
    pub fn register_bean<T, F, I, S>(
        self,
        name: impl Into<String>,
        scope: Scope,
        dependencies: I,
        factory: F,
    ) -> ContainerResult<Self>
    where
        T: Any + Send + Sync,
        F: Fn(&ConstructorArgs) -> ContainerResult<T> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(
            BeanDefinition::new(name, factory)
                .with_scope(scope)
                .with_dependencies(dependencies),
        )
    }

    /// Lets a configuration module contribute its definitions
    pub fn register_module(mut self, module: &dyn Configuration) -> ContainerResult<Self> {
        module.register_beans(&mut self.registry)?;
        Ok(self)
    }

    /// Registers the policy backing `Scope::Custom(name)`
    pub fn register_scope(
        mut self,
        name: impl Into<String>,
        policy: Arc<dyn ScopePolicy>,
    ) -> ContainerResult<Self> {
        let name = name.into();
        if name == SCOPE_SINGLETON || name == SCOPE_PROTOTYPE {
            return Err(ContainerError::Config(format!(
                "scope name '{}' is reserved",
                name
            )));
        }
        tracing::debug!("Registered custom scope '{}'", name);
        self.scopes.insert(name, policy);
        Ok(self)
    }

    /// Fails with `UnknownScope` if a definition names a scope nobody registered
    pub fn build(self) -> ContainerResult<Container> {
        for definition in self.registry.definitions() {
            if let Scope::Custom(scope) = definition.scope() {
                if !self.scopes.contains_key(scope) {
                    return Err(ContainerError::UnknownScope {
                        bean: definition.name().to_string(),
                        scope: scope.clone(),
                    });
                }
            }
        }

        let settings = self.config.container.clone();
        let container = Container::new(self.registry, self.scopes);

        if settings.log_bean_names {
            for name in container.bean_names() {
                tracing::info!("BeanName : {}", name);
            }
        }

        if settings.eager_init {
            container.preinstantiate_singletons()?;
        }

        tracing::info!("Container started with {} bean definition(s)", container.registry.len());
        Ok(container)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerSettings;
    use crate::scope::RequestScope;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        seq: u32,
        number: String,
    }

    #[derive(Debug)]
    struct Member {
        name: String,
        account: Arc<Account>,
    }

    #[derive(Debug, Default)]
    struct ShoppingCart {
        items: Mutex<Vec<String>>,
    }

    impl ShoppingCart {
        fn add_item(&self, item: &str) {
            self.items.lock().push(item.to_string());
        }

        fn items(&self) -> Vec<String> {
            self.items.lock().clone()
        }
    }

    #[derive(Debug)]
    struct Pokemon {
        name: &'static str,
    }

    #[derive(Default)]
    struct PokemonService {
        pokemon: Option<Arc<Pokemon>>,
    }

    impl PokemonService {
        fn set_pokemon(&mut self, pokemon: Arc<Pokemon>) {
            self.pokemon = Some(pokemon);
        }
    }

    fn account_and_member() -> Container {
        Container::builder()
            .register_singleton("accountGenerator", || {
                Ok(Account {
                    seq: 20,
                    number: "110-233-2222".into(),
                })
            })
            .unwrap()
            .register(
                BeanDefinition::new("memberGenerator", |args: &ConstructorArgs| {
                    Ok(Member {
                        name: "hong".into(),
                        account: args.get::<Account>(0)?,
                    })
                })
                .with_constructor_arg("accountGenerator"),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn cart_container(scope: Scope) -> Container {
        Container::builder()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default())).with_scope(scope),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn pokemons() -> ContainerBuilder {
        let mut builder = Container::builder();
        for name in ["pikachu", "charmander", "squirtle"] {
            builder = builder.register_singleton(name, move || Ok(Pokemon { name })).unwrap();
        }
        builder
    }

    #[test]
    fn test_singleton_member_shares_account() {
        let container = account_and_member();

        let first = container.resolve_as::<Member>("memberGenerator").unwrap();
        let second = container.resolve_as::<Member>("memberGenerator").unwrap();
        let account = container.resolve_as::<Account>("accountGenerator").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.account, &account));
        assert_eq!(first.name, "hong");
        assert_eq!(account.seq, 20);
    }

    #[test]
    fn test_prototype_carts_are_independent() {
        let container = cart_container(Scope::Prototype);

        let cart = container.resolve_as::<ShoppingCart>("cart").unwrap();
        cart.add_item("carpBread");
        cart.add_item("milk");

        let cart2 = container.resolve_as::<ShoppingCart>("cart").unwrap();
        cart2.add_item("water");

        assert!(!Arc::ptr_eq(&cart, &cart2));
        assert_eq!(cart.items(), vec!["carpBread", "milk"]);
        assert_eq!(cart2.items(), vec!["water"]);
        assert!(!container.contains_singleton("cart"));
    }

    #[test]
    fn test_singleton_cart_is_shared() {
        let container = cart_container(Scope::Singleton);

        let cart = container.resolve_as::<ShoppingCart>("cart").unwrap();
        cart.add_item("carpBread");
        cart.add_item("milk");

        let cart2 = container.resolve_as::<ShoppingCart>("cart").unwrap();
        cart2.add_item("water");

        assert!(Arc::ptr_eq(&cart, &cart2));
        assert_eq!(cart.items(), vec!["carpBread", "milk", "water"]);
    }

    #[test]
    fn test_prototype_instances_differ_even_when_equal() {
        let container = Container::builder()
            .register_prototype("account", || {
                Ok(Account {
                    seq: 1,
                    number: "same".into(),
                })
            })
            .unwrap()
            .build()
            .unwrap();

        let first = container.resolve_as::<Account>("account").unwrap();
        let second = container.resolve_as::<Account>("account").unwrap();
        assert_eq!(*first, *second);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(container.is_prototype("account").unwrap());
        assert!(!container.is_singleton("account").unwrap());
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = Container::builder()
            .register_singleton("cart", || Ok(ShoppingCart::default()))
            .unwrap()
            .register_prototype("cart", || Ok(ShoppingCart::default()));

        assert!(matches!(result, Err(ContainerError::DuplicateName(ref name)) if name == "cart"));
    }

    #[test]
    fn test_unknown_bean() {
        let container = account_and_member();
        assert!(matches!(
            container.resolve("bookService"),
            Err(ContainerError::UnknownBean(ref name)) if name == "bookService"
        ));
        assert!(!container.contains_bean("bookService"));
        assert!(container.is_singleton("bookService").is_err());
    }

    #[test]
    fn test_circular_dependency_is_detected() {
        let container = Container::builder()
            .register(BeanDefinition::supplier("a", || Ok(1u8)).with_constructor_arg("b"))
            .unwrap()
            .register(BeanDefinition::supplier("b", || Ok(2u16)).with_constructor_arg("a"))
            .unwrap()
            .build()
            .unwrap();

        match container.resolve("a") {
            Err(ContainerError::CircularDependency { chain }) => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
        }
        assert!(!container.contains_singleton("a"));
        assert!(!container.contains_singleton("b"));
    }

    #[test]
    fn test_prototype_self_dependency_is_detected() {
        let container = Container::builder()
            .register(
                BeanDefinition::supplier("node", || Ok(0u32))
                    .with_scope(Scope::Prototype)
                    .with_constructor_arg("node"),
            )
            .unwrap()
            .build()
            .unwrap();

        match container.resolve("node") {
            Err(ContainerError::CircularDependency { chain }) => {
                assert_eq!(chain, vec!["node", "node"]);
            }
            other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_setter_injection_cycle_is_detected() {
        let container = Container::builder()
            .register(
                BeanDefinition::supplier("pokemonService", || Ok(PokemonService::default()))
                    .with_setter("pikachu", PokemonService::set_pokemon),
            )
            .unwrap()
            .register(
                BeanDefinition::supplier("pikachu", || Ok(Pokemon { name: "pikachu" }))
                    .with_constructor_arg("pokemonService"),
            )
            .unwrap()
            .build()
            .unwrap();

        assert!(matches!(
            container.resolve("pokemonService"),
            Err(ContainerError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_setter_injection_by_name() {
        let container = pokemons()
            .register(
                BeanDefinition::supplier("pokemonService", || Ok(PokemonService::default()))
                    .with_setter("pikachu", PokemonService::set_pokemon),
            )
            .unwrap()
            .build()
            .unwrap();

        let service = container.resolve_as::<PokemonService>("pokemonService").unwrap();
        let pikachu = container.resolve_as::<Pokemon>("pikachu").unwrap();
        let injected = service.pokemon.as_ref().unwrap();
        assert_eq!(injected.name, "pikachu");
        assert!(Arc::ptr_eq(injected, &pikachu));
    }

    #[test]
    fn test_resolve_by_type() {
        let container = account_and_member();
        let account = container.resolve_by_type::<Account>().unwrap();
        assert_eq!(account.number, "110-233-2222");
        assert!(matches!(
            container.resolve_by_type::<ShoppingCart>(),
            Err(ContainerError::NoBeanOfType(_))
        ));

        let container = pokemons().build().unwrap();
        match container.resolve_by_type::<Pokemon>() {
            Err(ContainerError::AmbiguousType { candidates, .. }) => {
                assert_eq!(candidates, vec!["pikachu", "charmander", "squirtle"]);
            }
            other => panic!("expected AmbiguousType, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_constructor_arg_by_type() {
        let container = Container::builder()
            .register_singleton("bookDao", || Ok(vec!["Spring in Action".to_string()]))
            .unwrap()
            .register(
                BeanDefinition::new("bookServiceConstructor", |args: &ConstructorArgs| {
                    Ok(args.get::<Vec<String>>(0)?.len())
                })
                .with_constructor_arg(DependencyRef::of_type::<Vec<String>>()),
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(*container.resolve_as::<usize>("bookServiceConstructor").unwrap(), 1);
    }

    #[derive(Debug)]
    struct BookDao {
        titles: Vec<&'static str>,
    }

    struct BookService {
        dao: Arc<BookDao>,
    }

    #[test]
    fn test_mixed_wiring_validates_and_resolves() {
        let container = pokemons()
            .register(
                BeanDefinition::supplier("bookDao", || {
                    Ok(BookDao {
                        titles: vec!["Spring in Action", "Rust in Action"],
                    })
                })
                .with_destroy(|_: &BookDao| Ok(())),
            )
            .unwrap()
            .register(
                BeanDefinition::new("bookService", |args: &ConstructorArgs| {
                    Ok(BookService {
                        dao: args.get::<BookDao>(0)?,
                    })
                })
                .with_constructor_arg(DependencyRef::of_type::<BookDao>()),
            )
            .unwrap()
            .register(
                BeanDefinition::supplier("pokemonService", || Ok(PokemonService::default()))
                    .with_setter("pikachu", PokemonService::set_pokemon),
            )
            .unwrap()
            .build()
            .unwrap();

        assert!(container.validate_dependencies().is_ok());

        let order = container.registry().dependency_order().unwrap();
        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(position("bookDao") < position("bookService"));
        assert!(position("pikachu") < position("pokemonService"));

        let books = container.resolve_as::<BookService>("bookService").unwrap();
        let dao = container.resolve_by_type::<BookDao>().unwrap();
        assert!(Arc::ptr_eq(&books.dao, &dao));
        assert_eq!(books.dao.titles.len(), 2);

        let service = container.resolve_as::<PokemonService>("pokemonService").unwrap();
        assert_eq!(service.pokemon.as_ref().map(|p| p.name), Some("pikachu"));
    }

    #[test]
    fn test_resolve_all_keeps_registration_order() {
        let container = pokemons().build().unwrap();
        let all = container.resolve_all::<Pokemon>().unwrap();
        let names: Vec<&str> = all.values().map(|p| p.name).collect();
        assert_eq!(names, vec!["pikachu", "charmander", "squirtle"]);
    }

    #[test]
    fn test_type_mismatch() {
        let container = account_and_member();
        assert!(matches!(
            container.resolve_as::<ShoppingCart>("accountGenerator"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_failed_dependency_leaves_nothing_cached() {
        let available = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&available);

        let container = Container::builder()
            .register_singleton("accountGenerator", move || {
                if flag.load(Ordering::SeqCst) {
                    Ok(Account {
                        seq: 1,
                        number: "1".into(),
                    })
                } else {
                    Err(anyhow::anyhow!("account service down").into())
                }
            })
            .unwrap()
            .register(
                BeanDefinition::new("memberGenerator", |args: &ConstructorArgs| {
                    Ok(Member {
                        name: "kim".into(),
                        account: args.get::<Account>(0)?,
                    })
                })
                .with_constructor_arg("accountGenerator"),
            )
            .unwrap()
            .build()
            .unwrap();

        match container.resolve("memberGenerator") {
            Err(ContainerError::BeanCreationFailed { name, .. }) => {
                assert_eq!(name, "accountGenerator")
            }
            other => panic!("expected BeanCreationFailed, got {:?}", other.map(|_| ())),
        }
        assert!(!container.contains_singleton("memberGenerator"));
        assert!(!container.contains_singleton("accountGenerator"));

        available.store(true, Ordering::SeqCst);
        assert!(container.resolve("memberGenerator").is_ok());
        assert!(container.contains_singleton("accountGenerator"));
    }

    #[test]
    fn test_concurrent_first_resolution_builds_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);

        let container = Container::builder()
            .register_singleton("cart", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(ShoppingCart::default())
            })
            .unwrap()
            .build()
            .unwrap();

        let barrier = Barrier::new(8);
        let carts: Vec<BeanRef> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        container.resolve("cart").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert!(carts.iter().all(|cart| Arc::ptr_eq(cart, &carts[0])));
    }

    #[test]
    fn test_init_and_destroy_callbacks() {
        let destroyed = Arc::new(Mutex::new(Vec::new()));
        let on_account = Arc::clone(&destroyed);
        let on_member = Arc::clone(&destroyed);

        let container = Container::builder()
            .register(
                BeanDefinition::supplier("accountGenerator", || {
                    Ok(Account {
                        seq: 0,
                        number: String::new(),
                    })
                })
                .with_init(|account: &mut Account| {
                    account.number = "110-233-2222".into();
                    Ok(())
                })
                .with_destroy(move |_: &Account| {
                    on_account.lock().push("accountGenerator");
                    Ok(())
                }),
            )
            .unwrap()
            .register(
                BeanDefinition::new("memberGenerator", |args: &ConstructorArgs| {
                    Ok(Member {
                        name: "lee".into(),
                        account: args.get::<Account>(0)?,
                    })
                })
                .with_constructor_arg("accountGenerator")
                .with_destroy(move |_: &Member| {
                    on_member.lock().push("memberGenerator");
                    Ok(())
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        let member = container.resolve_as::<Member>("memberGenerator").unwrap();
        assert_eq!(member.account.number, "110-233-2222");

        container.shutdown().unwrap();
        container.shutdown().unwrap();
        assert!(container.is_closed());
        assert_eq!(*destroyed.lock(), vec!["memberGenerator", "accountGenerator"]);
    }

    #[test]
    fn test_drop_runs_shutdown() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        let container = Container::builder()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default())).with_destroy(
                    move |_: &ShoppingCart| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                ),
            )
            .unwrap()
            .build()
            .unwrap();

        container.resolve("cart").unwrap();
        drop(container);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prototypes_are_not_destroyed() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        let container = Container::builder()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default()))
                    .with_scope(Scope::Prototype)
                    .with_destroy(move |_: &ShoppingCart| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .unwrap()
            .build()
            .unwrap();

        container.resolve("cart").unwrap();
        container.shutdown().unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_after_shutdown_is_rejected() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);

        let container = Container::builder()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default())).with_destroy(
                    move |_: &ShoppingCart| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    },
                ),
            )
            .unwrap()
            .register(
                BeanDefinition::supplier("prototypeCart", || Ok(ShoppingCart::default()))
                    .with_scope(Scope::Prototype),
            )
            .unwrap()
            .build()
            .unwrap();

        container.resolve("cart").unwrap();
        container.shutdown().unwrap();
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);

        assert!(matches!(container.resolve("cart"), Err(ContainerError::Closed)));
        assert!(matches!(container.resolve("prototypeCart"), Err(ContainerError::Closed)));
        assert!(!container.contains_singleton("cart"));

        // Nothing was re-cached, so dropping destroys nothing further
        drop(container);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_waits_for_singleton_in_creation() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&destroyed);
        let started = Arc::new(Barrier::new(2));
        let in_factory = Arc::clone(&started);

        let container = Container::builder()
            .register(
                BeanDefinition::supplier("slowCart", move || {
                    in_factory.wait();
                    Ok(ShoppingCart::default())
                })
                .with_destroy(move |_: &ShoppingCart| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        std::thread::scope(|s| {
            let resolving = s.spawn(|| container.resolve("slowCart"));
            started.wait();
            container.shutdown().unwrap();
            assert!(resolving.join().unwrap().is_ok());
        });

        // The in-flight singleton finished before teardown and was destroyed with it
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert!(!container.contains_singleton("slowCart"));
        assert!(matches!(container.resolve("slowCart"), Err(ContainerError::Closed)));
    }

    #[test]
    fn test_eager_init_and_lazy_singletons() {
        let config = ContainerConfig {
            container: ContainerSettings {
                eager_init: true,
                log_bean_names: true,
            },
            ..ContainerConfig::default()
        };

        let container = Container::builder()
            .config(config)
            .register_singleton("accountGenerator", || {
                Ok(Account {
                    seq: 1,
                    number: "1".into(),
                })
            })
            .unwrap()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default())).with_lazy(true),
            )
            .unwrap()
            .register_prototype("milk", || Ok("milk".to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert!(container.contains_singleton("accountGenerator"));
        assert!(!container.contains_singleton("cart"));
        assert!(!container.contains_singleton("milk"));
    }

    #[test]
    fn test_eager_init_surfaces_errors() {
        let config = ContainerConfig {
            container: ContainerSettings {
                eager_init: true,
                log_bean_names: false,
            },
            ..ContainerConfig::default()
        };

        let result = Container::builder()
            .config(config)
            .register(
                BeanDefinition::supplier("member", || Ok(1u8)).with_constructor_arg("account"),
            )
            .unwrap()
            .build();

        assert!(matches!(result, Err(ContainerError::UnknownBean(ref name)) if name == "account"));
    }

    #[test]
    fn test_custom_request_scope() {
        let request = Arc::new(RequestScope::new());
        let container = Container::builder()
            .register_scope("request", request.clone())
            .unwrap()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default()))
                    .with_scope(Scope::custom("request")),
            )
            .unwrap()
            .build()
            .unwrap();

        let first = container.resolve("cart").unwrap();
        let second = container.resolve("cart").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        request.reset();
        let third = container.resolve("cart").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(!container.contains_singleton("cart"));
    }

    #[test]
    fn test_unregistered_custom_scope_fails_build() {
        let result = Container::builder()
            .register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default()))
                    .with_scope(Scope::custom("session")),
            )
            .unwrap()
            .build();

        assert!(matches!(
            result,
            Err(ContainerError::UnknownScope { ref scope, .. }) if scope == "session"
        ));
    }

    #[test]
    fn test_reserved_scope_names() {
        let result =
            Container::builder().register_scope("singleton", Arc::new(RequestScope::new()));
        assert!(matches!(result, Err(ContainerError::Config(_))));
    }

    #[test]
    fn test_inject_via_constructor_and_setter() {
        let container = pokemons().build().unwrap();

        let trainer = container
            .inject_via_constructor(
                &[DependencyRef::name("squirtle"), DependencyRef::name("charmander")],
                |args| {
                    Ok(vec![
                        args.get::<Pokemon>(0)?.name,
                        args.get::<Pokemon>(1)?.name,
                    ])
                },
            )
            .unwrap();
        assert_eq!(trainer, vec!["squirtle", "charmander"]);

        let mut service = PokemonService::default();
        container
            .inject_via_setter(&mut service, "pikachu", PokemonService::set_pokemon)
            .unwrap();
        assert_eq!(service.pokemon.unwrap().name, "pikachu");

        let mut service = PokemonService::default();
        let result = container.inject_via_setter(&mut service, "mew", PokemonService::set_pokemon);
        assert!(matches!(result, Err(ContainerError::UnknownBean(_))));
    }

    #[test]
    fn test_register_bean_with_dependency_names() {
        let container = Container::builder()
            .register_singleton("carpBread", || Ok("carpBread".to_string()))
            .unwrap()
            .register_bean("basket", Scope::Prototype, ["carpBread"], |args: &ConstructorArgs| {
                let cart = ShoppingCart::default();
                cart.add_item(&args.get::<String>(0)?);
                Ok(cart)
            })
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            container.resolve_as::<ShoppingCart>("basket").unwrap().items(),
            vec!["carpBread"]
        );
    }

    #[test]
    fn test_register_component_uses_type_name() {
        let container = Container::builder()
            .register_component(|| Ok(ShoppingCart::default()))
            .unwrap()
            .build()
            .unwrap();

        assert!(container.contains_bean("shoppingCart"));
        assert!(container.resolve_as::<ShoppingCart>("shoppingCart").is_ok());
    }

    #[test]
    fn test_register_module() {
        let module = |registry: &mut BeanDefinitionRegistry| -> ContainerResult<()> {
            registry.register(BeanDefinition::supplier("water", || Ok("water".to_string())))?;
            registry.register(
                BeanDefinition::supplier("cart", || Ok(ShoppingCart::default()))
                    .with_scope(Scope::Prototype),
            )
        };

        let container = Container::builder()
            .register_module(&module)
            .unwrap()
            .build()
            .unwrap();
        let names: Vec<&str> = container.bean_names().collect();
        assert_eq!(names, vec!["water", "cart"]);
    }
}
