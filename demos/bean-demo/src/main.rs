use beanstalk_core::prelude::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ==================== 会员与账户 ====================

#[derive(Debug, Clone)]
struct Account {
    seq: u32,
    number: String,
}

#[derive(Debug)]
struct Member {
    name: String,
    account: Arc<Account>,
}

/// 会员配置模块，相当于一个配置类
struct MemberConfig;

impl Configuration for MemberConfig {
    fn register_beans(&self, registry: &mut BeanDefinitionRegistry) -> ContainerResult<()> {
        registry.register(BeanDefinition::supplier("accountGenerator", || {
            Ok(Account {
                seq: 20,
                number: "110-233-2222".into(),
            })
        }))?;

        registry.register(
            BeanDefinition::new("memberGenerator", |args: &ConstructorArgs| {
                Ok(Member {
                    name: "hong".into(),
                    account: args.get::<Account>(0)?,
                })
            })
            .with_constructor_arg("accountGenerator"),
        )
    }
}

// ==================== 图书服务（构造函数注入） ====================

#[derive(Debug)]
struct BookDao {
    titles: Vec<&'static str>,
}

impl BookDao {
    fn find_all(&self) -> &[&'static str] {
        &self.titles
    }
}

struct BookService {
    dao: Arc<BookDao>,
}

impl BookService {
    fn list(&self) -> String {
        self.dao.find_all().join(", ")
    }
}

// ==================== 宝可梦服务（Setter 注入） ====================

trait Pokemon: Send + Sync {
    fn attack(&self) -> &'static str;
}

struct Pikachu;
struct Charmander;
struct Squirtle;

impl Pokemon for Pikachu {
    fn attack(&self) -> &'static str {
        "Thunderbolt"
    }
}

impl Pokemon for Charmander {
    fn attack(&self) -> &'static str {
        "Ember"
    }
}

impl Pokemon for Squirtle {
    fn attack(&self) -> &'static str {
        "Water Gun"
    }
}

type PokemonBean = Box<dyn Pokemon>;

#[derive(Default)]
struct PokemonService {
    pokemon: Option<Arc<PokemonBean>>,
}

impl PokemonService {
    fn set_pokemon(&mut self, pokemon: Arc<PokemonBean>) {
        self.pokemon = Some(pokemon);
    }

    fn attack(&self) -> &'static str {
        self.pokemon.as_ref().map_or("(no pokemon)", |p| p.attack())
    }
}

// ==================== 购物车（作用域） ====================

#[derive(Debug, Default)]
struct Cart {
    items: Mutex<Vec<String>>,
}

impl Cart {
    fn add_item(&self, item: &str) {
        self.items.lock().push(item.to_string());
    }

    fn items(&self) -> Vec<String> {
        self.items.lock().clone()
    }
}

/// 请求上下文，在请求作用域重置前共享
#[derive(Debug)]
struct RequestContext {
    id: usize,
}

// ==================== 主程序 ====================

fn load_config() -> Result<ContainerConfig> {
    let config_paths = ["demos/bean-demo/beanstalk.toml", "beanstalk.toml"];
    let config_file = config_paths
        .iter()
        .find(|path| std::path::Path::new(path).exists())
        .copied()
        .unwrap_or("beanstalk.toml");

    Ok(ContainerConfig::from_optional_file(config_file)?.with_env_overrides()?)
}

fn build_container(config: ContainerConfig, request_scope: Arc<RequestScope>) -> Result<Container> {
    let request_ids = Arc::new(AtomicUsize::new(0));

    let container = Container::builder()
        .config(config)
        .register_module(&MemberConfig)?
        // 图书
        .register(
            BeanDefinition::supplier("bookDao", || {
                Ok(BookDao {
                    titles: vec!["Spring in Action", "Rust in Action"],
                })
            })
            .with_destroy(|dao: &BookDao| {
                tracing::info!("BookDao closing, {} title(s) held", dao.titles.len());
                Ok(())
            }),
        )?
        .register(
            BeanDefinition::new("bookService", |args: &ConstructorArgs| {
                Ok(BookService {
                    dao: args.get::<BookDao>(0)?,
                })
            })
            .with_constructor_arg(DependencyRef::of_type::<BookDao>()),
        )?
        // 宝可梦
        .register_singleton("pikachu", || Ok(Box::new(Pikachu) as PokemonBean))?
        .register_singleton("charmander", || Ok(Box::new(Charmander) as PokemonBean))?
        .register_singleton("squirtle", || Ok(Box::new(Squirtle) as PokemonBean))?
        .register(
            BeanDefinition::supplier("pokemonService", || Ok(PokemonService::default()))
                .with_setter("pikachu", PokemonService::set_pokemon),
        )?
        // 购物车
        .register_component(|| Ok(Cart::default()))?
        .register(
            BeanDefinition::supplier("prototypeCart", || Ok(Cart::default()))
                .with_scope(Scope::Prototype),
        )?
        // 请求作用域
        .register_scope("request", request_scope)?
        .register(
            BeanDefinition::supplier("requestContext", move || {
                let id = request_ids.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(RequestContext { id })
            })
            .with_scope(Scope::custom("request")),
        )?
        .build()?;

    Ok(container)
}

fn main() -> Result<()> {
    let config = load_config()?;
    config.logging.init()?;

    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║           Beanstalk Container - Demo              ║");
    println!("╚════════════════════════════════════════════════════╝\n");

    let request_scope = Arc::new(RequestScope::new());
    let container = build_container(config, Arc::clone(&request_scope))?;
    container.validate_dependencies()?;

    // 会员与账户
    println!("👤 Members:");
    let member = container.resolve_as::<Member>("memberGenerator")?;
    let account = container.resolve_as::<Account>("accountGenerator")?;
    println!("   {} -> account #{} ({})", member.name, member.account.seq, member.account.number);
    println!("   Shared account instance: {}", Arc::ptr_eq(&member.account, &account));

    // 构造函数注入
    println!("\n📚 Books:");
    let books = container.resolve_as::<BookService>("bookService")?;
    println!("   {}", books.list());

    // Setter 注入
    println!("\n⚡ Pokemon:");
    let service = container.resolve_as::<PokemonService>("pokemonService")?;
    println!("   pokemonService attacks with {}", service.attack());
    for (name, pokemon) in container.resolve_all::<PokemonBean>()? {
        println!("   {}: {}", name, pokemon.attack());
    }
    if let Err(e) = container.resolve_by_type::<PokemonBean>() {
        println!("   By type: {}", e);
    }

    // 单例 vs 原型
    println!("\n🛒 Carts:");
    let cart = container.resolve_as::<Cart>("cart")?;
    cart.add_item("carpBread");
    cart.add_item("milk");
    let cart2 = container.resolve_as::<Cart>("cart")?;
    cart2.add_item("water");
    println!("   singleton cart: {:?}", cart.items());

    let basket = container.resolve_as::<Cart>("prototypeCart")?;
    basket.add_item("carpBread");
    basket.add_item("milk");
    let basket2 = container.resolve_as::<Cart>("prototypeCart")?;
    basket2.add_item("water");
    println!("   prototype carts: {:?} / {:?}", basket.items(), basket2.items());

    // 请求作用域
    println!("\n📨 Requests:");
    for _ in 0..2 {
        let first = container.resolve_as::<RequestContext>("requestContext")?;
        let again = container.resolve_as::<RequestContext>("requestContext")?;
        println!("   request #{} (same instance: {})", first.id, Arc::ptr_eq(&first, &again));
        request_scope.reset();
    }

    println!("\n🔗 Wiring order:");
    println!("   {}", container.registry().dependency_order()?.join(" -> "));

    println!("\n📋 Beans ({}):", container.bean_names().len());
    for name in container.bean_names() {
        println!("   {}", name);
    }

    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║           Shutting Down Container                 ║");
    println!("╚════════════════════════════════════════════════════╝\n");

    container.shutdown()?;
    println!("✅ Container shutdown complete!");

    Ok(())
}
