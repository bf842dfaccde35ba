// beanstalk-core: 轻量的依赖注入容器
//
// 显式注册 Bean 定义，按名称或类型解析，支持：
// - 单例、原型和自定义作用域
// - 构造函数注入和 Setter 注入
// - 生命周期管理（init/destroy 回调）
// - 循环依赖检测

pub mod bean;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod registry;
pub mod scope;
pub mod utils;

// 重新导出常用类型
pub use bean::{
    BeanDefinition, BeanRef, ConstructorArgs, DependencyRef, FunctionFactory, ObjectFactory,
    SetterInjection,
};
pub use config::{ContainerConfig, ContainerSettings};
pub use container::{Container, ContainerBuilder};
pub use error::{ContainerError, ContainerResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use registry::{BeanDefinitionRegistry, BeanNames, Configuration};
pub use scope::{RequestScope, Scope, ScopePolicy};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean::{BeanDefinition, BeanRef, ConstructorArgs, DependencyRef};
    pub use crate::config::ContainerConfig;
    pub use crate::container::{Container, ContainerBuilder};
    pub use crate::error::{ContainerError, ContainerResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::registry::{BeanDefinitionRegistry, Configuration};
    pub use crate::scope::{RequestScope, Scope, ScopePolicy};
    pub use crate::utils;
    // 重新导出 anyhow，方便使用
    pub use anyhow::{anyhow, Context};
}
