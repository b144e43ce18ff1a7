//! 服务层（配置、后台资源加载）

pub mod config;
pub mod loader;

pub use config::ToolConfig;
pub use loader::{LoaderMessage, ResourceLoader};
