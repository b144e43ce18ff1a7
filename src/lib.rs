//! zmark - 交互式批注编辑内核
//!
//! 模块结构：
//! - core: 核心框架（输入事件、几何）
//! - models: 数据模型（批注、撤销记录）
//! - doc: 文档引擎协作者（页面、批注、快照历史、文档锁）
//! - kernel: 交互内核（模式注册表、工具变体、调度器、通知器、撤销管理）
//! - services: 服务层（配置、后台资源加载）

pub mod core;
pub mod doc;
pub mod kernel;
pub mod logging;
pub mod models;
pub mod services;
