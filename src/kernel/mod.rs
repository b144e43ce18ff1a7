//! 交互内核
//!
//! 无头的批注编辑核心：模式注册表、工具变体、调度器（重放至收敛）、
//! 变更通知器、撤销/重做管理。不含任何渲染或控件代码；用户可见的
//! 动作一律以 Effect 形式交还嵌入方。

pub mod context;
pub mod dispatcher;
pub mod effect;
pub mod mode;
pub mod notifier;
pub mod quick_menu;
pub mod state;
pub mod tool;
pub mod tools;
pub mod undo;
pub mod viewport;

pub use context::ToolCtx;
pub use dispatcher::{DispatchResult, Dispatcher, ReplayPolicy, MAX_REPLAY_STEPS};
pub use effect::Effect;
pub use mode::{ModeId, ModeRegistry, ToolCreateError, ToolFactory, ToolMode};
pub use notifier::{AnnotationListener, DocStructureListener, ModifyExtra, MutationNotifier};
pub use state::{AnnotViewHandle, ToolCommon, TransitionContext};
pub use tool::{NullTool, ToolVariant};
pub use undo::UndoRedoManager;
pub use viewport::Viewport;
