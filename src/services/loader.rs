//! 系统资源后台加载
//!
//! 字体表加载在事件线程之外进行，完成消息经由通道送回，由调度循环
//! 轮询取出后才允许触碰任何共享状态。后台任务自身从不访问文档或
//! 工具状态。关闭文档即中止任务。

use std::io;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use compact_str::CompactString;
use tokio::task::JoinHandle;

/// Completion message funneled back onto the dispatch thread.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderMessage {
    FontsLoaded(Vec<CompactString>),
    Failed(String),
}

pub struct ResourceLoader {
    runtime: Option<tokio::runtime::Runtime>,
    task: Option<JoinHandle<()>>,
    rx: Receiver<LoaderMessage>,
}

impl ResourceLoader {
    /// Spawns the font-table load. Falls back to a current-thread runtime
    /// when the multi-thread one cannot be built.
    pub fn start() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .or_else(|e| {
                tracing::warn!(
                    error = %e,
                    "failed to create multi-thread tokio runtime, falling back to current-thread"
                );
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
            })?;

        let (tx, rx) = mpsc::channel();
        let task = runtime.spawn(load_font_tables(tx));
        Ok(Self {
            runtime: Some(runtime),
            task: Some(task),
            rx,
        })
    }

    /// Non-blocking poll; call from the dispatch thread only.
    pub fn try_recv(&self) -> Option<LoaderMessage> {
        match self.rx.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks until a message arrives or the task is gone. Test hook.
    pub fn recv_blocking(&self) -> Option<LoaderMessage> {
        self.rx.recv().ok()
    }

    /// Aborts the outstanding task; completions already queued stay
    /// readable.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for ResourceLoader {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Stand-in for platform font enumeration: the base-14 families every
/// viewer ships with. Real bindings replace this body, not its shape.
async fn load_font_tables(tx: Sender<LoaderMessage>) {
    const FAMILIES: &[&str] = &[
        "Helvetica",
        "Times",
        "Courier",
        "Symbol",
        "ZapfDingbats",
    ];
    let mut families = Vec::with_capacity(FAMILIES.len());
    for name in FAMILIES {
        // 真实实现里每一族要解析磁盘上的字体文件
        tokio::task::yield_now().await;
        families.push(CompactString::from(*name));
    }
    let _ = tx.send(LoaderMessage::FontsLoaded(families));
}
