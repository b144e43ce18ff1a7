//! 文档锁
//!
//! 对文档的每次访问都必须显式取锁：只读检查用共享锁，任何变更用独占锁。
//! 守卫按 RAII 在所有退出路径上释放，禁止跨用户交互持锁：需要弹窗的
//! 路径一律通过 Effect 把请求还给调用方，锁不会活过一次 dispatch。

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::PdfDoc;

pub struct DocLock {
    inner: RwLock<PdfDoc>,
}

impl DocLock {
    pub fn new(doc: PdfDoc) -> Self {
        Self {
            inner: RwLock::new(doc),
        }
    }

    /// Shared lock for inspection-only access.
    pub fn read(&self) -> RwLockReadGuard<'_, PdfDoc> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive lock; required for every mutation.
    pub fn write(&self) -> RwLockWriteGuard<'_, PdfDoc> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn into_inner(self) -> PdfDoc {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_then_write() {
        let lock = DocLock::new(PdfDoc::new(2));
        {
            let doc = lock.read();
            assert_eq!(doc.page_count(), 2);
        }
        {
            let mut doc = lock.write();
            doc.add_pages(3, 1);
        }
        assert_eq!(lock.read().page_count(), 3);
    }

    #[test]
    fn test_concurrent_readers() {
        let lock = DocLock::new(PdfDoc::new(1));
        let a = lock.read();
        let b = lock.read();
        assert_eq!(a.page_count(), b.page_count());
    }
}
