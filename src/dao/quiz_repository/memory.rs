//! In-memory repository used by tests, with switchable failures.

use std::{
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;

use crate::dao::{
    models::StoreDocument,
    quiz_repository::QuizRepository,
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Inner {
    document: Mutex<Option<StoreDocument>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

/// Repository keeping the last saved document in memory.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StoreDocument) -> Self {
        let repository = Self::default();
        *repository.inner.document.lock().unwrap() = Some(document);
        repository
    }

    pub fn document(&self) -> Option<StoreDocument> {
        self.inner.document.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl QuizRepository for MemoryRepository {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<StoreDocument>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail_loads.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    "load refused".into(),
                    io::Error::other("disk offline"),
                ));
            }
            Ok(inner.document.lock().unwrap().clone())
        })
    }

    fn save(&self, document: StoreDocument) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            if inner.fail_saves.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    "save refused".into(),
                    io::Error::other("disk offline"),
                ));
            }
            inner.saves.fetch_add(1, Ordering::SeqCst);
            *inner.document.lock().unwrap() = Some(document);
            Ok(())
        })
    }
}
