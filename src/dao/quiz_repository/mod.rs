pub mod json_file;
#[cfg(test)]
pub mod memory;

use crate::dao::models::StoreDocument;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the durable location of the quiz store document.
///
/// Every `save` replaces the whole document; there is no partial update.
pub trait QuizRepository: Send + Sync {
    /// Read the stored document, or `None` when nothing has been written yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<StoreDocument>>>;
    /// Durably replace the stored document.
    fn save(&self, document: StoreDocument) -> BoxFuture<'static, StorageResult<()>>;
}
