//! Quiz store persisted as a single pretty-printed JSON file.

use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::BoxFuture;
use tokio::fs;
use tracing::debug;

use crate::dao::{
    models::StoreDocument,
    quiz_repository::QuizRepository,
    storage::{StorageError, StorageResult},
};

/// Repository that rewrites the whole store file on every save.
///
/// Writes land in a sibling temporary file that is then renamed over the target,
/// so readers never observe a half-written document.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: Arc<PathBuf>,
}

impl JsonFileRepository {
    /// Create a repository backed by the file at `path`. The file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl QuizRepository for JsonFileRepository {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<StoreDocument>>> {
        let path = self.path.clone();
        Box::pin(async move {
            let contents = match fs::read_to_string(path.as_ref()).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "quiz store file not found");
                    return Ok(None);
                }
                Err(err) => {
                    return Err(StorageError::unavailable(
                        format!("failed to read `{}`", path.display()),
                        err,
                    ));
                }
            };

            if contents.trim().is_empty() {
                return Ok(None);
            }

            serde_json::from_str::<StoreDocument>(&contents)
                .map(Some)
                .map_err(|err| {
                    StorageError::corrupt(format!("failed to parse `{}`: {err}", path.display()))
                })
        })
    }

    fn save(&self, document: StoreDocument) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec_pretty(&document).map_err(|err| {
                StorageError::unavailable("failed to serialize quiz store".into(), err)
            })?;

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await.map_err(|err| {
                    StorageError::unavailable(
                        format!("failed to create `{}`", parent.display()),
                        err,
                    )
                })?;
            }

            let tmp_path = path.with_extension("json.tmp");
            fs::write(&tmp_path, &payload).await.map_err(|err| {
                StorageError::unavailable(format!("failed to write `{}`", tmp_path.display()), err)
            })?;
            fs::rename(&tmp_path, path.as_ref()).await.map_err(|err| {
                StorageError::unavailable(
                    format!("failed to replace `{}`", path.display()),
                    err,
                )
            })?;

            debug!(
                path = %path.display(),
                quizzes = document.all_quizzes.len(),
                "quiz store written"
            );
            Ok(())
        })
    }
}
