//! Durable storage of the current cycle's responses.
//!
//! The tally lives in memory behind a mutex and every change is written through
//! to one file per [Category], each a newline separated list of user ids.
//! A missing file is an empty category.
//! Files are replaced together: all are staged as `<file>.tmp` before any is renamed into place.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use delegate::delegate;
use serenity::UserId;
use tokio::sync::Mutex;
use tracing::instrument;

use super::response::Category;
use super::response::Tally;
use crate::error::StorageError;
use crate::serenity;

/// Handle to the response store.
/// Internally uses an [Arc], so it's cheap to clone.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    /// The tally, also used to serialize writes.
    inner: Arc<Mutex<Tally>>,
    /// Directory holding the category files.
    dir: Arc<PathBuf>,
}

impl ResponseStore {
    /// An empty store writing to `dir`. Nothing is read or created yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Default::default(),
            dir: Arc::new(dir.into()),
        }
    }

    /// Open the store in `dir`, loading whatever responses were saved there.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let store = Self::new(dir.as_ref());
        let mut tally = Tally::default();

        // Later categories win if a user somehow ended up in several files.
        for category in Category::ALL {
            let path = store.path(category);
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(StorageError::Read { path, source }),
            };
            for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match line.parse::<u64>() {
                    Ok(id) if id != 0 => tally.record(UserId::new(id), category),
                    _ => tracing::warn!("Skipping bad user id '{line}' in {}", path.display()),
                }
            }
        }

        tracing::info!(
            "Loaded {} responses from {}.",
            tally.participants().len(),
            store.dir.display()
        );
        *store.inner.lock().await = tally;
        Ok(store)
    }

    /// Create the directory and empty category files if they don't exist yet.
    pub async fn ensure_initialized(&self) -> Result<(), StorageError> {
        let _lock = self.inner.lock().await;
        self.create_missing().await
    }

    /// Record `category` as the answer of `user`, replacing and returning any previous answer.
    /// On failure, the previous answers are kept.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        user: UserId,
        category: Category,
    ) -> Result<Option<Category>, StorageError> {
        let mut tally = self.inner.lock().await;
        let previous = tally.category_of(user);
        let mut next = tally.clone();
        next.record(user, category);
        self.persist(&tally, &next).await?;
        *tally = next;
        Ok(previous)
    }

    /// Forget every response. On failure, the previous answers are kept.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<(), StorageError> {
        let mut tally = self.inner.lock().await;
        let next = Tally::default();
        self.persist(&tally, &next).await?;
        *tally = next;
        tracing::info!("Response store reset.");
        Ok(())
    }

    delegate! {
        to self.inner.lock().await {
            /// Everyone who answered this cycle.
            #[await(false)]
            pub async fn participants(&self) -> HashSet<UserId>;
            /// A copy of the whole tally, taken under a single lock.
            #[await(false)]
            #[call(clone)]
            pub async fn snapshot(&self) -> Tally;
        }
    }

    /// Path of the file storing `category`.
    fn path(&self, category: Category) -> PathBuf {
        self.dir.join(category.file_name())
    }

    async fn create_missing(&self) -> Result<(), StorageError> {
        let dir = self.dir.as_path();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Write {
                path: dir.to_path_buf(),
                source,
            })?;

        for category in Category::ALL {
            let path = self.path(category);
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|source| StorageError::Read {
                    path: path.clone(),
                    source,
                })?;
            if !exists {
                tokio::fs::write(&path, "")
                    .await
                    .map_err(|source| StorageError::Write { path, source })?;
            }
        }
        Ok(())
    }

    /// Path `category` is staged at before replacing its file.
    fn staging_path(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.tmp", category.file_name()))
    }

    /// Replace every category file with the contents of `next`.
    ///
    /// All files are staged first and only renamed into place once every write went through.
    /// If a rename fails, the files already replaced are restored from `current`.
    async fn persist(&self, current: &Tally, next: &Tally) -> Result<(), StorageError> {
        self.create_missing().await?;

        if let Err(e) = self.stage(next, &Category::ALL).await {
            self.discard_staged().await;
            return Err(e);
        }

        for (done, category) in Category::ALL.into_iter().enumerate() {
            let path = self.path(category);
            if let Err(source) = tokio::fs::rename(self.staging_path(category), &path).await {
                self.discard_staged().await;
                self.restore(current, &Category::ALL[..done]).await;
                return Err(StorageError::Write { path, source });
            }
        }
        Ok(())
    }

    /// Write the staging files of `categories` from `tally`.
    async fn stage(&self, tally: &Tally, categories: &[Category]) -> Result<(), StorageError> {
        for &category in categories {
            let path = self.staging_path(category);
            tokio::fs::write(&path, file_content(tally, category))
                .await
                .map_err(|source| StorageError::Write { path, source })?;
        }
        Ok(())
    }

    /// Put the files of `categories` back the way `tally` has them.
    async fn restore(&self, tally: &Tally, categories: &[Category]) {
        for &category in categories {
            let restored = match self.stage(tally, &[category]).await {
                Ok(()) => tokio::fs::rename(self.staging_path(category), self.path(category))
                    .await
                    .map_err(|source| StorageError::Write {
                        path: self.path(category),
                        source,
                    }),
                Err(e) => Err(e),
            };
            if let Err(e) = restored {
                tracing::error!("Could not restore {category} responses: {e}");
            }
        }
    }

    /// Remove leftover staging files.
    async fn discard_staged(&self) {
        for category in Category::ALL {
            let path = self.staging_path(category);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not remove {}: {e}", path.display()),
            }
        }
    }
}

/// Newline separated ids of everyone in `category`.
fn file_content(tally: &Tally, category: Category) -> String {
    tally
        .all(category)
        .iter()
        .map(|id| format!("{id}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn record_is_mutually_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());

        let first = store.record(user(1), Category::Completed).await.unwrap();
        store.record(user(1), Category::Attempted).await.unwrap();
        let last = store.record(user(1), Category::Skipped).await.unwrap();

        assert_eq!(first, None);
        assert_eq!(last, Some(Category::Attempted));
        assert!(store.snapshot().await.all(Category::Completed).is_empty());
        assert!(store.snapshot().await.all(Category::Attempted).is_empty());
        assert_eq!(store.snapshot().await.all(Category::Skipped), vec![user(1)]);
    }

    #[tokio::test]
    async fn double_record_keeps_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());

        store.record(user(5), Category::Completed).await.unwrap();
        store.record(user(5), Category::Completed).await.unwrap();

        assert_eq!(store.snapshot().await.all(Category::Completed), vec![user(5)]);
        let file = std::fs::read_to_string(dir.path().join("completed.txt")).unwrap();
        assert_eq!(file, "5\n");
    }

    #[tokio::test]
    async fn uninitialized_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path().join("never_created"));

        for category in Category::ALL {
            assert!(store.snapshot().await.all(category).is_empty());
        }
        assert!(!dir.path().join("never_created").exists());
    }

    #[tokio::test]
    async fn ensure_initialized_creates_files_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path().join("responses"));

        store.ensure_initialized().await.unwrap();
        store.record(user(2), Category::Attempted).await.unwrap();
        store.ensure_initialized().await.unwrap();

        for category in Category::ALL {
            assert!(dir.path().join("responses").join(category.file_name()).exists());
        }
        assert_eq!(store.snapshot().await.all(Category::Attempted), vec![user(2)]);
    }

    #[tokio::test]
    async fn reset_clears_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        store.record(user(1), Category::Completed).await.unwrap();
        store.record(user(2), Category::Attempted).await.unwrap();
        store.record(user(3), Category::Skipped).await.unwrap();

        store.reset().await.unwrap();
        store.reset().await.unwrap();

        for category in Category::ALL {
            assert!(store.snapshot().await.all(category).is_empty());
            let file = std::fs::read_to_string(dir.path().join(category.file_name())).unwrap();
            assert!(file.is_empty());
        }
        assert!(store.participants().await.is_empty());
    }

    #[tokio::test]
    async fn open_loads_saved_responses() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = ResponseStore::new(dir.path());
            store.record(user(10), Category::Completed).await.unwrap();
            store.record(user(11), Category::Completed).await.unwrap();
            store.record(user(12), Category::Skipped).await.unwrap();
        }

        let store = ResponseStore::open(dir.path()).await.unwrap();

        assert_eq!(
            store.snapshot().await.all(Category::Completed),
            vec![user(10), user(11)]
        );
        assert_eq!(store.snapshot().await.all(Category::Skipped), vec![user(12)]);
        assert_eq!(store.snapshot().await.category_of(user(12)), Some(Category::Skipped));
    }

    #[tokio::test]
    async fn open_skips_garbage_and_resolves_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("completed.txt"), "1\nnot a user\n\n2\n").unwrap();
        std::fs::write(dir.path().join("skipped.txt"), "2\n").unwrap();

        let store = ResponseStore::open(dir.path()).await.unwrap();

        assert_eq!(store.snapshot().await.all(Category::Completed), vec![user(1)]);
        assert!(store.snapshot().await.all(Category::Attempted).is_empty());
        assert_eq!(store.snapshot().await.all(Category::Skipped), vec![user(2)]);
    }

    #[tokio::test]
    async fn open_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::open(dir.path().join("missing")).await.unwrap();

        assert!(store.participants().await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be makes every write fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let store = ResponseStore::new(&blocked);

        let result = store.record(user(1), Category::Completed).await;

        assert!(matches!(result, Err(StorageError::Write { .. })));
        assert!(store.snapshot().await.all(Category::Completed).is_empty());
    }

    #[tokio::test]
    async fn failed_rename_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        store.record(user(1), Category::Completed).await.unwrap();
        // Only the second file can't be replaced.
        let attempted = dir.path().join("attempted.txt");
        std::fs::remove_file(&attempted).unwrap();
        std::fs::create_dir(&attempted).unwrap();

        let result = store.record(user(1), Category::Attempted).await;

        assert!(matches!(result, Err(StorageError::Write { .. })));
        let completed = std::fs::read_to_string(dir.path().join("completed.txt")).unwrap();
        assert_eq!(completed, "1\n");
        for category in Category::ALL {
            assert!(!store.staging_path(category).exists());
        }

        std::fs::remove_dir(&attempted).unwrap();
        let reopened = ResponseStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.snapshot().await.category_of(user(1)),
            Some(Category::Completed)
        );
    }
}
