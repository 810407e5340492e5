//! The pool of daily tasks and the images posted alongside them.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use tracing::instrument;

use crate::error::CatalogError;

/// Image extensions accepted as decorative assets (compared case-insensitively).
pub const ASSET_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

/// Tasks and images to pick from. Read once at startup and never modified.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: Vec<String>,
    assets: Vec<PathBuf>,
}

impl TaskCatalog {
    /// Build a catalog, dropping blank tasks and files that aren't images.
    pub fn new(
        tasks: impl IntoIterator<Item = String>,
        assets: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        let tasks = tasks
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let assets = assets.into_iter().filter(|p| is_asset(p)).collect();
        Self { tasks, assets }
    }

    /// Read tasks from `tasks_file` (one per line) and images from `assets_dir`.
    /// Either one missing just means an empty pool.
    #[instrument(skip_all, fields(tasks = %tasks_file.as_ref().display(), assets = %assets_dir.as_ref().display()))]
    pub async fn load(
        tasks_file: impl AsRef<Path>,
        assets_dir: impl AsRef<Path>,
    ) -> Result<Self, CatalogError> {
        let tasks_file = tasks_file.as_ref();
        let tasks: Vec<String> = match tokio::fs::read_to_string(tasks_file).await {
            Ok(content) => content.lines().map(String::from).collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("No task file at {}.", tasks_file.display());
                Vec::new()
            }
            Err(source) => {
                return Err(CatalogError::Unreadable {
                    path: tasks_file.to_path_buf(),
                    source,
                })
            }
        };

        let assets_dir = assets_dir.as_ref();
        let unreadable = |source: std::io::Error| CatalogError::Unreadable {
            path: assets_dir.to_path_buf(),
            source,
        };
        let mut assets = Vec::new();
        match tokio::fs::read_dir(assets_dir).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
                    assets.push(entry.path());
                }
                // Directory order is platform dependent.
                assets.sort();
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("No image directory at {}.", assets_dir.display());
            }
            Err(source) => return Err(unreadable(source)),
        }

        let catalog = Self::new(tasks, assets);
        tracing::info!(
            "Loaded {} tasks and {} images.",
            catalog.tasks.len(),
            catalog.assets.len()
        );
        Ok(catalog)
    }

    /// Pick a random task.
    pub fn pick_task(&self) -> Result<&str, CatalogError> {
        self.tasks
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .ok_or(CatalogError::EmptyCatalog)
    }

    /// Pick a random image.
    pub fn pick_asset(&self) -> Result<&Path, CatalogError> {
        self.assets
            .choose(&mut rand::thread_rng())
            .map(PathBuf::as_path)
            .ok_or(CatalogError::NoAssets)
    }
}

/// Does `path` have one of the [ASSET_EXTENSIONS]?
fn is_asset(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_task_is_always_picked() {
        let catalog = TaskCatalog::new(["Drink a glass of water".to_string()], Vec::new());

        for _ in 0..20 {
            assert_eq!(catalog.pick_task().unwrap(), "Drink a glass of water");
        }
    }

    #[test]
    fn empty_catalog_fails() {
        let catalog = TaskCatalog::new(["".to_string(), "   ".to_string()], Vec::new());

        assert!(matches!(catalog.pick_task(), Err(CatalogError::EmptyCatalog)));
    }

    #[test]
    fn assets_are_filtered_by_extension() {
        let files = ["a.PNG", "b.txt", "c.jpeg", "d", "e.Gif", "f.png.bak"].map(PathBuf::from);
        let catalog = TaskCatalog::new(Vec::new(), files);

        for _ in 0..20 {
            let picked = catalog.pick_asset().unwrap();
            assert!(["a.PNG", "c.jpeg", "e.Gif"]
                .map(Path::new)
                .contains(&picked));
        }
    }

    #[test]
    fn no_matching_assets_fails() {
        let catalog = TaskCatalog::new(Vec::new(), [PathBuf::from("notes.md")]);

        assert!(matches!(catalog.pick_asset(), Err(CatalogError::NoAssets)));
    }

    #[tokio::test]
    async fn load_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let tasks = dir.path().join("tasks.txt");
        let images = dir.path().join("images");
        std::fs::write(&tasks, "Stretch for five minutes\n\n").unwrap();
        std::fs::create_dir(&images).unwrap();
        std::fs::write(images.join("sun.jpg"), b"").unwrap();
        std::fs::write(images.join("readme.txt"), b"").unwrap();

        let catalog = TaskCatalog::load(&tasks, &images).await.unwrap();

        assert_eq!(catalog.pick_task().unwrap(), "Stretch for five minutes");
        assert_eq!(catalog.pick_asset().unwrap(), images.join("sun.jpg"));
    }

    #[tokio::test]
    async fn load_tolerates_missing_sources() {
        let dir = tempfile::tempdir().unwrap();

        let catalog = TaskCatalog::load(dir.path().join("nope.txt"), dir.path().join("nope"))
            .await
            .unwrap();

        assert!(matches!(catalog.pick_task(), Err(CatalogError::EmptyCatalog)));
        assert!(matches!(catalog.pick_asset(), Err(CatalogError::NoAssets)));
    }
}
