//! File-backed topic instruction overrides with bounded backup history.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use forge_core::prompt_store::{MAX_PROMPT_BACKUPS, PromptBackup, PromptStore};
use forge_core::{ForgeError, Topic};
use tokio::sync::Mutex;

use crate::paths::ForgePaths;

/// Stores overrides in `prompts.json` and backups under
/// `backups/<topic>/backup-<millis>.json`.
///
/// Writes are serialized through an internal lock; each file write goes to a
/// temporary file first and is renamed into place.
pub struct FilePromptStore {
    prompts_file: PathBuf,
    backups_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePromptStore {
    pub fn new(paths: &ForgePaths) -> Self {
        Self {
            prompts_file: paths.prompts_file(),
            backups_dir: paths.backups_dir(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load_overrides(&self) -> Result<BTreeMap<String, String>, ForgeError> {
        match tokio::fs::read_to_string(&self.prompts_file).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_overrides(&self, overrides: &BTreeMap<String, String>) -> Result<(), ForgeError> {
        write_atomically(&self.prompts_file, &serde_json::to_string_pretty(overrides)?).await
    }

    fn topic_backups_dir(&self, topic: Topic) -> PathBuf {
        self.backups_dir.join(topic.key())
    }

    /// Backup files for `topic`, newest first, paired with their timestamp.
    async fn backup_files(&self, topic: Topic) -> Result<Vec<(u128, PathBuf)>, ForgeError> {
        let dir = self.topic_backups_dir(topic);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(millis) = backup_millis(&path) {
                files.push((millis, path));
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(files)
    }

    async fn create_backup(&self, topic: Topic, content: &str) -> Result<(), ForgeError> {
        let dir = self.topic_backups_dir(topic);
        tokio::fs::create_dir_all(&dir).await?;

        let now = Utc::now();
        let mut millis = now.timestamp_millis().max(0) as u128;
        let mut path = dir.join(format!("backup-{millis}.json"));
        while tokio::fs::try_exists(&path).await? {
            millis += 1;
            path = dir.join(format!("backup-{millis}.json"));
        }

        let backup = PromptBackup {
            timestamp: now.to_rfc3339(),
            content: content.to_string(),
        };
        write_atomically(&path, &serde_json::to_string_pretty(&backup)?).await?;

        for (_, stale) in self.backup_files(topic).await?.into_iter().skip(MAX_PROMPT_BACKUPS) {
            tracing::debug!("Pruning prompt backup {}", stale.display());
            tokio::fs::remove_file(&stale).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PromptStore for FilePromptStore {
    async fn get_override(&self, topic: Topic) -> Result<Option<String>, ForgeError> {
        Ok(self.load_overrides().await?.remove(&topic.key()))
    }

    async fn save_override(&self, topic: Topic, content: &str) -> Result<(), ForgeError> {
        let _guard = self.write_lock.lock().await;

        let mut overrides = self.load_overrides().await?;
        let previous = overrides
            .get(&topic.key())
            .cloned()
            .unwrap_or_else(|| topic.default_instruction().to_string());
        self.create_backup(topic, &previous).await?;

        overrides.insert(topic.key(), content.to_string());
        self.store_overrides(&overrides).await?;
        tracing::info!("Saved prompt override for {}", topic);
        Ok(())
    }

    async fn clear_override(&self, topic: Topic) -> Result<(), ForgeError> {
        let _guard = self.write_lock.lock().await;

        let mut overrides = self.load_overrides().await?;
        if let Some(previous) = overrides.remove(&topic.key()) {
            self.create_backup(topic, &previous).await?;
            self.store_overrides(&overrides).await?;
            tracing::info!("Cleared prompt override for {}", topic);
        }
        Ok(())
    }

    async fn list_backups(&self, topic: Topic) -> Result<Vec<PromptBackup>, ForgeError> {
        let mut backups = Vec::new();
        for (_, path) in self.backup_files(topic).await?.into_iter().take(MAX_PROMPT_BACKUPS) {
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str(&content) {
                Ok(backup) => backups.push(backup),
                Err(e) => tracing::warn!("Skipping unreadable backup {}: {}", path.display(), e),
            }
        }
        Ok(backups)
    }
}

fn backup_millis(path: &Path) -> Option<u128> {
    path.file_name()?
        .to_str()?
        .strip_prefix("backup-")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

async fn write_atomically(path: &Path, content: &str) -> Result<(), ForgeError> {
    let parent = path
        .parent()
        .ok_or_else(|| ForgeError::io(format!("{} has no parent directory", path.display())))?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .ok_or_else(|| ForgeError::io(format!("{} has no file name", path.display())))?;
    let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
