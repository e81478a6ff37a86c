//! Topic instruction overrides.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};
use crate::topic::Topic;

/// How many backups are kept per topic.
pub const MAX_PROMPT_BACKUPS: usize = 10;

/// A previous topic instruction, captured before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBackup {
    /// RFC 3339 time the backup was taken.
    pub timestamp: String,
    pub content: String,
}

/// Storage for user overrides of the built-in topic instructions.
#[async_trait::async_trait]
pub trait PromptStore: Send + Sync {
    async fn get_override(&self, topic: Topic) -> Result<Option<String>>;

    /// Stores `content` as the override, backing up the text it replaces.
    async fn save_override(&self, topic: Topic, content: &str) -> Result<()>;

    /// Drops the override so the built-in instruction applies again.
    async fn clear_override(&self, topic: Topic) -> Result<()>;

    /// Backups for `topic`, most recent first.
    async fn list_backups(&self, topic: Topic) -> Result<Vec<PromptBackup>>;

    /// Makes backup `index` (0 is the most recent) the override again.
    ///
    /// Goes through [`save_override`](Self::save_override), so the text being
    /// replaced is backed up first.
    async fn restore_backup(&self, topic: Topic, index: usize) -> Result<PromptBackup> {
        let backups = self.list_backups(topic).await?;
        let len = backups.len();
        let backup = backups
            .into_iter()
            .nth(index)
            .ok_or(ForgeError::InvalidIndex { index, len })?;
        self.save_override(topic, &backup.content).await?;
        Ok(backup)
    }

    /// The instruction block to use for `topic`: the override if any,
    /// otherwise the built-in text.
    async fn instruction_for(&self, topic: Topic) -> Result<String> {
        Ok(self
            .get_override(topic)
            .await?
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| topic.default_instruction().to_string()))
    }
}

/// A store with no overrides; every topic uses its built-in text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPrompts;

#[async_trait::async_trait]
impl PromptStore for BuiltinPrompts {
    async fn get_override(&self, _topic: Topic) -> Result<Option<String>> {
        Ok(None)
    }

    async fn save_override(&self, topic: Topic, _content: &str) -> Result<()> {
        Err(ForgeError::config(format!(
            "built-in prompts are read-only ({topic})"
        )))
    }

    async fn clear_override(&self, _topic: Topic) -> Result<()> {
        Ok(())
    }

    async fn list_backups(&self, _topic: Topic) -> Result<Vec<PromptBackup>> {
        Ok(Vec::new())
    }
}
