use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::content::GeneratedContent;

/// Most-recent-first list of completed generations, written through to a
/// single JSON array on every change.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    items: Vec<GeneratedContent>,
}

impl HistoryStore {
    /// Reads the persisted array once. Unreadable or corrupt content is
    /// logged and treated as an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match read_history(&path) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to parse history: {err:#}");
                Vec::new()
            }
        };
        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn items(&self) -> &[GeneratedContent] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&GeneratedContent> {
        self.items.first()
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedContent> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Looks an entry up by 1-based listing position or by id.
    pub fn find(&self, key: &str) -> Option<&GeneratedContent> {
        let key = key.trim();
        if let Ok(position) = key.parse::<usize>() {
            if position >= 1 {
                if let Some(item) = self.items.get(position - 1) {
                    return Some(item);
                }
            }
        }
        self.get(key)
    }

    /// Prepends a completed generation and persists the full list. The
    /// in-memory list only changes once the write has succeeded.
    pub fn prepend(&mut self, item: GeneratedContent) -> anyhow::Result<()> {
        let mut candidate = Vec::with_capacity(self.items.len() + 1);
        candidate.push(item);
        candidate.extend(self.items.iter().cloned());
        write_history(&self.path, &candidate)?;
        self.items = candidate;
        Ok(())
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        write_history(&self.path, &self.items)
    }
}

fn read_history(path: &Path) -> anyhow::Result<Vec<GeneratedContent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a history array", path.display()))?;
    Ok(items)
}

fn write_history(path: &Path, items: &[GeneratedContent]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_string(items)?)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
