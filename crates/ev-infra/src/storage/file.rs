use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ev_core::ports::KeyValueStorePort;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Durable key-value storage backed by a single JSON object file.
///
/// The whole map is rewritten on every mutation via a temp file + rename,
/// so readers see either the previous or the new state. A missing or
/// unreadable file starts an empty store.
pub struct FileKeyValueStore {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "durable storage file missing, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read storage failed: {}", self.path.display()))
            }
        };

        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "durable storage file is malformed, starting empty"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create storage dir failed: {}", dir.display()))?;
        }
        Ok(())
    }

    async fn atomic_write(&self, map: &BTreeMap<String, String>) -> Result<()> {
        self.ensure_parent_dir().await?;
        let content = serde_json::to_string_pretty(map).context("serialize storage failed")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp storage failed: {}", tmp_path.display()))?;

        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "rename temp storage to target failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }

    async fn with_map<T>(
        &self,
        mutate: bool,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> Result<T> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let map = guard.get_or_insert_with(BTreeMap::new);
        if !mutate {
            return Ok(f(map));
        }

        let mut next = map.clone();
        let out = f(&mut next);
        self.atomic_write(&next).await?;
        *map = next;
        Ok(out)
    }
}

#[async_trait]
impl KeyValueStorePort for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_map(false, |map| map.get(key).cloned()).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_map(true, |map| {
            map.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let present = self.with_map(false, |map| map.contains_key(key)).await?;
        if !present {
            return Ok(());
        }
        self.with_map(true, |map| {
            map.remove(key);
        })
        .await
    }
}
