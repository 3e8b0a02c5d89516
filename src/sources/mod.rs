//! Source registry
//!
//! The effective source list is the built-in defaults with a persisted
//! override list applied on top. Overrides are stored as raw JSON objects so
//! a partial update (say, only `enabled`) stays partial on disk.

use crate::error::{Error, Result};
use crate::types::{SourceType, default_language};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use utoipa::ToSchema;

mod defaults;

pub use defaults::default_sources;

/// A persisted override: any subset of [`Source`] fields plus `name`
pub type SourceOverride = serde_json::Map<String, serde_json::Value>;

/// A configured article provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Unique name
    pub name: String,
    /// URL fetched by the pipeline
    pub endpoint: String,
    /// Disabled sources are skipped, never deleted
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Parser/normalizer selector
    #[serde(default)]
    pub source_type: SourceType,
    /// Category stamped on produced articles
    #[serde(default)]
    pub category: String,
    /// Language of the source's titles
    #[serde(default = "default_language")]
    pub language: String,
    /// Credential sent with requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-type settings (`itemsPath`, `fields`, `itemSelector`, `maxItems`)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    #[schema(value_type = Object)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

fn default_enabled() -> bool {
    true
}

impl Source {
    /// Read a string option
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Read an unsigned integer option
    pub fn option_usize(&self, key: &str) -> Option<usize> {
        self.options
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
    }
}

fn override_name(entry: &SourceOverride) -> Option<&str> {
    entry
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|n| !n.trim().is_empty())
}

fn shallow_merge(target: &mut SourceOverride, patch: &SourceOverride) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

/// Apply persisted overrides to the defaults
///
/// Defaults keep their order, with same-named overrides merged field by field
/// (persisted wins). Overrides with no matching default follow in persisted
/// order. Repeated names merge into one entry, later fields winning. Entries
/// that do not form a valid source are logged and dropped.
pub fn merge(defaults: &[Source], persisted: &[SourceOverride]) -> Vec<Source> {
    let mut merged: Vec<(String, SourceOverride)> = Vec::with_capacity(defaults.len());

    for source in defaults {
        match serde_json::to_value(source) {
            Ok(serde_json::Value::Object(map)) => merged.push((source.name.clone(), map)),
            _ => tracing::warn!(source = %source.name, "default source does not serialize to an object"),
        }
    }

    for entry in persisted {
        let Some(name) = override_name(entry) else {
            tracing::warn!("ignoring persisted source override without a name");
            continue;
        };
        match merged.iter_mut().find(|(n, _)| n == name) {
            Some((_, target)) => shallow_merge(target, entry),
            None => merged.push((name.to_string(), entry.clone())),
        }
    }

    merged
        .into_iter()
        .filter_map(|(name, map)| {
            match serde_json::from_value::<Source>(serde_json::Value::Object(map)) {
                Ok(source) => Some(source),
                Err(e) => {
                    tracing::warn!(source = %name, error = %e, "dropping invalid source definition");
                    None
                }
            }
        })
        .collect()
}

/// Read the persisted override list
///
/// `None` when the file is absent. Malformed content is logged and also
/// treated as `None`, so a corrupt file never keeps the node from starting.
pub async fn load(path: &Path) -> Option<Vec<SourceOverride>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read source overrides");
            return None;
        }
    };

    match serde_json::from_str::<Vec<SourceOverride>>(&raw) {
        Ok(list) => Some(list),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "malformed source overrides, ignoring");
            None
        }
    }
}

/// Persist the full override list atomically
///
/// Writes a sibling temp file and renames it over `path`; the parent
/// directory is created if missing.
pub async fn save(path: &Path, overrides: &[SourceOverride]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(overrides)?;
    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, &body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Owner of the persisted override list
pub struct SourceRegistry {
    path: PathBuf,
    defaults: Vec<Source>,
    overrides: RwLock<Vec<SourceOverride>>,
}

impl SourceRegistry {
    /// Load overrides from `path` and merge them with `defaults`
    pub async fn open(path: impl Into<PathBuf>, defaults: Vec<Source>) -> Self {
        let path = path.into();
        let overrides = load(&path).await.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            defaults = defaults.len(),
            overrides = overrides.len(),
            "source registry loaded"
        );
        Self {
            path,
            defaults,
            overrides: RwLock::new(overrides),
        }
    }

    /// Effective source list
    pub async fn sources(&self) -> Vec<Source> {
        merge(&self.defaults, &self.overrides.read().await)
    }

    /// Enabled sources only
    pub async fn enabled(&self) -> Vec<Source> {
        self.sources()
            .await
            .into_iter()
            .filter(|s| s.enabled)
            .collect()
    }

    /// Look up one source by name
    pub async fn get(&self, name: &str) -> Option<Source> {
        self.sources().await.into_iter().find(|s| s.name == name)
    }

    /// Persisted override list as stored
    pub async fn overrides(&self) -> Vec<SourceOverride> {
        self.overrides.read().await.clone()
    }

    /// Upsert an override and persist the full list
    ///
    /// Merges `partial` into the existing override named `name`, or appends a
    /// new one. The resulting source must be valid; nothing is written
    /// otherwise. Returns the effective merged source.
    pub async fn update(&self, name: &str, mut partial: SourceOverride) -> Result<Source> {
        if name.trim().is_empty() {
            return Err(Error::Validation("source name must not be empty".into()));
        }
        partial.insert("name".into(), serde_json::Value::String(name.to_string()));

        let mut overrides = self.overrides.write().await;
        let mut next = overrides.clone();
        match next
            .iter_mut()
            .find(|entry| override_name(entry) == Some(name))
        {
            Some(existing) => shallow_merge(existing, &partial),
            None => next.push(partial),
        }

        let source = merge(&self.defaults, &next)
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "source '{}' needs at least a valid endpoint",
                    name
                ))
            })?;

        save(&self.path, &next).await?;
        *overrides = next;

        tracing::info!(source = %name, enabled = source.enabled, "source override saved");
        Ok(source)
    }
}
