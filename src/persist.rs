use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::data::SeasonDataset;

const CACHE_DIR: &str = "hoops_terminal";
const CACHE_FILE: &str = "datasets.json";
const CACHE_VERSION: u32 = 1;
const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    seasons: HashMap<String, CachedSeason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSeason {
    dataset: SeasonDataset,
    fetched_at: u64,
}

/// Fetched-dataset cache. Only the remote provider goes through this; the
/// SQLite and sample providers are already local.
pub fn load_cached_dataset(season: &str) -> Option<SeasonDataset> {
    let path = cache_path()?;
    let raw = fs::read_to_string(&path).ok()?;
    let cache = serde_json::from_str::<CacheFile>(&raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    let entry = cache.seasons.get(season)?;
    let now = now_secs()?;
    if now.saturating_sub(entry.fetched_at) > ttl_secs() {
        return None;
    }
    Some(entry.dataset.clone())
}

pub fn store_dataset(dataset: &SeasonDataset) {
    let Some(path) = cache_path() else {
        return;
    };
    let Some(dir) = path.parent() else {
        return;
    };
    let _ = fs::create_dir_all(dir);

    let mut cache = load_cache_file(&path).unwrap_or_default();
    cache.version = CACHE_VERSION;
    cache.seasons.insert(
        dataset.season.clone(),
        CachedSeason {
            dataset: dataset.clone(),
            fetched_at: now_secs().unwrap_or(0),
        },
    );

    if let Ok(json) = serde_json::to_string(&cache) {
        let tmp = path.with_extension("json.tmp");
        if fs::write(&tmp, json).is_ok() {
            let _ = fs::rename(&tmp, &path);
        }
    }
}

/// Path for an app-owned artifact (rendered graph, log file) inside the
/// cache dir. Creates the directory on first use.
pub fn artifact_path(file_name: &str) -> Option<PathBuf> {
    let dir = cache_path()?.parent()?.to_path_buf();
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join(file_name))
}

fn load_cache_file(path: &Path) -> Option<CacheFile> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<CacheFile>(&raw).ok()
}

fn cache_path() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
        }
    }
    // Fallback to ~/.cache on linux-like systems.
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(CACHE_FILE),
    )
}

fn ttl_secs() -> u64 {
    env::var("HOOPS_DATA_TTL_SECS")
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TTL_SECS)
        .max(60)
}

fn now_secs() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
