use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

const CACHE_NAMESPACE: &str = "trip-weather-cli";

/// Key to JSON store with a TTL. Absent and expired entries are both a miss.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: &Value) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub cached_at: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub age_secs: u64,
    pub is_fresh: bool,
}

/// One JSON file per key under `<dir>/trip-weather-cli/`.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    ttl_secs: u64,
}

impl FileCache {
    pub fn new(cache_dir: &Path, ttl_secs: u64) -> Self {
        Self {
            root: cache_dir.join(CACHE_NAMESPACE),
            ttl_secs,
        }
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_stem(key)))
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let path = self.path_for_key(key);
        let record = match read_record(&path) {
            Ok(record) => record?,
            Err(error) => {
                tracing::debug!(key, %error, "cache read failed, treating as miss");
                return None;
            }
        };
        if record.key != key {
            return None;
        }

        let freshness = evaluate_freshness(&record, now, self.ttl_secs);
        if !freshness.is_fresh {
            tracing::debug!(key, age_secs = freshness.age_secs, "cache entry expired");
            return None;
        }
        Some(record.payload)
    }

    pub fn set_at(&self, key: &str, value: &Value, now: DateTime<Utc>) -> io::Result<()> {
        let record = CacheRecord {
            key: key.to_string(),
            cached_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            payload: value.clone(),
        };
        let payload = serde_json::to_vec(&record)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error.to_string()))?;
        write_atomic(&self.path_for_key(key), &payload)
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    fn set(&self, key: &str, value: &Value) -> io::Result<()> {
        self.set_at(key, value, Utc::now())
    }
}

/// In-process cache with the same TTL rules as `FileCache`.
#[derive(Debug, Default)]
pub struct MemoryCache {
    ttl_secs: u64,
    entries: Mutex<HashMap<String, (DateTime<Utc>, Value)>>,
}

impl MemoryCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.lock().ok()?;
        let (stored_at, value) = entries.get(key)?;
        let age_secs = Utc::now()
            .signed_duration_since(*stored_at)
            .num_seconds()
            .max(0)
            .unsigned_abs();
        (age_secs <= self.ttl_secs).then(|| value.clone())
    }

    fn set(&self, key: &str, value: &Value) -> io::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory cache lock poisoned"))?;
        entries.insert(key.to_string(), (Utc::now(), value.clone()));
        Ok(())
    }
}

/// Hex SHA-256 of the key: fixed length and path safe for any key text.
pub fn file_stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

pub fn read_record(path: &Path) -> io::Result<Option<CacheRecord>> {
    if !path.exists() {
        return Ok(None);
    }

    let payload = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<CacheRecord>(&payload).ok();
    Ok(parsed)
}

pub fn evaluate_freshness(record: &CacheRecord, now: DateTime<Utc>, ttl_secs: u64) -> Freshness {
    let Some(cached_at) = parse_cached_at(record) else {
        return Freshness {
            age_secs: u64::MAX,
            is_fresh: false,
        };
    };
    let age_secs = now
        .signed_duration_since(cached_at)
        .num_seconds()
        .max(0)
        .try_into()
        .unwrap_or(u64::MAX);

    Freshness {
        age_secs,
        is_fresh: age_secs <= ttl_secs,
    }
}

pub fn parse_cached_at(record: &CacheRecord) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&record.cached_at)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "cache path must have a parent directory",
        )
    })?;
    fs::create_dir_all(parent)?;

    let sequence = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_path = path.with_extension(format!("{}-{sequence}.tmp", std::process::id()));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, hour, minute, 0)
            .single()
            .expect("time")
    }

    #[test]
    fn cache_file_stem_is_deterministic_and_path_safe() {
        let key = "openmeteo:archive:daily:41.38506,-2.17340:2024-07-01:2024-07-05";
        let stem = file_stem(key);
        assert_eq!(stem, file_stem(key));
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_file_stem_keeps_distinct_non_ascii_and_long_keys_apart() {
        assert_ne!(file_stem("nominatim:München"), file_stem("nominatim:Mönchen"));
        assert_ne!(file_stem("a:b"), file_stem("a,b"));

        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileCache::new(dir.path(), 300);
        let long_key = format!("nominatim:{}", "Llanfairpwllgwyngyll ".repeat(40));
        cache.set_at(&long_key, &json!({"lat": 53.2}), at(12, 0)).expect("write long key");
        cache.set_at("nominatim:München", &json!(1), at(12, 0)).expect("write");
        cache.set_at("nominatim:Mönchen", &json!(2), at(12, 0)).expect("write");

        assert_eq!(cache.get_at(&long_key, at(12, 1)), Some(json!({"lat": 53.2})));
        assert_eq!(cache.get_at("nominatim:München", at(12, 1)), Some(json!(1)));
        assert_eq!(cache.get_at("nominatim:Mönchen", at(12, 1)), Some(json!(2)));
    }

    #[test]
    fn cache_read_write_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileCache::new(dir.path(), 300);
        let payload = json!({"daily": {"time": ["2026-02-10"]}});

        cache.set_at("k", &payload, at(12, 0)).expect("write");
        assert_eq!(cache.get_at("k", at(12, 4)), Some(payload));
        assert!(cache.path_for_key("k").starts_with(dir.path().join(CACHE_NAMESPACE)));
    }

    #[test]
    fn cache_marks_entry_as_miss_after_ttl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileCache::new(dir.path(), 300);
        cache.set_at("k", &json!({"a": 1}), at(12, 0)).expect("write");

        assert_eq!(cache.get_at("k", at(12, 6)), None);
    }

    #[test]
    fn cache_handles_corrupt_payload_as_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileCache::new(dir.path(), 300);
        let path = cache.path_for_key("k");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "{not-json").expect("write");

        assert_eq!(cache.get_at("k", at(12, 0)), None);
    }

    #[test]
    fn cache_ignores_record_stored_under_another_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = FileCache::new(dir.path(), 300);
        cache.set_at("a:b", &json!(1), at(12, 0)).expect("write");
        fs::copy(cache.path_for_key("a:b"), cache.path_for_key("a,b")).expect("copy");

        assert_eq!(cache.get_at("a,b", at(12, 1)), None);
        assert_eq!(cache.get_at("a:b", at(12, 1)), Some(json!(1)));
    }

    #[test]
    fn cache_freshness_reports_age() {
        let record = CacheRecord {
            key: "k".to_string(),
            cached_at: "2026-02-10T12:00:00Z".to_string(),
            payload: Value::Null,
        };

        let fresh = evaluate_freshness(&record, at(12, 4), 300);
        assert_eq!(fresh.age_secs, 240);
        assert!(fresh.is_fresh);

        let stale = evaluate_freshness(&record, at(12, 6), 300);
        assert_eq!(stale.age_secs, 360);
        assert!(!stale.is_fresh);
    }

    #[test]
    fn cache_record_with_bad_timestamp_is_stale() {
        let record = CacheRecord {
            key: "k".to_string(),
            cached_at: "yesterday".to_string(),
            payload: Value::Null,
        };
        assert!(!evaluate_freshness(&record, at(12, 0), u64::MAX).is_fresh);
    }

    #[test]
    fn memory_cache_stores_and_returns_values() {
        let cache = MemoryCache::new(60);
        assert!(cache.is_empty());
        assert_eq!(cache.get("k"), None);

        cache.set("k", &json!({"lat": 1.0})).expect("set");
        assert_eq!(cache.get("k"), Some(json!({"lat": 1.0})));
        assert!(cache.contains_key("k"));
        assert_eq!(cache.len(), 1);
    }
}
