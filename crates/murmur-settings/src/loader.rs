//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MurmurSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `MURMUR_*` environment overrides
//!
//! Validation is left to the caller so command-line flags can be applied
//! first.

use std::path::{Path, PathBuf};

use murmur_core::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::MurmurSettings;

/// Resolve the default settings file (`~/.murmur/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".murmur").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<MurmurSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. An unreadable file or invalid JSON is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<MurmurSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<MurmurSettings> {
    let defaults = serde_json::to_value(MurmurSettings::default())?;

    let merged = match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "loading settings from file");
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "settings file not found, using defaults");
            defaults
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `MURMUR_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut MurmurSettings) {
    apply_env_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `MURMUR_*` overrides using `lookup` to read variables.
///
/// Empty values are treated as unset. Values that fail to parse or fall
/// outside their range are logged at `warn` and ignored.
pub fn apply_env_overrides_from<F>(settings: &mut MurmurSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("MURMUR_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("MURMUR_PORT", |s| parse_u16_range(s, 0, u16::MAX)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("MURMUR_SEND_QUEUE_CAPACITY", |s| {
        parse_usize_range(s, 1, 1_000_000)
    }) {
        settings.server.send_queue_capacity = v;
    }
    if let Some(v) = env.parsed("MURMUR_HEARTBEAT_INTERVAL_MS", |s| {
        parse_u64_range(s, 100, 3_600_000)
    }) {
        settings.server.heartbeat_interval_ms = v;
    }

    // ── History ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("MURMUR_HISTORY_CAPACITY", |s| {
        parse_usize_range(s, 0, 1_000_000)
    }) {
        settings.history.capacity = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("MURMUR_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("MURMUR_LOG_FORMAT", |s| s.parse::<LogFormat>().ok()) {
        settings.logging.format = v;
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(val.trim());
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u16` within an inclusive range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
