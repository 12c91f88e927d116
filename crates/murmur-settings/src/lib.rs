//! # murmur-settings
//!
//! Layered configuration for the murmur chat relay.
//!
//! Settings are resolved from these layers (lowest to highest priority):
//! 1. **Compiled defaults**: [`MurmurSettings::default()`]
//! 2. **Settings file**: `~/.murmur/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables**: `MURMUR_*` overrides
//!
//! Command-line flags are applied on top by the binary. After all layers,
//! [`MurmurSettings::validate`] clamps out-of-range values.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_env_overrides_from, deep_merge, load_settings,
    load_settings_from_path, settings_path,
};
pub use types::{HistorySettings, LoggingSettings, MurmurSettings, ServerSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = MurmurSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_match_protocol_defaults() {
        let settings = MurmurSettings::default();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8765);
        assert_eq!(settings.history.capacity, 100);
        assert_eq!(settings.server.send_queue_capacity, 256);
        assert_eq!(settings.logging.level, "info");
    }
}
