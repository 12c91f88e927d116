//! Package-level constants and protocol defaults.

/// Current version of murmur (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "murmur";

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8765;

/// Default number of messages retained for replay to new clients.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
