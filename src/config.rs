//! Server Configuration
//!
//! Loaded from `GLYPH_DUEL_*` environment variables. Unparseable values are
//! reported and replaced by the default.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::engine::{EngineConfig, DEFAULT_RESULTS_SINK};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Connections silent for this long are dropped.
    pub idle_timeout: Duration,
    /// Minimum spacing between one user's requests.
    pub cooldown: Duration,
    /// JSON stats file. `None` keeps stats in memory.
    pub stats_path: Option<PathBuf>,
    /// JSON word list. `None` uses the built-in vocabulary.
    pub words_path: Option<PathBuf>,
    /// Engine settings.
    pub engine: EngineConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            idle_timeout: Duration::from_secs(300),
            cooldown: Duration::from_millis(2000),
            stats_path: None,
            words_path: None,
            engine: EngineConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let engine = EngineConfig {
            seed: parse_or("GLYPH_DUEL_SEED", &lookup, None, |v| v.parse::<u64>().map(Some)),
            results_sink: lookup("GLYPH_DUEL_RESULTS_CHANNEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_RESULTS_SINK.to_string()),
            ..defaults.engine
        };

        Self {
            bind_addr: parse_or("GLYPH_DUEL_BIND", &lookup, defaults.bind_addr, |v| {
                SocketAddr::from_str(v)
            }),
            max_connections: parse_or(
                "GLYPH_DUEL_MAX_CONNECTIONS",
                &lookup,
                defaults.max_connections,
                |v| v.parse::<usize>(),
            ),
            cooldown: parse_or("GLYPH_DUEL_COOLDOWN_MS", &lookup, defaults.cooldown, |v| {
                v.parse::<u64>().map(Duration::from_millis)
            }),
            stats_path: lookup("GLYPH_DUEL_STATS_PATH").map(PathBuf::from),
            words_path: lookup("GLYPH_DUEL_WORDS_PATH").map(PathBuf::from),
            engine,
            ..defaults
        }
    }
}

fn parse_or<T, E: Display>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
    parse: impl Fn(&str) -> Result<T, E>,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => parse(raw.trim()).unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "Invalid config value, using default");
            default
        }),
    }
}
