//! Runtime configuration loaded from the environment.

use std::env;
use std::path::PathBuf;

/// Checkpoint location used when `MNIST_SERVE_CHECKPOINT` is unset.
pub const DEFAULT_CHECKPOINT: &str = "/storage/model.pkl";

/// Log directive used when `MNIST_SERVE_LOG` is unset.
pub const DEFAULT_LOG: &str = "info";

/// Snapshot of configuration values consumed by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppCfg {
    pub checkpoint_path: PathBuf,
    pub log_filter: String,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            checkpoint_path: PathBuf::from(get("MNIST_SERVE_CHECKPOINT", DEFAULT_CHECKPOINT)),
            log_filter: get("MNIST_SERVE_LOG", DEFAULT_LOG),
        }
    }
}

impl Default for AppCfg {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
