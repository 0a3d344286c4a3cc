//! Configuration shape consumed by the core engine: persistence path,
//! snapshot period, and the gzip toggle. Loading this from a file or the
//! environment is left to the out-of-scope configuration-loading collaborator;
//! this crate only defines the shape and its defaults.
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Root directory the reference `PersistenceProvider` writes snapshots under.
    pub persist_base_path: String,

    /// Maintenance loop tick period, in seconds. Every filter is force-dumped
    /// at least this often.
    pub force_dump_period_secs: u64,

    /// Whether snapshot bodies are gzip-compressed.
    pub use_gzip: bool,
}

impl EngineConfig {
    pub fn force_dump_period(&self) -> Duration {
        Duration::from_secs(self.force_dump_period_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            persist_base_path: "./data".to_string(),
            force_dump_period_secs: 300,
            use_gzip: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert!(!cfg.persist_base_path.is_empty());
        assert!(cfg.force_dump_period_secs > 0);
    }

    #[test]
    fn force_dump_period_converts_to_duration() {
        let cfg = EngineConfig {
            persist_base_path: "/var/lib/bloomd".to_string(),
            force_dump_period_secs: 60,
            use_gzip: false,
        };
        assert_eq!(cfg.force_dump_period(), std::time::Duration::from_secs(60));
    }
}
