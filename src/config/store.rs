use arc_swap::ArcSwap;
use std::sync::{Arc, OnceLock};

use super::BridgeConfig;

/// Active configuration holder
///
/// Uses `ArcSwap` for lock-free reads; media and network threads consult it
/// on every frame, replacement is rare and comes from the boundary.
pub struct ConfigStore {
    cache: ArcSwap<BridgeConfig>,
}

impl ConfigStore {
    /// Create a store holding `config`
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            cache: ArcSwap::from_pointee(config),
        }
    }

    /// Get current configuration (lock-free)
    pub fn get(&self) -> Arc<BridgeConfig> {
        self.cache.load_full()
    }

    /// Replace the configuration
    pub fn set(&self, config: BridgeConfig) {
        self.cache.store(Arc::new(config));
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

/// Process-wide store used by the boundary surface
pub fn global() -> &'static ConfigStore {
    static STORE: OnceLock<ConfigStore> = OnceLock::new();
    STORE.get_or_init(ConfigStore::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let store = ConfigStore::default();
        let mut config = BridgeConfig::default();
        config.video.max_frame_dimension = 64;

        store.set(config.clone());
        assert_eq!(*store.get(), config);
    }

    #[test]
    fn test_set_replaces_whole_config() {
        let store = ConfigStore::default();
        let mut config = BridgeConfig::default();
        config.log.throttle_secs = 1;
        store.set(config);

        assert_eq!(store.get().log.throttle_secs, 1);
        assert_eq!(store.get().video.max_frame_dimension, 16384);
    }

    #[test]
    fn test_old_snapshot_unchanged() {
        let store = ConfigStore::default();
        let before = store.get();
        let mut config = BridgeConfig::default();
        config.log.json = true;
        store.set(config);

        assert!(!before.log.json);
        assert!(store.get().log.json);
    }
}
