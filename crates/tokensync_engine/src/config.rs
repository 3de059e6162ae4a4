//! Configuration for synchronization runs.

use crate::sort::SORT_ORDER_SPACING;
use tokensync_model::{Brand, DesignSystemVersion};

/// Configuration for a synchronization session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Version whose tokens are synchronized.
    pub version: DesignSystemVersion,
    /// Brand the local definition belongs to.
    pub brand: Brand,
    /// Distance between consecutive sort orders.
    pub sort_spacing: i64,
    /// Whether `sync` writes the computed diff back.
    pub write_back: bool,
}

impl SyncConfig {
    /// Creates a new configuration.
    pub fn new(version: DesignSystemVersion, brand: Brand) -> Self {
        Self {
            version,
            brand,
            sort_spacing: SORT_ORDER_SPACING,
            write_back: false,
        }
    }

    /// Sets the sort order spacing.
    pub fn with_sort_spacing(mut self, spacing: i64) -> Self {
        self.sort_spacing = spacing;
        self
    }

    /// Sets whether `sync` writes back.
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new(
            DesignSystemVersion::new("ds1", "v1"),
            Brand::new("brand-1", "Default"),
        );
        assert_eq!(config.sort_spacing, 100);
        assert!(!config.write_back);

        let config = config.with_sort_spacing(10).with_write_back(true);
        assert_eq!(config.version.design_system_id, "ds1");
        assert_eq!(config.brand.persistent_id, "brand-1");
        assert_eq!(config.sort_spacing, 10);
        assert!(config.write_back);
    }
}
