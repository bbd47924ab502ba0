//! Configuration for the systematics manager.
//!
//! Controls which partitions of the forest are retained and whether organism
//! positions are tracked. Every field has a default, so a partial TOML table
//! only overrides what it names.
//!
//! ## Example `phylotrack.toml`
//!
//! ```toml
//! store_outside = true
//! store_position = true
//! track_synchronous = false
//! ```

use serde::{Deserialize, Serialize};

/// Retention and tracking settings for a [`crate::Systematics`] manager.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SystematicsConfig {
    /// Keep the set of active taxa.
    pub store_active: bool,
    /// Keep extinct taxa that still have living descendants.
    pub store_ancestors: bool,
    /// Keep extinct taxa without living descendants instead of deleting them.
    pub store_outside: bool,
    /// Master switch for retaining dead history at all.
    pub archive: bool,
    /// Maintain a slot-to-taxon index so organisms can be addressed by position.
    pub store_position: bool,
    /// Births into population 1 fill the next generation, promoted by `update()`.
    pub track_synchronous: bool,
}

impl Default for SystematicsConfig {
    fn default() -> Self {
        Self {
            store_active: true,
            store_ancestors: true,
            store_outside: false,
            archive: true,
            store_position: false,
            track_synchronous: false,
        }
    }
}

impl SystematicsConfig {
    /// Keeps every taxon ever created.
    #[must_use]
    pub fn store_all() -> Self {
        Self {
            store_outside: true,
            ..Default::default()
        }
    }

    /// Validates the combination of settings.
    ///
    /// # Validation Rules
    /// - Outside taxa can only be stored while archiving is enabled
    /// - Synchronous tracking needs position tracking
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.store_outside || self.archive,
            "store_outside requires archive to be enabled"
        );
        anyhow::ensure!(
            !self.track_synchronous || self.store_position,
            "track_synchronous requires store_position to be enabled"
        );
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// True when dead taxa without descendants are kept.
    pub fn keeps_outside(&self) -> bool {
        self.store_outside && self.archive
    }
}
