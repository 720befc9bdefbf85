//! Global configuration options.
//!
//! The global configuration is read with [`global_config`] and changed with [`global_config_mut`].
//! Options that are specific to one array or group are instead set on its builder.

use std::{num::NonZeroU64, sync::OnceLock};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Tile Extents
/// > default: gene `1000`, contrast `3`, sample `100`
///
/// The tile extents of the gene, contrast, and sample dimensions of the arrays written by the [`StudyAssembler`](crate::study::StudyAssembler).
/// Tile extents are a storage tuning knob and have no effect on the values read back.
///
/// ## Study Tag Length
/// > default: `8`
///
/// The number of base-36 characters in a generated study tag, see [`IdentifierGenerator`](crate::identifier::IdentifierGenerator).
/// Contrast identifiers embed the tag, so a fixed length keeps them traceable to their study.
///
/// ## Validate FDR Monotonicity
/// > default: `true`
///
/// If true, the study assembler checks that within every contrast the FDR is non-decreasing as the p-value increases before anything is written.
///
/// ## Erase Uncommitted Fragments
/// > default: `true`
///
/// If true, the keys of an array fragment whose write failed are erased from the store.
/// Uncommitted fragments are never read either way.
#[derive(Debug, Clone)]
pub struct Config {
    gene_tile_extent: NonZeroU64,
    contrast_tile_extent: NonZeroU64,
    sample_tile_extent: NonZeroU64,
    study_tag_length: usize,
    validate_fdr_monotonicity: bool,
    erase_uncommitted_fragments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gene_tile_extent: NonZeroU64::MIN.saturating_add(999),
            contrast_tile_extent: NonZeroU64::MIN.saturating_add(2),
            sample_tile_extent: NonZeroU64::MIN.saturating_add(99),
            study_tag_length: 8,
            validate_fdr_monotonicity: true,
            erase_uncommitted_fragments: true,
        }
    }
}

impl Config {
    /// Get the gene dimension tile extent.
    #[must_use]
    pub fn gene_tile_extent(&self) -> NonZeroU64 {
        self.gene_tile_extent
    }

    /// Set the gene dimension tile extent.
    pub fn set_gene_tile_extent(&mut self, tile_extent: NonZeroU64) {
        self.gene_tile_extent = tile_extent;
    }

    /// Get the contrast dimension tile extent.
    #[must_use]
    pub fn contrast_tile_extent(&self) -> NonZeroU64 {
        self.contrast_tile_extent
    }

    /// Set the contrast dimension tile extent.
    pub fn set_contrast_tile_extent(&mut self, tile_extent: NonZeroU64) {
        self.contrast_tile_extent = tile_extent;
    }

    /// Get the sample dimension tile extent.
    #[must_use]
    pub fn sample_tile_extent(&self) -> NonZeroU64 {
        self.sample_tile_extent
    }

    /// Set the sample dimension tile extent.
    pub fn set_sample_tile_extent(&mut self, tile_extent: NonZeroU64) {
        self.sample_tile_extent = tile_extent;
    }

    /// Get the study tag length.
    #[must_use]
    pub fn study_tag_length(&self) -> usize {
        self.study_tag_length
    }

    /// Set the study tag length.
    ///
    /// The length is clamped to at least 1.
    pub fn set_study_tag_length(&mut self, study_tag_length: usize) {
        self.study_tag_length = study_tag_length.max(1);
    }

    /// Get the [validate FDR monotonicity](#validate-fdr-monotonicity) configuration.
    #[must_use]
    pub fn validate_fdr_monotonicity(&self) -> bool {
        self.validate_fdr_monotonicity
    }

    /// Set the [validate FDR monotonicity](#validate-fdr-monotonicity) configuration.
    pub fn set_validate_fdr_monotonicity(&mut self, validate_fdr_monotonicity: bool) {
        self.validate_fdr_monotonicity = validate_fdr_monotonicity;
    }

    /// Get the [erase uncommitted fragments](#erase-uncommitted-fragments) configuration.
    #[must_use]
    pub fn erase_uncommitted_fragments(&self) -> bool {
        self.erase_uncommitted_fragments
    }

    /// Set the [erase uncommitted fragments](#erase-uncommitted-fragments) configuration.
    pub fn set_erase_uncommitted_fragments(&mut self, erase_uncommitted_fragments: bool) {
        self.erase_uncommitted_fragments = erase_uncommitted_fragments;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global configuration.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.gene_tile_extent().get(), 1000);
        assert_eq!(config.contrast_tile_extent().get(), 3);
        assert_eq!(config.sample_tile_extent().get(), 100);
        assert_eq!(config.study_tag_length(), 8);
        assert!(config.validate_fdr_monotonicity());
        assert!(config.erase_uncommitted_fragments());
        assert_eq!(global_config().study_tag_length(), 8);
    }

    #[test]
    fn config_set() {
        let mut config = Config::default();
        config.set_study_tag_length(0);
        assert_eq!(config.study_tag_length(), 1);
        config.set_gene_tile_extent(NonZeroU64::MIN);
        assert_eq!(config.gene_tile_extent().get(), 1);
        config.set_erase_uncommitted_fragments(false);
        assert!(!config.erase_uncommitted_fragments());
    }
}
