//! Configuration for the hierarchy manager.

use serde::{Deserialize, Serialize};

/// Tuning for [`HierarchyManager`](crate::hierarchy::HierarchyManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Number of batch items validated and written under one lock
    /// acquisition. Bounds how long a bulk operation blocks other writers.
    #[serde(default = "default_bulk_chunk_size")]
    pub bulk_chunk_size: usize,

    /// Largest accepted batch. Larger requests are rejected up front.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_bulk_chunk_size() -> usize {
    50
}

fn default_max_batch_size() -> usize {
    1000
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            bulk_chunk_size: default_bulk_chunk_size(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

impl HierarchyConfig {
    /// Sets the chunk size.
    pub fn with_bulk_chunk_size(mut self, size: usize) -> Self {
        self.bulk_chunk_size = size;
        self
    }

    /// Sets the maximum batch size.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Validates the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.bulk_chunk_size == 0 {
            errors.push("bulk_chunk_size must be greater than 0".to_string());
        }
        if self.max_batch_size == 0 {
            errors.push("max_batch_size must be greater than 0".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: HierarchyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HierarchyConfig::default());
        assert_eq!(config.bulk_chunk_size, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = HierarchyConfig::default()
            .with_bulk_chunk_size(0)
            .with_max_batch_size(0);
        assert_eq!(config.validate().unwrap_err().len(), 2);
    }
}
