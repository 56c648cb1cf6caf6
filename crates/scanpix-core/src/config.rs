//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanpixError, check_range};

/// Top-level engine settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row partitioning for parallel work.
    pub partition: PartitionConfig,
    /// Default thresholds for blank-page detection.
    pub blank: BlankDetectionConfig,
    /// Defaults for format conversion.
    pub copy: CopyConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.partition.max_partitions == Some(0) {
            return Err(ScanpixError::InvalidParameter {
                name: "partition.max_partitions",
                value: 0.0,
                range: "[1, ∞)",
            });
        }
        if self.partition.min_rows_per_partition == 0 {
            return Err(ScanpixError::InvalidParameter {
                name: "partition.min_rows_per_partition",
                value: 0.0,
                range: "[1, ∞)",
            });
        }
        check_range(
            "blank.white_threshold",
            self.blank.white_threshold as f64,
            0.0,
            100.0,
            "[0, 100]",
        )?;
        check_range(
            "blank.coverage_threshold",
            self.blank.coverage_threshold as f64,
            0.0,
            100.0,
            "[0, 100]",
        )?;
        check_range(
            "copy.black_white_threshold",
            self.copy.black_white_threshold as f64,
            -1.0,
            1.0,
            "[-1, 1]",
        )
    }
}

/// How rows are split across workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Upper bound on partitions. `None` derives it from the processor
    /// count: `min(4, processors / 2)`, at least 1.
    pub max_partitions: Option<usize>,
    /// Smallest row count worth giving its own partition.
    pub min_rows_per_partition: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_partitions: None,
            min_rows_per_partition: 32,
        }
    }
}

/// Blank-page detection thresholds, both in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlankDetectionConfig {
    /// Brightness at or above which a pixel counts as white.
    pub white_threshold: u32,
    /// Share of non-white pixels (scaled into 0–1%) below which the page is blank.
    pub coverage_threshold: u32,
}

impl Default for BlankDetectionConfig {
    fn default() -> Self {
        Self {
            white_threshold: 70,
            coverage_threshold: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyConfig {
    /// Luma cut-off for conversion to 1-bit, in [-1, 1]; 0 is mid-gray.
    pub black_white_threshold: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.blank.white_threshold, 70);
    }

    #[test]
    fn test_partial_json_overrides_one_field() {
        let config =
            EngineConfig::from_json(r#"{ "partition": { "max_partitions": 2 } }"#).unwrap();
        assert_eq!(config.partition.max_partitions, Some(2));
        assert_eq!(config.partition.min_rows_per_partition, 32);
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "blank": { "white_threshold": 101 } }"#);
        assert!(matches!(err, Err(ScanpixError::InvalidParameter { .. })));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(
            EngineConfig::from_json("{ nope"),
            Err(ScanpixError::Config(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = EngineConfig::default();
        config.copy.black_white_threshold = -0.25;
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
