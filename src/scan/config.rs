//! Scan configuration, validated once before any symbol is coded.

use crate::error::{CodecError, Result};
use crate::scan::predict::Predictor;

/// Conditioning thresholds of one component: the small threshold `L`
/// bounding the zero band and the large threshold `U` bounding the small
/// band. Read-only during the scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentParams {
    pub small: u8,
    pub large: u8,
}

impl Default for ComponentParams {
    fn default() -> Self {
        // The default conditioning bounds of the standard process.
        ComponentParams { small: 0, large: 1 }
    }
}

/// Everything a scan needs to know before the first sample. One instance
/// is shared, immutably, between the encode and decode halves; all mutable
/// state lives in the driver.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub width: u32,
    pub height: u32,
    /// Sample precision in bits, 2..=16.
    pub precision: u8,
    /// Point transform: samples arrive shifted down by this many bits.
    pub point_transform: u8,
    pub predictor: Predictor,
    /// Differential scans predict zero everywhere (hierarchical refinement).
    pub differential: bool,
    /// Restart interval in MCUs; 0 disables restart markers.
    pub restart_interval: u32,
    /// One entry per component, 1..=4.
    pub components: Vec<ComponentParams>,
}

impl ScanConfig {
    /// Check every constraint the scan relies on. Violations are fatal and
    /// surface before any byte moves.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::Configuration(format!(
                "frame dimensions {}x{} are empty",
                self.width, self.height
            )));
        }
        if self.components.is_empty() || self.components.len() > 4 {
            return Err(CodecError::Configuration(format!(
                "component count {} out of range 1..=4",
                self.components.len()
            )));
        }
        if !(2..=16).contains(&self.precision) {
            return Err(CodecError::Configuration(format!(
                "sample precision {} out of range 2..=16",
                self.precision
            )));
        }
        if self.point_transform >= self.precision {
            return Err(CodecError::Configuration(format!(
                "point transform {} leaves no sample bits at precision {}",
                self.point_transform, self.precision
            )));
        }
        for (i, c) in self.components.iter().enumerate() {
            if c.large > 15 {
                return Err(CodecError::Configuration(format!(
                    "component {i}: large threshold {} exceeds 15",
                    c.large
                )));
            }
            if c.small > c.large {
                return Err(CodecError::Configuration(format!(
                    "component {i}: small threshold {} exceeds large threshold {}",
                    c.small, c.large
                )));
            }
        }
        Ok(())
    }

    /// The prediction used where no causal neighbor exists: half the
    /// sample range, or zero for differential scans.
    pub(crate) fn neutral(&self) -> i32 {
        if self.differential {
            0
        } else {
            1 << (self.precision - self.point_transform - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ScanConfig {
        ScanConfig {
            width: 8,
            height: 8,
            precision: 8,
            point_transform: 0,
            predictor: Predictor::Plane,
            differential: false,
            restart_interval: 0,
            components: vec![ComponentParams::default()],
        }
    }

    #[test]
    fn a_plain_scan_validates() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn component_count_is_bounded() {
        let mut cfg = base();
        cfg.components.clear();
        assert!(cfg.validate().is_err());
        cfg.components = vec![ComponentParams::default(); 5];
        assert!(cfg.validate().is_err());
        cfg.components.truncate(4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn thresholds_must_be_ordered_and_in_range() {
        let mut cfg = base();
        cfg.components[0] = ComponentParams { small: 3, large: 2 };
        assert!(cfg.validate().is_err());
        cfg.components[0] = ComponentParams { small: 2, large: 16 };
        assert!(cfg.validate().is_err());
        cfg.components[0] = ComponentParams { small: 2, large: 6 };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn precision_and_point_transform_are_checked() {
        let mut cfg = base();
        cfg.precision = 1;
        assert!(cfg.validate().is_err());
        cfg.precision = 17;
        assert!(cfg.validate().is_err());
        cfg.precision = 8;
        cfg.point_transform = 8;
        assert!(cfg.validate().is_err());
        cfg.point_transform = 1;
        assert!(cfg.validate().is_ok());
        // Neutral prediction follows the shifted precision.
        assert_eq!(cfg.neutral(), 64);
    }

    #[test]
    fn differential_scans_predict_zero() {
        let mut cfg = base();
        cfg.differential = true;
        assert_eq!(cfg.neutral(), 0);
    }
}
