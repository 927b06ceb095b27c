use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tuning knobs for hit-testing and the insertion indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DndConfig {
    /// Fraction of a row's height, from the top, that resolves to `before`.
    pub before_zone: f64,
    /// Fraction of a row's height, from the bottom, that resolves to `after`.
    pub after_zone: f64,
    /// Height of the insertion band, in the same units as target rectangles.
    pub indicator_thickness: f64,
}

impl Default for DndConfig {
    fn default() -> Self {
        Self {
            before_zone: 0.25,
            after_zone: 0.25,
            indicator_thickness: 2.0,
        }
    }
}

impl DndConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn before_zone(mut self, fraction: f64) -> Self {
        self.before_zone = fraction;
        self
    }

    pub fn after_zone(mut self, fraction: f64) -> Self {
        self.after_zone = fraction;
        self
    }

    pub fn indicator_thickness(mut self, thickness: f64) -> Self {
        self.indicator_thickness = thickness;
        self
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        for (name, zone) in [("before_zone", self.before_zone), ("after_zone", self.after_zone)] {
            if !(0.0..=0.5).contains(&zone) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0.0..=0.5, got {zone}"
                )));
            }
        }
        if !(self.indicator_thickness > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "indicator_thickness must be positive, got {}",
                self.indicator_thickness
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = DndConfig::from_json(r#"{ "indicator_thickness": 1.0 }"#).unwrap();
        assert_eq!(config.before_zone, 0.25);
        assert_eq!(config.after_zone, 0.25);
        assert_eq!(config.indicator_thickness, 1.0);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = DndConfig::from_json(r#"{ "before_zone": 0.8 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = DndConfig::default()
            .indicator_thickness(0.0)
            .validated()
            .unwrap_err();
        assert!(err.to_string().contains("indicator_thickness"));

        let err = DndConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
