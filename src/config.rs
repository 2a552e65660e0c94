//! Pipeline tunables and their construction-time validation.
//!
//! A malformed configuration is the only fatal error the core knows;
//! everything is checked once by [`Config::validate`] before a pipeline
//! is built, never per frame.

/// Errors detected while validating a [`Config`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("cluster membership threshold {membership} must lie below the activation threshold {activation}")]
    ThresholdOrder { activation: f32, membership: f32 },

    #[error("minimum cluster size must be at least one cell")]
    EmptyCluster,

    #[error("maximum contact movement per frame must be positive, got {0}")]
    InvalidMaxDistance(f32),

    #[error("temporal window must be nonzero when temporal checks are enabled")]
    EmptyTemporalWindow,

    #[error("{axis} break band {hi} lies below its dead band {lo}")]
    InvertedThresholds {
        axis: &'static str,
        lo: f32,
        hi: f32,
    },
}

/// A dead-band/break-band pair for one stabilization stage.
///
/// Deltas below `lo` are absorbed entirely, deltas above `hi` mark the
/// contact unstable, anything in between passes through unchanged. The
/// unit is that of the stage it applies to: normalized coordinates for
/// position and size, half-turns for orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Thresholds {
    pub lo: f32,
    pub hi: f32,
}

/// Tunables of the blob detector.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct DetectorConfig {
    /// Heatmap value a cell must exceed to seed a local maximum.
    pub activation: f32,
    /// Lower value a cell must exceed to join a cluster during flood
    /// fill.
    pub membership: f32,
    /// Clusters with fewer cells than this are discarded.
    pub min_cluster: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            activation: 0.24,
            membership: 0.12,
            min_cluster: 3,
        }
    }
}

/// Tunables of the contact tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct TrackerConfig {
    /// Maximum movement per frame, in normalized coordinates, for a
    /// blob to inherit a previous contact's identity.
    pub max_distance: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig { max_distance: 0.1 }
    }
}

/// Tunables of the contact stabilizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct StabilizerConfig {
    /// Number of recent frames retained for temporal checks.
    pub temporal_window: usize,
    /// Whether a contact must be present throughout the temporal window
    /// before it is flagged stable.
    pub check_temporal: bool,
    /// Hysteresis on the width/height components; `None` disables the
    /// stage.
    pub size: Option<Thresholds>,
    /// Hysteresis on the Euclidean movement of the mean.
    pub position: Option<Thresholds>,
    /// Hysteresis on the circular orientation delta.
    pub orientation: Option<Thresholds>,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        StabilizerConfig {
            temporal_window: 3,
            check_temporal: true,
            size: Some(Thresholds { lo: 0.05, hi: 0.35 }),
            position: Some(Thresholds { lo: 0.005, hi: 0.25 }),
            orientation: Some(Thresholds { lo: 0.02, hi: 0.25 }),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Config {
    pub detector: DetectorConfig,
    pub tracker: TrackerConfig,
    pub stability: StabilizerConfig,
}

impl Config {
    /// Checks every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detector.membership > self.detector.activation {
            return Err(ConfigError::ThresholdOrder {
                activation: self.detector.activation,
                membership: self.detector.membership,
            });
        }
        if self.detector.min_cluster == 0 {
            return Err(ConfigError::EmptyCluster);
        }
        if !(self.tracker.max_distance > 0.0) {
            return Err(ConfigError::InvalidMaxDistance(self.tracker.max_distance));
        }
        if self.stability.check_temporal && self.stability.temporal_window == 0 {
            return Err(ConfigError::EmptyTemporalWindow);
        }

        for &(axis, thresholds) in &[
            ("size", self.stability.size),
            ("position", self.stability.position),
            ("orientation", self.stability.orientation),
        ] {
            if let Some(t) = thresholds {
                if t.hi < t.lo {
                    return Err(ConfigError::InvertedThresholds {
                        axis,
                        lo: t.lo,
                        hi: t.hi,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn inverted_bands_are_rejected() {
        let mut config = Config::default();
        config.stability.position = Some(Thresholds { lo: 0.5, hi: 0.1 });

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedThresholds {
                axis: "position",
                lo: 0.5,
                hi: 0.1,
            })
        );
    }

    #[test]
    fn zero_window_with_temporal_checks_is_rejected() {
        let mut config = Config::default();
        config.stability.temporal_window = 0;

        assert_eq!(config.validate(), Err(ConfigError::EmptyTemporalWindow));

        // without temporal checks a zero window is fine
        config.stability.check_temporal = false;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn membership_above_activation_is_rejected() {
        let mut config = Config::default();
        config.detector.membership = config.detector.activation + 0.1;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { .. })
        ));
    }
}
