//! The assembled touch pipeline and its output interface.

use log::warn;

use crate::config::{Config, ConfigError};
use crate::contact::Contact;
use crate::detector::BlobDetector;
use crate::heatmap::Heatmap;
use crate::protocol::{HeatmapDim, StylusMode};
use crate::stabilizer::ContactStabilizer;
use crate::tracker::ContactTracker;

/// A single decoded stylus element, in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StylusEvent {
    pub timestamp: u16,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub mode: StylusMode,
    pub x: u16,
    pub y: u16,
    pub pressure: u16,
    /// Tilt around the X axis in centidegrees.
    pub tilt_x: i32,
    /// Tilt around the Y axis in centidegrees.
    pub tilt_y: i32,
}

impl StylusEvent {
    pub fn proximity(&self) -> bool {
        self.mode.contains(StylusMode::PROXIMITY)
    }

    pub fn contact(&self) -> bool {
        self.mode.contains(StylusMode::CONTACT)
    }

    pub fn button(&self) -> bool {
        self.mode.contains(StylusMode::BUTTON)
    }

    pub fn rubber(&self) -> bool {
        self.mode.contains(StylusMode::RUBBER)
    }
}

/// Receiver for the pipeline's output, implemented by whatever turns
/// decoded input into OS events.
pub trait EventSink {
    /// Handles one stylus element, in device units.
    fn emit_stylus(&mut self, event: &StylusEvent);

    /// Handles one complete stabilized contact frame.
    fn emit_contacts(&mut self, frame: &[Contact]);
}

/// Detection, tracking and stabilization over assembled heatmaps.
///
/// Owns every buffer it needs across frames; processing a frame does
/// not allocate once the buffers reached their steady-state sizes.
pub struct TouchProcessor {
    heatmap: Heatmap,
    detector: BlobDetector,
    tracker: ContactTracker,
    stabilizer: ContactStabilizer,
    frame: Vec<Contact>,
}

impl TouchProcessor {
    /// Builds the pipeline, rejecting malformed configurations.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(TouchProcessor {
            heatmap: Heatmap::new(),
            detector: BlobDetector::new(config.detector),
            tracker: ContactTracker::new(&config.tracker, config.stability.temporal_window),
            stabilizer: ContactStabilizer::new(config.stability),
            frame: Vec::new(),
        })
    }

    /// Runs one raw heatmap through detection, tracking and
    /// stabilization, and emits the resulting contact frame.
    pub fn process<S: EventSink>(&mut self, dim: &HeatmapDim, raw: &[u8], sink: &mut S) {
        let width = usize::from(dim.width);
        let height = usize::from(dim.height);

        if width == 0 || height == 0 || raw.len() != width * height {
            warn!(
                "heatmap size mismatch: {}x{} advertised, {} bytes received",
                width,
                height,
                raw.len()
            );
            return;
        }

        self.heatmap.reset(width, height);
        self.heatmap.load(dim, raw);

        let diagonal = ((width * width + height * height) as f32).sqrt();
        self.frame.clear();
        for blob in self.detector.detect(&self.heatmap) {
            self.frame.push(Contact {
                index: None,
                x: blob.x / width as f32,
                y: blob.y / height as f32,
                width: blob.major / diagonal,
                height: blob.minor / diagonal,
                orientation: blob.orientation / std::f32::consts::PI,
                stable: false,
                valid: true,
            });
        }

        self.tracker.assign(&mut self.frame, self.stabilizer.last());
        self.stabilizer.stabilize(&mut self.frame);

        sink.emit_contacts(&self.frame);
    }

    /// Clears all temporal state: retained identities and the contact
    /// history window.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.stabilizer.reset();
    }
}
