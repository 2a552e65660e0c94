//! Temporal smoothing of tracked contacts.
//!
//! The stabilizer keeps a fixed-length window of recent contact frames
//! and damps per-frame jitter with a dead-band/break-band rule: changes
//! below the dead band snap back to the previous value, changes above
//! the break band clear the contact's `stable` flag, anything in
//! between passes through untouched.

use std::collections::VecDeque;

use crate::config::{StabilizerConfig, Thresholds};
use crate::contact::Contact;

/// Aspect ratio below which a fitted ellipse is considered circular
/// and its orientation meaningless.
const MIN_ASPECT: f32 = 1.1;

enum Band {
    Snap,
    Accept,
    Break,
}

fn band(delta: f32, thresholds: &Thresholds) -> Band {
    if delta < thresholds.lo {
        Band::Snap
    } else if delta > thresholds.hi {
        Band::Break
    } else {
        Band::Accept
    }
}

/// Owns the contact history window and applies the hysteresis rules.
///
/// The deque always holds exactly `temporal_window` frames; it starts
/// out padded with empty ones. The history is not exposed beyond the
/// read-only view of the newest frame that the tracker consumes.
pub struct ContactStabilizer {
    config: StabilizerConfig,
    history: VecDeque<Vec<Contact>>,
}

impl ContactStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        ContactStabilizer {
            history: (0..config.temporal_window).map(|_| Vec::new()).collect(),
            config,
        }
    }

    /// The most recent stabilized frame.
    pub fn last(&self) -> &[Contact] {
        self.history.back().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Stabilizes a tracked frame in place, then rotates it into the
    /// history window.
    pub fn stabilize(&mut self, contacts: &mut Vec<Contact>) {
        let window = self.config.temporal_window;
        let check = self.config.check_temporal && window >= 2;

        for contact in contacts.iter_mut() {
            contact.stable = !check || self.seen_throughout(contact.index);

            if window < 2 {
                continue;
            }

            let prior = match contact.index {
                Some(index) => self
                    .last()
                    .iter()
                    .find(|c| c.index == Some(index))
                    .copied(),
                None => None,
            };
            let prior = match prior {
                Some(prior) => prior,
                None => continue,
            };

            if let Some(thresholds) = self.config.size {
                match band((contact.width - prior.width).abs(), &thresholds) {
                    Band::Snap => contact.width = prior.width,
                    Band::Break => contact.stable = false,
                    Band::Accept => {}
                }
                match band((contact.height - prior.height).abs(), &thresholds) {
                    Band::Snap => contact.height = prior.height,
                    Band::Break => contact.stable = false,
                    Band::Accept => {}
                }
            }

            if let Some(thresholds) = self.config.position {
                match band(contact.distance(&prior), &thresholds) {
                    Band::Snap => {
                        contact.x = prior.x;
                        contact.y = prior.y;
                    }
                    Band::Break => contact.stable = false,
                    Band::Accept => {}
                }
            }

            if let Some(thresholds) = self.config.orientation {
                let aspect = if contact.height > 0.0 {
                    contact.width / contact.height
                } else {
                    f32::INFINITY
                };

                if aspect < MIN_ASPECT {
                    contact.orientation = 0.0;
                } else {
                    // circular delta in half-turns, so that values near
                    // 0 and near 1 count as close
                    let raw = (contact.orientation - prior.orientation).abs();
                    match band(raw.min(1.0 - raw), &thresholds) {
                        Band::Snap => contact.orientation = prior.orientation,
                        Band::Break => contact.stable = false,
                        Band::Accept => {}
                    }
                }
            }
        }

        if window > 0 {
            if let Some(mut oldest) = self.history.pop_front() {
                oldest.clear();
                oldest.extend_from_slice(contacts);
                self.history.push_back(oldest);
            }
        }
    }

    /// Whether the identity was present in every frame of the window
    /// that ends at the current frame. The current frame counts as the
    /// newest member, so only the `window - 1` most recent stored
    /// frames are consulted.
    fn seen_throughout(&self, index: Option<u32>) -> bool {
        let index = match index {
            Some(index) => index,
            None => return false,
        };

        self.history
            .iter()
            .skip(1)
            .all(|frame| frame.iter().any(|c| c.index == Some(index)))
    }

    /// Drops the content of every stored frame, keeping the window
    /// length.
    pub fn reset(&mut self) {
        for frame in self.history.iter_mut() {
            frame.clear();
        }
    }
}
