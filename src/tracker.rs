//! Frame-to-frame contact identity assignment.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::config::TrackerConfig;
use crate::contact::Contact;

/// Assigns persistent identities to the contacts of each frame.
///
/// Candidate pairs between the current frame and the most recent
/// stabilized frame are gated by a maximum per-frame movement and
/// matched greedily in order of ascending distance, which preserves
/// identity indefinitely for distinct, well-separated contacts. Blobs
/// left unmatched receive the lowest identity that none of the last
/// `window` frames used, so an identity frees up once its contact has
/// been gone for longer than the temporal window.
pub struct ContactTracker {
    max_distance: f32,
    window: usize,
    /// Identity sets of the most recent `window` frames.
    recent: VecDeque<Vec<u32>>,
    pairs: Vec<(f32, usize, usize)>,
    assigned: Vec<bool>,
    claimed: Vec<bool>,
}

impl ContactTracker {
    pub fn new(config: &TrackerConfig, window: usize) -> Self {
        ContactTracker {
            max_distance: config.max_distance,
            window,
            recent: (0..window).map(|_| Vec::new()).collect(),
            pairs: Vec::new(),
            assigned: Vec::new(),
            claimed: Vec::new(),
        }
    }

    /// Fills in the `index` field of every contact in `current`, given
    /// the most recent stabilized frame.
    pub fn assign(&mut self, current: &mut [Contact], previous: &[Contact]) {
        self.pairs.clear();
        for (i, contact) in current.iter().enumerate() {
            for (j, prior) in previous.iter().enumerate() {
                if prior.index.is_none() {
                    continue;
                }

                let distance = contact.distance(prior);
                if distance <= self.max_distance {
                    self.pairs.push((distance, i, j));
                }
            }
        }

        // ties broken by index so the output is deterministic
        self.pairs.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| (a.1, a.2).cmp(&(b.1, b.2)))
        });

        self.assigned.clear();
        self.assigned.resize(current.len(), false);
        self.claimed.clear();
        self.claimed.resize(previous.len(), false);

        for index in 0..self.pairs.len() {
            let (_, i, j) = self.pairs[index];
            if self.assigned[i] || self.claimed[j] {
                continue;
            }

            current[i].index = previous[j].index;
            self.assigned[i] = true;
            self.claimed[j] = true;
        }

        for i in 0..current.len() {
            if current[i].index.is_none() {
                let id = self.mint(current);
                current[i].index = Some(id);
            }
        }

        if self.window > 0 {
            if let Some(mut ids) = self.recent.pop_front() {
                ids.clear();
                ids.extend(current.iter().filter_map(|c| c.index));
                self.recent.push_back(ids);
            }
        }
    }

    /// Lowest identity unused by both the current frame and the
    /// retained recent frames.
    fn mint(&self, current: &[Contact]) -> u32 {
        let mut id = 0;
        loop {
            let in_current = current.iter().any(|c| c.index == Some(id));
            let in_recent = self.recent.iter().any(|frame| frame.contains(&id));
            if !in_current && !in_recent {
                return id;
            }

            id += 1;
        }
    }

    /// Forgets all retained identities.
    pub fn reset(&mut self) {
        for frame in self.recent.iter_mut() {
            frame.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(x: f32, y: f32) -> Contact {
        Contact {
            index: None,
            x,
            y,
            width: 0.05,
            height: 0.05,
            orientation: 0.0,
            stable: false,
            valid: true,
        }
    }

    fn tracker() -> ContactTracker {
        ContactTracker::new(&TrackerConfig { max_distance: 0.1 }, 2)
    }

    #[test]
    fn fresh_contacts_get_the_lowest_identities() {
        let mut tracker = tracker();
        let mut frame = vec![contact(0.2, 0.2), contact(0.8, 0.6)];

        tracker.assign(&mut frame, &[]);

        assert_eq!(frame[0].index, Some(0));
        assert_eq!(frame[1].index, Some(1));
    }

    #[test]
    fn slow_movement_preserves_identity() {
        let mut tracker = tracker();

        let mut first = vec![contact(0.2, 0.2), contact(0.8, 0.6)];
        tracker.assign(&mut first, &[]);

        let mut second = vec![contact(0.79, 0.6), contact(0.21, 0.2)];
        tracker.assign(&mut second, &first);

        assert_eq!(second[0].index, Some(1));
        assert_eq!(second[1].index, Some(0));
    }

    #[test]
    fn teleport_mints_a_fresh_identity() {
        let mut tracker = tracker();

        let mut first = vec![contact(0.2, 0.2)];
        tracker.assign(&mut first, &[]);

        let mut second = vec![contact(0.7, 0.2)];
        tracker.assign(&mut second, &first);

        // the old identity is still within the window, so it may not be
        // reused yet
        assert_eq!(second[0].index, Some(1));
    }

    #[test]
    fn identity_is_reused_after_the_window() {
        let mut tracker = tracker();

        let mut first = vec![contact(0.2, 0.2)];
        tracker.assign(&mut first, &[]);
        assert_eq!(first[0].index, Some(0));

        // two empty frames flush identity 0 out of the window
        tracker.assign(&mut [], &first);
        tracker.assign(&mut [], &[]);

        let mut fresh = vec![contact(0.9, 0.9)];
        tracker.assign(&mut fresh, &[]);
        assert_eq!(fresh[0].index, Some(0));
    }

    #[test]
    fn nearest_pair_wins() {
        let mut tracker = tracker();

        let mut first = vec![contact(0.50, 0.5)];
        tracker.assign(&mut first, &[]);

        // both candidates are in range of the old contact; the closer
        // one inherits the identity
        let mut second = vec![contact(0.55, 0.5), contact(0.52, 0.5)];
        tracker.assign(&mut second, &first);

        assert_eq!(second[1].index, Some(0));
        assert_eq!(second[0].index, Some(1));
    }
}
