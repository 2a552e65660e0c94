//! Scenario tests for the touch pipeline: detection, tracking and
//! stabilization over synthetic heatmaps.

use ipts::protocol::HeatmapDim;
use ipts::{
    Config, Contact, DetectorConfig, EventSink, StabilizerConfig, StylusEvent, Thresholds,
    TouchProcessor, TrackerConfig,
};

const WIDTH: usize = 72;
const HEIGHT: usize = 48;

#[derive(Default)]
struct Recorder {
    frames: Vec<Vec<Contact>>,
}

impl EventSink for Recorder {
    fn emit_stylus(&mut self, _: &StylusEvent) {}

    fn emit_contacts(&mut self, frame: &[Contact]) {
        self.frames.push(frame.to_vec());
    }
}

fn dim() -> HeatmapDim {
    HeatmapDim {
        height: HEIGHT as u8,
        width: WIDTH as u8,
        y_min: 0,
        y_max: 255,
        x_min: 0,
        x_max: 255,
        z_min: 0,
        z_max: 255,
    }
}

/// Raw cells of one or more Gaussian spots with sigma 2 and peak 1.0,
/// encoded the way the device reports them (idle cells at z_max).
fn cells(spots: &[(f32, f32)]) -> Vec<u8> {
    let mut raw = vec![0; WIDTH * HEIGHT];

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let mut value: f32 = 0.0;
            for &(cx, cy) in spots {
                let dx = (x as f32 - cx) / 2.0;
                let dy = (y as f32 - cy) / 2.0;
                value += (-0.5 * (dx * dx + dy * dy)).exp();
            }

            raw[y * WIDTH + x] = (255.0 - value.min(1.0) * 255.0).round() as u8;
        }
    }

    raw
}

fn config(position: Option<Thresholds>) -> Config {
    Config {
        detector: DetectorConfig {
            activation: 0.1,
            membership: 0.05,
            min_cluster: 3,
        },
        tracker: TrackerConfig { max_distance: 0.2 },
        stability: StabilizerConfig {
            temporal_window: 2,
            check_temporal: true,
            size: None,
            position,
            orientation: None,
        },
    }
}

#[test]
fn empty_heatmap_produces_an_empty_frame() {
    let mut touch = TouchProcessor::new(&config(None)).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[]), &mut recorder);
    touch.process(&dim(), &cells(&[]), &mut recorder);

    assert_eq!(recorder.frames.len(), 2);
    assert!(recorder.frames.iter().all(Vec::is_empty));
}

#[test]
fn single_blob_is_detected_and_becomes_stable() {
    let mut touch = TouchProcessor::new(&config(None)).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);

    assert_eq!(recorder.frames.len(), 2);

    let first = &recorder.frames[0];
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].index, Some(0));
    assert!((first[0].x * WIDTH as f32 - 20.0).abs() <= 0.5);
    assert!((first[0].y * HEIGHT as f32 - 15.0).abs() <= 0.5);
    assert!(first[0].width >= first[0].height);
    assert!(first[0].width / first[0].height < 1.1);
    assert!(first[0].orientation >= 0.0 && first[0].orientation < 1.0);
    assert!(!first[0].stable);

    let second = &recorder.frames[1];
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].index, Some(0));
    assert!(second[0].stable);
}

#[test]
fn jitter_snaps_back_to_the_previous_mean() {
    let thresholds = Thresholds {
        lo: 0.5 / WIDTH as f32,
        hi: 5.0 / WIDTH as f32,
    };
    let mut touch = TouchProcessor::new(&config(Some(thresholds))).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    touch.process(&dim(), &cells(&[(20.3, 15.0)]), &mut recorder);

    let first = &recorder.frames[0][0];
    let second = &recorder.frames[1][0];

    assert_eq!(second.index, first.index);
    assert_eq!(second.x, first.x);
    assert_eq!(second.y, first.y);
    assert!(second.stable);
}

#[test]
fn teleport_keeps_the_new_mean_and_breaks_stability() {
    let thresholds = Thresholds {
        lo: 0.5 / WIDTH as f32,
        hi: 5.0 / WIDTH as f32,
    };
    let mut touch = TouchProcessor::new(&config(Some(thresholds))).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    touch.process(&dim(), &cells(&[(30.0, 15.0)]), &mut recorder);

    let second = &recorder.frames[1][0];

    assert_eq!(second.index, Some(0));
    assert!((second.x * WIDTH as f32 - 30.0).abs() <= 0.5);
    assert!(!second.stable);
}

#[test]
fn two_contacts_keep_their_identities_while_moving() {
    let mut touch = TouchProcessor::new(&config(None)).unwrap();
    let mut recorder = Recorder::default();

    for step in 0..4 {
        let shift = step as f32 * 0.5;
        let spots = [(15.0 + shift, 15.0), (50.0 + shift, 30.0)];
        touch.process(&dim(), &cells(&spots), &mut recorder);
    }

    let mut left_index = None;
    let mut right_index = None;

    for frame in &recorder.frames {
        assert_eq!(frame.len(), 2);

        let left = frame.iter().find(|c| c.x < 0.5).unwrap();
        let right = frame.iter().find(|c| c.x >= 0.5).unwrap();
        assert_ne!(left.index, right.index);

        match left_index {
            None => left_index = left.index,
            Some(_) => assert_eq!(left.index, left_index),
        }
        match right_index {
            None => right_index = right.index,
            Some(_) => assert_eq!(right.index, right_index),
        }
    }
}

#[test]
fn contacts_are_normalized() {
    let mut touch = TouchProcessor::new(&config(None)).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[(70.0, 46.0)]), &mut recorder);

    let contact = &recorder.frames[0][0];
    assert!(contact.x > 0.0 && contact.x <= 1.0);
    assert!(contact.y > 0.0 && contact.y <= 1.0);
    assert!(contact.width > 0.0 && contact.width < 1.0);
    assert!(contact.height > 0.0 && contact.height < 1.0);
    assert!(contact.valid);
}

#[test]
fn reset_forgets_identities_and_history() {
    let mut touch = TouchProcessor::new(&config(None)).unwrap();
    let mut recorder = Recorder::default();

    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    assert!(recorder.frames[1][0].stable);

    touch.reset();

    touch.process(&dim(), &cells(&[(20.0, 15.0)]), &mut recorder);
    let after = &recorder.frames[2][0];
    assert_eq!(after.index, Some(0));
    assert!(!after.stable);
}
