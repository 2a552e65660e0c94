//! Contact detection over a capacitance heatmap: local maxima above
//! the activation threshold seed clusters, a flood fill over
//! 8-connected cells above the (lower) membership threshold grows
//! them, and a weighted-moment Gaussian fit turns each surviving
//! cluster into a [`Blob`].

use crate::config::DetectorConfig;
use crate::heatmap::Heatmap;

/// A Gaussian-ellipse fit of one cluster of heatmap cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Blob {
    /// Sub-cell centroid, in cell units.
    pub x: f32,
    pub y: f32,
    /// Standard deviation along the major axis, in cells.
    pub major: f32,
    /// Standard deviation along the minor axis, in cells.
    pub minor: f32,
    /// Major axis angle in radians, within `[0, pi)`.
    pub orientation: f32,
    /// Peak heatmap value inside the cluster.
    pub value: f32,
    /// Cleared for degenerate fits (empty weight, singular covariance).
    pub valid: bool,
}

/// Weighted raw moments of one cluster, accumulated in f64 so that
/// cancellation in the central moments stays harmless.
#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    weight: f64,
    sx: f64,
    sy: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
    peak: f32,
    cells: usize,
}

impl Moments {
    fn add(&mut self, x: usize, y: usize, value: f32) {
        let w = f64::from(value);
        let x = x as f64;
        let y = y as f64;

        self.weight += w;
        self.sx += w * x;
        self.sy += w * y;
        self.sxx += w * x * x;
        self.syy += w * y * y;
        self.sxy += w * x * y;
        self.peak = self.peak.max(value);
        self.cells += 1;
    }
}

/// Neighbors that must be strictly smaller for a cell to be a maximum.
const STRICT: [(i32, i32); 4] = [(-1, -1), (0, -1), (1, -1), (-1, 0)];

/// Neighbors that may be equal. The asymmetry guarantees that a plateau
/// of equal values contributes exactly one maximum.
const WEAK: [(i32, i32); 4] = [(1, 0), (-1, 1), (0, 1), (1, 1)];

const UNASSIGNED: usize = usize::MAX;

/// Finds and fits contact blobs in a heatmap.
///
/// All scratch buffers are owned and reused, so steady-state detection
/// does not allocate.
pub struct BlobDetector {
    config: DetectorConfig,
    maxima: Vec<usize>,
    /// Union-find parent pointers keyed by flat cell index;
    /// `UNASSIGNED` marks cells outside every cluster.
    parent: Vec<usize>,
    stack: Vec<usize>,
    clusters: Vec<(usize, Moments)>,
    blobs: Vec<Blob>,
}

impl BlobDetector {
    pub fn new(config: DetectorConfig) -> Self {
        BlobDetector {
            config,
            maxima: Vec::new(),
            parent: Vec::new(),
            stack: Vec::new(),
            clusters: Vec::new(),
            blobs: Vec::new(),
        }
    }

    /// Runs all three stages and returns the fitted blobs, in
    /// arbitrary but deterministic order.
    pub fn detect(&mut self, heatmap: &Heatmap) -> &[Blob] {
        self.maxima.clear();
        self.parent.clear();
        self.parent.resize(heatmap.width() * heatmap.height(), UNASSIGNED);
        self.clusters.clear();
        self.blobs.clear();

        self.find_maxima(heatmap);
        self.cluster(heatmap);

        for index in 0..self.clusters.len() {
            let (_, moments) = self.clusters[index];
            if moments.cells < self.config.min_cluster {
                continue;
            }

            let blob = fit(&moments);
            if blob.valid {
                self.blobs.push(blob);
            }
        }

        &self.blobs
    }

    fn find_maxima(&mut self, heatmap: &Heatmap) {
        for y in 0..heatmap.height() {
            for x in 0..heatmap.width() {
                let value = heatmap.value(x, y);
                if value > self.config.activation && is_maximum(heatmap, x, y, value) {
                    self.maxima.push(y * heatmap.width() + x);
                }
            }
        }
    }

    /// Grows a cluster from every maximum. A later maximum that an
    /// earlier flood already swallowed starts no new cluster, and
    /// floods that touch each other merge through the union-find.
    fn cluster(&mut self, heatmap: &Heatmap) {
        let width = heatmap.width() as i32;
        let height = heatmap.height() as i32;

        for index in 0..self.maxima.len() {
            let seed = self.maxima[index];
            if self.parent[seed] != UNASSIGNED {
                continue;
            }

            self.parent[seed] = seed;
            self.stack.clear();
            self.stack.push(seed);

            while let Some(cell) = self.stack.pop() {
                let cx = (cell % width as usize) as i32;
                let cy = (cell / width as usize) as i32;

                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        let nx = cx + dx;
                        let ny = cy + dy;
                        if (dx == 0 && dy == 0) || nx < 0 || nx >= width || ny < 0 || ny >= height
                        {
                            continue;
                        }

                        if heatmap.value(nx as usize, ny as usize) <= self.config.membership {
                            continue;
                        }

                        let neighbor = ny as usize * width as usize + nx as usize;
                        if self.parent[neighbor] == UNASSIGNED {
                            self.parent[neighbor] = cell;
                            self.stack.push(neighbor);
                        } else {
                            let a = find(&mut self.parent, cell);
                            let b = find(&mut self.parent, neighbor);
                            if a != b {
                                self.parent[b] = a;
                            }
                        }
                    }
                }
            }
        }

        // accumulate moments per cluster root
        for cell in 0..self.parent.len() {
            if self.parent[cell] == UNASSIGNED {
                continue;
            }

            let root = find(&mut self.parent, cell);
            let index = match self.clusters.iter().position(|(r, _)| *r == root) {
                Some(index) => index,
                None => {
                    self.clusters.push((root, Moments::default()));
                    self.clusters.len() - 1
                }
            };

            let x = cell % width as usize;
            let y = cell / width as usize;
            self.clusters[index].1.add(x, y, heatmap.value(x, y));
        }
    }
}

fn is_maximum(heatmap: &Heatmap, x: usize, y: usize, value: f32) -> bool {
    let width = heatmap.width() as i32;
    let height = heatmap.height() as i32;

    for &(neighbors, strict) in &[(STRICT, true), (WEAK, false)] {
        for &(dx, dy) in neighbors.iter() {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || nx >= width || ny < 0 || ny >= height {
                continue;
            }

            let other = heatmap.value(nx as usize, ny as usize);
            if value < other || (strict && value == other) {
                return false;
            }
        }
    }

    true
}

fn find(parent: &mut [usize], mut cell: usize) -> usize {
    while parent[cell] != cell {
        parent[cell] = parent[parent[cell]];
        cell = parent[cell];
    }

    cell
}

/// Fits a 2-D Gaussian to a cluster via its weighted central moments.
/// The eigenvalues of the covariance matrix are computed in closed
/// form; their roots are the axis lengths and the eigenvector of the
/// larger one gives the orientation.
fn fit(moments: &Moments) -> Blob {
    if moments.weight <= 0.0 {
        return Blob::default();
    }

    let xbar = moments.sx / moments.weight;
    let ybar = moments.sy / moments.weight;
    let mu20 = moments.sxx / moments.weight - xbar * xbar;
    let mu02 = moments.syy / moments.weight - ybar * ybar;
    let mu11 = moments.sxy / moments.weight - xbar * ybar;

    let mean = 0.5 * (mu20 + mu02);
    let spread = {
        let diff = 0.5 * (mu20 - mu02);
        (diff * diff + mu11 * mu11).sqrt()
    };
    let large = mean + spread;
    let small = mean - spread;

    if !large.is_finite() || small <= f64::EPSILON {
        return Blob::default();
    }

    let mut angle = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
    if angle < 0.0 {
        angle += std::f64::consts::PI;
    }

    Blob {
        x: xbar as f32,
        y: ybar as f32,
        major: large.sqrt() as f32,
        minor: small.sqrt() as f32,
        orientation: angle as f32,
        value: moments.peak,
        valid: true,
    }
}
