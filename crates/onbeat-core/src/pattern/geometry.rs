//! Slider path geometry
//!
//! Each path is sampled once into a polyline with a cumulative arclength
//! table. Traversal maps progress through that table rather than through the
//! raw curve parameter, so a cursor following a Bézier or arc moves at a
//! constant speed regardless of curvature.

use serde::{Deserialize, Serialize};

use crate::types::{Point, Rect};

/// Pixels of control polygon per Bézier sample segment
const BEZIER_SAMPLE_SPACING: f32 = 8.0;

/// Pixels of arc per arc sample segment
const ARC_SAMPLE_SPACING: f32 = 15.0;

/// Bounds on polyline resolution
const MIN_SAMPLES: usize = 8;
const MAX_SAMPLES: usize = 512;

/// Analytic curve behind a slider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathShape {
    /// Straight segment
    Line { start: Point, end: Point },
    /// Cubic Bézier with four control points
    Bezier { points: [Point; 4] },
    /// Circular arc; `sweep` is signed (radians, positive = counter-clockwise)
    Arc {
        center: Point,
        radius: f32,
        start_angle: f32,
        sweep: f32,
    },
}

impl PathShape {
    /// Point at raw curve parameter `t` in `0..=1`
    pub fn point_at(&self, t: f32) -> Point {
        match *self {
            PathShape::Line { start, end } => start.lerp(end, t),
            PathShape::Bezier { points: [p0, p1, p2, p3] } => {
                let u = 1.0 - t;
                p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
            }
            PathShape::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => center + Point::from_angle(start_angle + sweep * t) * radius,
        }
    }

    /// Derivative with respect to the raw parameter
    pub fn tangent_at(&self, t: f32) -> Point {
        match *self {
            PathShape::Line { start, end } => end - start,
            PathShape::Bezier { points: [p0, p1, p2, p3] } => {
                let u = 1.0 - t;
                (p1 - p0) * (3.0 * u * u) + (p2 - p1) * (6.0 * u * t) + (p3 - p2) * (3.0 * t * t)
            }
            PathShape::Arc {
                radius,
                start_angle,
                sweep,
                ..
            } => Point::from_angle(start_angle + sweep * t).perp() * (radius * sweep),
        }
    }

    /// Polyline resolution for this shape
    fn sample_count(&self) -> usize {
        let n = match *self {
            PathShape::Line { .. } => 2,
            PathShape::Bezier { points: [p0, p1, p2, p3] } => {
                let polygon = p0.distance(p1) + p1.distance(p2) + p2.distance(p3);
                (polygon / BEZIER_SAMPLE_SPACING) as usize
            }
            PathShape::Arc { radius, sweep, .. } => (radius * sweep).abs() as usize / ARC_SAMPLE_SPACING as usize + 2,
        };
        match self {
            PathShape::Line { .. } => n,
            _ => n.clamp(MIN_SAMPLES, MAX_SAMPLES),
        }
    }

    /// Same shape scaled by `factor` around `origin`
    pub fn scaled_about(&self, origin: Point, factor: f32) -> PathShape {
        let scale = |p: Point| origin + (p - origin) * factor;
        match *self {
            PathShape::Line { start, end } => PathShape::Line {
                start: scale(start),
                end: scale(end),
            },
            PathShape::Bezier { points } => PathShape::Bezier {
                points: points.map(scale),
            },
            PathShape::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => PathShape::Arc {
                center: scale(center),
                radius: radius * factor,
                start_angle,
                sweep,
            },
        }
    }
}

/// A sampled path with constant-speed parameterization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderPath {
    shape: PathShape,
    /// Polyline samples at evenly spaced raw parameters
    samples: Vec<Point>,
    /// Unit normals at each sample
    normals: Vec<Point>,
    /// Arclength from the start to each sample
    cumulative: Vec<f32>,
}

impl SliderPath {
    pub fn new(shape: PathShape) -> Self {
        let n = shape.sample_count().max(2);
        let mut samples = Vec::with_capacity(n);
        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let t = i as f32 / (n - 1) as f32;
            samples.push(shape.point_at(t));
            normals.push(shape.tangent_at(t).perp().normalized());
        }

        // Degenerate tangents (coincident control points) borrow the polyline direction
        for i in 0..n {
            if normals[i] == Point::default() {
                let (a, b) = if i + 1 < n { (i, i + 1) } else { (i - 1, i) };
                normals[i] = (samples[b] - samples[a]).perp().normalized();
            }
        }

        let mut cumulative = Vec::with_capacity(n);
        let mut total = 0.0f32;
        cumulative.push(0.0);
        for pair in samples.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        Self {
            shape,
            samples,
            normals,
            cumulative,
        }
    }

    pub fn shape(&self) -> &PathShape {
        &self.shape
    }

    /// Total arclength in pixels
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Point {
        self.samples[0]
    }

    pub fn end(&self) -> Point {
        self.samples[self.samples.len() - 1]
    }

    pub fn samples(&self) -> &[Point] {
        &self.samples
    }

    /// Point at `progress` (0..=1) of the path's arclength
    pub fn position_at(&self, progress: f32) -> Point {
        let total = self.length();
        if !(total > f32::EPSILON) {
            return self.start();
        }
        let target = progress.clamp(0.0, 1.0) * total;

        // First sample whose cumulative length reaches the target
        let idx = self.cumulative.partition_point(|&len| len < target);
        if idx == 0 {
            return self.samples[0];
        }
        if idx >= self.samples.len() {
            return self.end();
        }

        let seg_start = self.cumulative[idx - 1];
        let seg_len = self.cumulative[idx] - seg_start;
        let frac = if seg_len > f32::EPSILON {
            (target - seg_start) / seg_len
        } else {
            0.0
        };
        self.samples[idx - 1].lerp(self.samples[idx], frac)
    }

    /// Closed outline offset `width` to either side of the path
    ///
    /// Left offsets run start to end, right offsets run back, giving one polygon.
    pub fn outline(&self, width: f32) -> Vec<Point> {
        let left = self
            .samples
            .iter()
            .zip(&self.normals)
            .map(|(&p, &n)| p + n * width);
        let right = self
            .samples
            .iter()
            .zip(&self.normals)
            .rev()
            .map(|(&p, &n)| p - n * width);
        left.chain(right).collect()
    }

    /// Whether every sample lies inside `rect`
    pub fn fits_in(&self, rect: &Rect) -> bool {
        self.samples.iter().all(|&p| rect.contains(p))
    }

    /// Rescale around the start so the arclength becomes `length`
    pub fn with_length(&self, length: f32) -> SliderPath {
        let current = self.length();
        if !(current > f32::EPSILON) {
            return self.clone();
        }
        SliderPath::new(self.shape.scaled_about(self.start(), length / current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point, tol: f32) -> bool {
        a.distance(b) < tol
    }

    #[test]
    fn test_line_traversal_is_linear() {
        let path = SliderPath::new(PathShape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(100.0, 0.0),
        });
        assert_eq!(path.length(), 100.0);
        assert!(close(path.position_at(0.25), Point::new(25.0, 0.0), 1e-4));
        assert!(close(path.position_at(1.5), Point::new(100.0, 0.0), 1e-4));
        assert!(close(path.position_at(-1.0), Point::new(0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_arc_length_matches_radius_times_sweep() {
        let path = SliderPath::new(PathShape::Arc {
            center: Point::new(200.0, 200.0),
            radius: 100.0,
            start_angle: 0.0,
            sweep: std::f32::consts::FRAC_PI_2,
        });
        let expected = 100.0 * std::f32::consts::FRAC_PI_2;
        assert!((path.length() - expected).abs() / expected < 0.01);
        assert!(close(path.start(), Point::new(300.0, 200.0), 1e-3));
        assert!(close(path.end(), Point::new(200.0, 300.0), 1e-3));
    }

    #[test]
    fn test_bezier_traversal_has_uniform_speed() {
        // Control points bunched at the start make raw-parameter speed very uneven
        let path = SliderPath::new(PathShape::Bezier {
            points: [
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(300.0, 0.0),
            ],
        });
        let steps = 20;
        let mut prev = path.position_at(0.0);
        let expected = path.length() / steps as f32;
        for i in 1..=steps {
            let p = path.position_at(i as f32 / steps as f32);
            let moved = prev.distance(p);
            assert!((moved - expected).abs() < expected * 0.05, "step {} moved {}", i, moved);
            prev = p;
        }
    }

    #[test]
    fn test_with_length_rescales_about_start() {
        let path = SliderPath::new(PathShape::Bezier {
            points: [
                Point::new(100.0, 100.0),
                Point::new(150.0, 40.0),
                Point::new(220.0, 180.0),
                Point::new(300.0, 120.0),
            ],
        });
        let scaled = path.with_length(120.0);
        assert!((scaled.length() - 120.0).abs() < 1.0);
        assert_eq!(scaled.start(), path.start());
    }

    #[test]
    fn test_outline_is_closed_band() {
        let path = SliderPath::new(PathShape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
        });
        let outline = path.outline(2.0);
        assert_eq!(outline.len(), 4);
        assert!(close(outline[0], Point::new(0.0, 2.0), 1e-5));
        assert!(close(outline[1], Point::new(10.0, 2.0), 1e-5));
        assert!(close(outline[2], Point::new(10.0, -2.0), 1e-5));
        assert!(close(outline[3], Point::new(0.0, -2.0), 1e-5));
    }

    #[test]
    fn test_fits_in() {
        let rect = Rect::new(Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        let inside = SliderPath::new(PathShape::Line {
            start: Point::new(10.0, 10.0),
            end: Point::new(40.0, 40.0),
        });
        let outside = SliderPath::new(PathShape::Line {
            start: Point::new(10.0, 10.0),
            end: Point::new(80.0, 10.0),
        });
        assert!(inside.fits_in(&rect));
        assert!(!outside.fits_in(&rect));
    }
}
