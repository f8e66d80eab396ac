use cartela_types::Point2d;

use super::{Subpath, SubpathFilter};

/// Replaces straight segments with Catmull-Rom curves, flattened back into short segments.
///
/// `tension` is in `0.0..=1.0`; `0` leaves the path unchanged.
#[derive(Debug, Copy, Clone)]
pub struct Smooth {
    tension: f64,
}

impl Smooth {
    /// Creates the filter.
    pub fn new(tension: f64) -> Self {
        Self {
            tension: if tension.is_finite() {
                tension.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

impl SubpathFilter for Smooth {
    fn process(&mut self, mut subpath: Subpath, output: &mut Vec<Subpath>) {
        subpath.dedup();
        let n = subpath.points.len();
        if self.tension == 0.0 || n < 3 {
            output.push(subpath);
            return;
        }

        let points = &subpath.points;
        let at = |i: isize| -> Point2d {
            if subpath.closed {
                points[i.rem_euclid(n as isize) as usize]
            } else {
                points[i.clamp(0, n as isize - 1) as usize]
            }
        };

        let segments = if subpath.closed { n } else { n - 1 };
        let mut result = Vec::with_capacity(segments * 8 + 1);
        result.push(points[0]);

        for i in 0..segments as isize {
            let p0 = at(i - 1);
            let p1 = at(i);
            let p2 = at(i + 1);
            let p3 = at(i + 2);

            let c1 = p1 + (p2 - p0) * (self.tension / 6.0);
            let c2 = p2 - (p3 - p1) * (self.tension / 6.0);

            let steps = ((p2 - p1).norm() / 2.0).ceil().clamp(2.0, 32.0) as usize;
            for step in 1..=steps {
                let t = step as f64 / steps as f64;
                result.push(cubic(&p1, &c1, &c2, &p2, t));
            }
        }

        if subpath.closed {
            result.pop();
        }

        output.push(Subpath {
            points: result,
            closed: subpath.closed,
        });
    }
}

fn cubic(p0: &Point2d, c1: &Point2d, c2: &Point2d, p1: &Point2d, t: f64) -> Point2d {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point2d::new(
        a * p0.x + b * c1.x + c * c2.x + d * p1.x,
        a * p0.y + b * c1.y + c * c2.y + d * p1.y,
    )
}
