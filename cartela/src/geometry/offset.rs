use cartela_types::{Point2d, Vector2d};

use super::{Subpath, SubpathFilter};

/// Longest allowed miter at an offset vertex, relative to the offset distance.
const MITER_LIMIT: f64 = 4.0;

/// Moves lines sideways by a distance in pixels. Positive distance moves the line to the left
/// of its direction of travel as seen on screen.
#[derive(Debug, Copy, Clone)]
pub struct Offset {
    distance: f64,
}

impl Offset {
    /// Creates the filter.
    pub fn new(distance: f64) -> Self {
        Self { distance }
    }
}

/// Left normal of the segment in pixel coordinates (y axis pointing down).
fn left_normal(a: &Point2d, b: &Point2d) -> Option<Vector2d> {
    let d = b - a;
    let len = d.norm();
    (len > 0.0).then(|| Vector2d::new(d.y / len, -d.x / len))
}

impl SubpathFilter for Offset {
    fn process(&mut self, mut subpath: Subpath, output: &mut Vec<Subpath>) {
        subpath.dedup();
        let n = subpath.points.len();
        if self.distance == 0.0 || !self.distance.is_finite() || n < 2 {
            output.push(subpath);
            return;
        }

        let points = &subpath.points;
        let segment_count = if subpath.closed { n } else { n - 1 };
        let normals: Vec<Vector2d> = (0..segment_count)
            .filter_map(|i| left_normal(&points[i], &points[(i + 1) % n]))
            .collect();
        if normals.len() != segment_count {
            output.push(subpath);
            return;
        }

        let offset_points = (0..n)
            .map(|i| {
                let before = if i > 0 {
                    Some(normals[i - 1])
                } else if subpath.closed {
                    normals.last().copied()
                } else {
                    None
                };
                let after = normals.get(i).copied();

                let shift = match (before, after) {
                    (Some(n1), Some(n2)) => {
                        let sum = n1 + n2;
                        if sum.norm() < 1e-9 {
                            n1 * self.distance
                        } else {
                            let bisector = sum.normalize();
                            let cos = bisector.dot(&n1).max(1.0 / MITER_LIMIT);
                            bisector * (self.distance / cos)
                        }
                    }
                    (Some(n), None) | (None, Some(n)) => n * self.distance,
                    (None, None) => Vector2d::zeros(),
                };

                points[i] + shift
            })
            .collect();

        output.push(Subpath {
            points: offset_points,
            closed: subpath.closed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn offset(subpath: Subpath, distance: f64) -> Subpath {
        let mut output = vec![];
        Offset::new(distance).process(subpath, &mut output);
        output.remove(0)
    }

    #[test]
    fn positive_offset_is_to_the_left() {
        let result = offset(Subpath::open(vec![p(0.0, 10.0), p(10.0, 10.0)]), 1.0);
        assert_eq!(result.points, vec![p(0.0, 9.0), p(10.0, 9.0)]);

        let result = offset(Subpath::open(vec![p(0.0, 10.0), p(10.0, 10.0)]), -2.0);
        assert_eq!(result.points, vec![p(0.0, 12.0), p(10.0, 12.0)]);
    }

    #[test]
    fn corners_are_mitered() {
        let result = offset(
            Subpath::open(vec![p(0.0, 10.0), p(10.0, 10.0), p(10.0, 20.0)]),
            1.0,
        );
        assert_eq!(result.points[0], p(0.0, 9.0));
        assert_abs_diff_eq!(result.points[1].x, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.points[1].y, 9.0, epsilon = 1e-9);
        assert_eq!(result.points[2], p(11.0, 20.0));
    }
}
