use cartela_types::Point2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{segment_distance, Subpath, SubpathFilter};

/// Line simplification algorithm.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SimplifyAlgorithm {
    /// Removes vertices closer than the tolerance to the simplified line.
    #[default]
    DouglasPeucker,
    /// Repeatedly removes the vertex forming the smallest triangle with its neighbours while
    /// that area is below the squared tolerance.
    Visvalingam,
}

/// Removes vertices that don't change the shape by more than the tolerance (in pixels).
#[derive(Debug, Copy, Clone)]
pub struct Simplify {
    algorithm: SimplifyAlgorithm,
    tolerance: f64,
}

impl Simplify {
    /// Creates the filter.
    pub fn new(algorithm: SimplifyAlgorithm, tolerance: f64) -> Self {
        Self {
            algorithm,
            tolerance,
        }
    }
}

impl SubpathFilter for Simplify {
    fn process(&mut self, mut subpath: Subpath, output: &mut Vec<Subpath>) {
        subpath.dedup();
        let min_points = if subpath.closed { 4 } else { 3 };
        if self.tolerance.is_nan() || self.tolerance <= 0.0 || subpath.points.len() < min_points {
            output.push(subpath);
            return;
        }

        if subpath.closed {
            // rings are simplified as lines starting and ending at the first vertex
            let first = subpath.points[0];
            subpath.points.push(first);
        }

        let keep = match self.algorithm {
            SimplifyAlgorithm::DouglasPeucker => douglas_peucker(&subpath.points, self.tolerance),
            SimplifyAlgorithm::Visvalingam => {
                visvalingam(&subpath.points, self.tolerance * self.tolerance)
            }
        };

        let mut points: Vec<Point2d> = subpath
            .points
            .iter()
            .zip(keep)
            .filter_map(|(p, keep)| keep.then_some(*p))
            .collect();

        if subpath.closed {
            points.pop();
            if points.len() < 3 {
                return;
            }
        }

        output.push(Subpath {
            points,
            closed: subpath.closed,
        });
    }
}

fn douglas_peucker(points: &[Point2d], tolerance: f64) -> Vec<bool> {
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_distance = 0.0;
        let mut index = start;
        for i in start + 1..end {
            let distance = segment_distance(&points[i], &points[start], &points[end]);
            if distance > max_distance {
                max_distance = distance;
                index = i;
            }
        }

        if max_distance > tolerance {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    keep
}

fn triangle_area(a: &Point2d, b: &Point2d, c: &Point2d) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
}

fn visvalingam(points: &[Point2d], min_area: f64) -> Vec<bool> {
    let n = points.len();
    let mut keep = vec![true; n];
    let mut prev: Vec<usize> = (0..n).map(|i| i.saturating_sub(1)).collect();
    let mut next: Vec<usize> = (0..n).map(|i| (i + 1).min(n - 1)).collect();
    let mut remaining = n;

    loop {
        if remaining <= 2 {
            break;
        }

        let mut smallest: Option<(usize, f64)> = None;
        for i in 1..n - 1 {
            if !keep[i] {
                continue;
            }
            let area = triangle_area(&points[prev[i]], &points[i], &points[next[i]]);
            if smallest.map_or(true, |(_, a)| area < a) {
                smallest = Some((i, area));
            }
        }

        match smallest {
            Some((i, area)) if area < min_area => {
                keep[i] = false;
                next[prev[i]] = next[i];
                prev[next[i]] = prev[i];
                remaining -= 1;
            }
            _ => break,
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn simplify(algorithm: SimplifyAlgorithm, tolerance: f64, subpath: Subpath) -> Vec<Subpath> {
        let mut output = vec![];
        Simplify::new(algorithm, tolerance).process(subpath, &mut output);
        output
    }

    fn zigzag() -> Subpath {
        Subpath::open(vec![
            p(0.0, 0.0),
            p(1.0, 0.1),
            p(2.0, -0.1),
            p(3.0, 5.0),
            p(4.5, 1.0),
            p(5.0, 0.0),
        ])
    }

    #[test]
    fn douglas_peucker_keeps_significant_vertices() {
        let result = simplify(SimplifyAlgorithm::DouglasPeucker, 0.5, zigzag());
        assert_eq!(
            result,
            vec![Subpath::open(vec![p(0.0, 0.0), p(2.0, -0.1), p(3.0, 5.0), p(5.0, 0.0)])]
        );
    }

    #[test]
    fn visvalingam_removes_small_triangles() {
        let result = simplify(SimplifyAlgorithm::Visvalingam, 2.5, zigzag());
        assert_eq!(
            result,
            vec![Subpath::open(vec![p(0.0, 0.0), p(3.0, 5.0), p(5.0, 0.0)])]
        );
    }

    #[test]
    fn tiny_rings_disappear() {
        let ring = Subpath::closed(vec![p(0.0, 0.0), p(0.1, 0.0), p(0.1, 0.1), p(0.0, 0.1)]);
        assert!(simplify(SimplifyAlgorithm::DouglasPeucker, 1.0, ring).is_empty());

        let ring = Subpath::closed(vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]);
        assert_eq!(
            simplify(SimplifyAlgorithm::DouglasPeucker, 1.0, ring.clone()),
            vec![ring]
        );
    }
}
