use cartela_types::Point2d;

use super::{Subpath, SubpathFilter};

/// Splits lines into dashes.
///
/// The pattern lists alternating dash and gap lengths in pixels; a pattern with an odd number
/// of items is repeated twice. The pattern state carries over vertices of a subpath and starts
/// over for every new subpath. Invalid patterns (empty, negative, zero total length) leave the
/// path unchanged.
#[derive(Debug, Clone)]
pub struct Dash {
    pattern: Vec<f64>,
    offset: f64,
}

impl Dash {
    /// Creates the filter. `offset` shifts the start of the pattern along the line.
    pub fn new(pattern: &[f64], offset: f64) -> Self {
        let mut pattern = pattern.to_vec();
        if pattern.len() % 2 == 1 {
            pattern.extend_from_within(..);
        }

        Self { pattern, offset }
    }

    fn is_valid(&self) -> bool {
        !self.pattern.is_empty()
            && self.pattern.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.pattern.iter().sum::<f64>() > 0.0
    }

    /// Index of the pattern item and the length remaining in it at the start of a subpath.
    fn start_state(&self) -> (usize, f64) {
        let total: f64 = self.pattern.iter().sum();
        let mut skip = if self.offset.is_finite() {
            self.offset.rem_euclid(total)
        } else {
            0.0
        };

        let mut index = 0;
        while skip >= self.pattern[index] {
            skip -= self.pattern[index];
            index = (index + 1) % self.pattern.len();
        }

        (index, self.pattern[index] - skip)
    }
}

fn flush(points: &mut Vec<Point2d>, output: &mut Vec<Subpath>) {
    let has_length = points.windows(2).any(|w| w[0] != w[1]);
    if has_length {
        output.push(Subpath::open(std::mem::take(points)));
    } else {
        points.clear();
    }
}

impl SubpathFilter for Dash {
    fn process(&mut self, subpath: Subpath, output: &mut Vec<Subpath>) {
        if !self.is_valid() || subpath.points.len() < 2 {
            output.push(subpath);
            return;
        }

        let mut points = subpath.points;
        if subpath.closed {
            points.push(points[0]);
        }

        let (mut index, mut remaining) = self.start_state();
        let mut current = vec![];
        if index % 2 == 0 {
            current.push(points[0]);
        }

        for segment in points.windows(2) {
            let (a, b) = (segment[0], segment[1]);
            let length = (b - a).norm();
            let mut position = 0.0;

            while length - position > remaining {
                position += remaining;
                let point = a + (b - a) * (position / length);
                if index % 2 == 0 {
                    current.push(point);
                    flush(&mut current, output);
                } else {
                    current.push(point);
                }

                index = (index + 1) % self.pattern.len();
                remaining = self.pattern[index];
            }

            remaining -= length - position;
            if index % 2 == 0 {
                current.push(b);
            }
        }

        if index % 2 == 0 {
            flush(&mut current, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn dash(pattern: &[f64], offset: f64, subpath: Subpath) -> Vec<Vec<Point2d>> {
        let mut output = vec![];
        Dash::new(pattern, offset).process(subpath, &mut output);
        output.into_iter().map(|s| s.points).collect()
    }

    #[test]
    fn simple_pattern() {
        let line = Subpath::open(vec![p(0.0, 0.0), p(10.0, 0.0)]);
        assert_eq!(
            dash(&[2.0, 3.0], 0.0, line),
            vec![
                vec![p(0.0, 0.0), p(2.0, 0.0)],
                vec![p(5.0, 0.0), p(7.0, 0.0)],
            ]
        );
    }

    #[test]
    fn offset_shifts_pattern() {
        let line = Subpath::open(vec![p(0.0, 0.0), p(10.0, 0.0)]);
        assert_eq!(
            dash(&[2.0, 3.0], 1.0, line),
            vec![
                vec![p(0.0, 0.0), p(1.0, 0.0)],
                vec![p(4.0, 0.0), p(6.0, 0.0)],
                vec![p(9.0, 0.0), p(10.0, 0.0)],
            ]
        );
    }

    #[test]
    fn dash_continues_around_corners() {
        let line = Subpath::open(vec![p(0.0, 0.0), p(3.0, 0.0), p(3.0, 6.0)]);
        assert_eq!(
            dash(&[4.0, 2.0], 0.0, line),
            vec![
                vec![p(0.0, 0.0), p(3.0, 0.0), p(3.0, 1.0)],
                vec![p(3.0, 3.0), p(3.0, 6.0)],
            ]
        );
    }

    #[test]
    fn invalid_pattern_is_ignored() {
        let line = Subpath::open(vec![p(0.0, 0.0), p(10.0, 0.0)]);
        assert_eq!(dash(&[], 0.0, line.clone()).len(), 1);
        assert_eq!(dash(&[0.0, 0.0], 0.0, line.clone()).len(), 1);
        assert_eq!(dash(&[-1.0, 2.0], 0.0, line).len(), 1);
    }
}
