use cartela_types::{Box2d, Point2d};

use super::{Subpath, SubpathFilter};

/// Clips subpaths to a rectangle.
///
/// Rings are clipped with the Sutherland–Hodgman algorithm and stay closed; open lines are
/// clipped segment by segment with Cohen–Sutherland and may split into several lines. The
/// rectangle boundary counts as inside, so clipping an already clipped path doesn't change it.
#[derive(Debug, Copy, Clone)]
pub struct Clip {
    bbox: Box2d,
}

impl Clip {
    /// Creates a filter clipping to the rectangle.
    pub fn new(bbox: Box2d) -> Self {
        Self { bbox }
    }
}

impl SubpathFilter for Clip {
    fn process(&mut self, mut subpath: Subpath, output: &mut Vec<Subpath>) {
        if subpath.points.iter().all(|p| self.bbox.contains(p)) {
            output.push(subpath);
            return;
        }
        if !self.bbox.is_valid() {
            return;
        }

        if subpath.closed {
            subpath.dedup();
            let clipped = clip_ring(&subpath.points, &self.bbox);
            if clipped.len() >= 3 {
                output.push(Subpath::closed(clipped));
            }
        } else {
            clip_line(&subpath.points, &self.bbox, output);
        }
    }
}

#[derive(Copy, Clone)]
enum Plane {
    MinX,
    MaxX,
    MinY,
    MaxY,
}

impl Plane {
    fn is_inside(&self, p: &Point2d, bbox: &Box2d) -> bool {
        match self {
            Plane::MinX => p.x >= bbox.minx,
            Plane::MaxX => p.x <= bbox.maxx,
            Plane::MinY => p.y >= bbox.miny,
            Plane::MaxY => p.y <= bbox.maxy,
        }
    }

    fn intersect(&self, a: &Point2d, b: &Point2d, bbox: &Box2d) -> Point2d {
        match self {
            Plane::MinX | Plane::MaxX => {
                let x = if matches!(self, Plane::MinX) {
                    bbox.minx
                } else {
                    bbox.maxx
                };
                let t = (x - a.x) / (b.x - a.x);
                Point2d::new(x, a.y + t * (b.y - a.y))
            }
            Plane::MinY | Plane::MaxY => {
                let y = if matches!(self, Plane::MinY) {
                    bbox.miny
                } else {
                    bbox.maxy
                };
                let t = (y - a.y) / (b.y - a.y);
                let x = (a.x + t * (b.x - a.x)).clamp(bbox.minx, bbox.maxx);
                Point2d::new(x, y)
            }
        }
    }
}

fn clip_ring(points: &[Point2d], bbox: &Box2d) -> Vec<Point2d> {
    let mut input = points.to_vec();
    for plane in [Plane::MinX, Plane::MaxX, Plane::MinY, Plane::MaxY] {
        if input.is_empty() {
            break;
        }

        let mut output = Vec::with_capacity(input.len() + 4);
        let mut prev = input[input.len() - 1];
        for current in &input {
            let current_inside = plane.is_inside(current, bbox);
            let prev_inside = plane.is_inside(&prev, bbox);
            if current_inside {
                if !prev_inside {
                    output.push(plane.intersect(&prev, current, bbox));
                }
                output.push(*current);
            } else if prev_inside {
                output.push(plane.intersect(&prev, current, bbox));
            }
            prev = *current;
        }

        output.dedup();
        if output.len() > 1 && output.first() == output.last() {
            output.pop();
        }
        input = output;
    }

    input
}

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

fn outcode(p: &Point2d, bbox: &Box2d) -> u8 {
    let mut code = INSIDE;
    if p.x < bbox.minx {
        code |= LEFT;
    } else if p.x > bbox.maxx {
        code |= RIGHT;
    }
    if p.y < bbox.miny {
        code |= BOTTOM;
    } else if p.y > bbox.maxy {
        code |= TOP;
    }
    code
}

fn clip_segment(mut a: Point2d, mut b: Point2d, bbox: &Box2d) -> Option<(Point2d, Point2d)> {
    let mut code_a = outcode(&a, bbox);
    let mut code_b = outcode(&b, bbox);

    loop {
        if code_a | code_b == INSIDE {
            return Some((a, b));
        }
        if code_a & code_b != 0 {
            return None;
        }

        let code = if code_a != INSIDE { code_a } else { code_b };
        let p = if code & TOP != 0 {
            Point2d::new(a.x + (b.x - a.x) * (bbox.maxy - a.y) / (b.y - a.y), bbox.maxy)
        } else if code & BOTTOM != 0 {
            Point2d::new(a.x + (b.x - a.x) * (bbox.miny - a.y) / (b.y - a.y), bbox.miny)
        } else if code & RIGHT != 0 {
            Point2d::new(bbox.maxx, a.y + (b.y - a.y) * (bbox.maxx - a.x) / (b.x - a.x))
        } else {
            Point2d::new(bbox.minx, a.y + (b.y - a.y) * (bbox.minx - a.x) / (b.x - a.x))
        };
        let p = Point2d::new(
            p.x.clamp(bbox.minx, bbox.maxx),
            p.y.clamp(bbox.miny, bbox.maxy),
        );

        if code == code_a {
            a = p;
            code_a = outcode(&a, bbox);
        } else {
            b = p;
            code_b = outcode(&b, bbox);
        }
    }
}

fn clip_line(points: &[Point2d], bbox: &Box2d, output: &mut Vec<Subpath>) {
    if points.len() == 1 {
        return;
    }

    let mut current: Vec<Point2d> = vec![];
    for segment in points.windows(2) {
        match clip_segment(segment[0], segment[1], bbox) {
            Some((a, b)) => {
                if current.last() != Some(&a) {
                    if current.len() > 1 {
                        output.push(Subpath::open(std::mem::take(&mut current)));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
            }
            None => {
                if current.len() > 1 {
                    output.push(Subpath::open(std::mem::take(&mut current)));
                }
                current.clear();
            }
        }
    }

    if current.len() > 1 {
        output.push(Subpath::open(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{subpaths, PathExt};

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    fn clip(subpath: &Subpath, bbox: Box2d) -> Vec<Subpath> {
        subpaths(subpath.commands().adapt(Clip::new(bbox)))
    }

    #[test]
    fn polygon_is_cut_to_box() {
        let ring = Subpath::closed(vec![p(-5.0, -5.0), p(5.0, -5.0), p(5.0, 5.0), p(-5.0, 5.0)]);
        let result = clip(&ring, Box2d::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            result,
            vec![Subpath::closed(vec![p(0.0, 0.0), p(5.0, 0.0), p(5.0, 5.0), p(0.0, 5.0)])]
        );
    }

    #[test]
    fn polygon_outside_disappears() {
        let ring = Subpath::closed(vec![p(20.0, 20.0), p(30.0, 20.0), p(30.0, 30.0)]);
        assert!(clip(&ring, Box2d::new(0.0, 0.0, 10.0, 10.0)).is_empty());
    }

    #[test]
    fn line_splits_into_parts() {
        let line = Subpath::open(vec![p(-5.0, 5.0), p(5.0, 5.0), p(5.0, 15.0), p(8.0, 15.0), p(8.0, 5.0)]);
        let result = clip(&line, Box2d::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            result,
            vec![
                Subpath::open(vec![p(0.0, 5.0), p(5.0, 5.0), p(5.0, 10.0)]),
                Subpath::open(vec![p(8.0, 10.0), p(8.0, 5.0)]),
            ]
        );
    }

    #[test]
    fn clipping_is_idempotent() {
        let bbox = Box2d::new(0.3, 0.7, 9.1, 8.9);
        let ring = Subpath::closed(vec![
            p(-3.3, 1.7),
            p(4.1, -6.2),
            p(13.7, 4.4),
            p(6.6, 12.9),
            p(2.2, 5.5),
        ]);
        let line = Subpath::open(vec![p(-1.1, -2.3), p(7.9, 11.3), p(12.1, 0.1), p(3.3, 4.4)]);

        for subpath in [ring, line] {
            let once = clip(&subpath, bbox);
            let twice: Vec<Subpath> = once.iter().flat_map(|s| clip(s, bbox)).collect();
            assert_eq!(once, twice);
            assert!(!once.is_empty());
        }
    }
}
