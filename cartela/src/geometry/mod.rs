//! Vertex streams and the adapters converting feature geometries into drawable paths.
//!
//! A path is an iterator of [`PathCommand`]s in pixel coordinates. Adapters wrap each other
//! lazily; every adapter pulls one [`Subpath`] at a time from its source, processes it and
//! emits the result:
//!
//! ```text
//! source → project → affine → clip → smooth → simplify → offset → dash → stroke / fill
//! ```

use std::collections::VecDeque;
use std::iter::Peekable;

use cartela_types::{Geom, Point2d};

mod clip;
mod dash;
mod offset;
mod simplify;
mod smooth;
mod stroke;
mod transform;

pub use clip::Clip;
pub use dash::Dash;
pub use offset::Offset;
pub use simplify::{Simplify, SimplifyAlgorithm};
pub use smooth::Smooth;
pub use stroke::{stroke_outline, LineCap, LineJoin, StrokeStyle};
pub use transform::{Affine, TransformError, TransformKind, TransformList, TransformOp};

/// Single command of a path.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathCommand {
    /// Starts a new subpath at the point.
    MoveTo(Point2d),
    /// Straight segment from the current point.
    LineTo(Point2d),
    /// Closes the current subpath.
    Close,
}

/// Connected sequence of vertices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subpath {
    /// Vertices.
    pub points: Vec<Point2d>,
    /// Whether the last vertex is connected back to the first one.
    pub closed: bool,
}

impl Subpath {
    /// Open subpath through the points.
    pub fn open(points: Vec<Point2d>) -> Self {
        Self {
            points,
            closed: false,
        }
    }

    /// Closed subpath (ring) through the points.
    pub fn closed(points: Vec<Point2d>) -> Self {
        Self {
            points,
            closed: true,
        }
    }

    /// Path commands of the subpath.
    pub fn commands(&self) -> impl Iterator<Item = PathCommand> + '_ {
        let mut points = self.points.iter();
        let first = points.next().map(|p| PathCommand::MoveTo(*p));
        let close = (self.closed && !self.points.is_empty()).then_some(PathCommand::Close);
        first
            .into_iter()
            .chain(points.map(|p| PathCommand::LineTo(*p)))
            .chain(close)
    }

    /// Segments of the subpath, including the closing one for rings.
    pub fn segments(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        let closing = match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(first), Some(last)) if self.points.len() > 2 && first != last => {
                Some((*last, *first))
            }
            _ => None,
        };

        self.points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    /// Removes consecutive duplicate vertices and, for rings, the repeated closing vertex.
    pub fn dedup(&mut self) {
        self.points.dedup();
        if self.closed && self.points.len() > 1 && self.points.first() == self.points.last() {
            self.points.pop();
        }
    }
}

/// Collects commands into subpaths.
pub fn subpaths(path: impl IntoIterator<Item = PathCommand>) -> Vec<Subpath> {
    let mut iter = path.into_iter().peekable();
    let mut result = vec![];
    while let Some(subpath) = next_subpath(&mut iter) {
        result.push(subpath);
    }
    result
}

/// Path commands of a set of subpaths.
pub fn commands(subpaths: &[Subpath]) -> impl Iterator<Item = PathCommand> + '_ {
    subpaths.iter().flat_map(|s| s.commands())
}

fn next_subpath<I: Iterator<Item = PathCommand>>(iter: &mut Peekable<I>) -> Option<Subpath> {
    let first = loop {
        match iter.next()? {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => break p,
            PathCommand::Close => continue,
        }
    };

    let mut subpath = Subpath::open(vec![first]);
    loop {
        match iter.peek() {
            Some(PathCommand::LineTo(p)) => {
                subpath.points.push(*p);
                iter.next();
            }
            Some(PathCommand::Close) => {
                iter.next();
                subpath.closed = true;
                break;
            }
            Some(PathCommand::MoveTo(_)) | None => break,
        }
    }

    Some(subpath)
}

/// Processing step applied to every subpath of a path.
pub trait SubpathFilter {
    /// Processes one subpath, pushing the results into `output`.
    fn process(&mut self, subpath: Subpath, output: &mut Vec<Subpath>);
}

/// Lazy iterator applying a [`SubpathFilter`] to the subpaths of the source path.
pub struct Adapted<I: Iterator<Item = PathCommand>, F> {
    source: Peekable<I>,
    filter: F,
    buffer: Vec<Subpath>,
    pending: VecDeque<PathCommand>,
}

impl<I, F> Iterator for Adapted<I, F>
where
    I: Iterator<Item = PathCommand>,
    F: SubpathFilter,
{
    type Item = PathCommand;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(command) = self.pending.pop_front() {
                return Some(command);
            }

            let subpath = next_subpath(&mut self.source)?;
            self.filter.process(subpath, &mut self.buffer);
            for subpath in self.buffer.drain(..) {
                self.pending.extend(subpath.commands());
            }
        }
    }
}

/// Adapter combinators for paths.
pub trait PathExt: Iterator<Item = PathCommand> + Sized {
    /// Applies the filter to every subpath.
    fn adapt<F: SubpathFilter>(self, filter: F) -> Adapted<Self, F> {
        Adapted {
            source: self.peekable(),
            filter,
            buffer: vec![],
            pending: VecDeque::new(),
        }
    }

    /// Applies the affine transform to every vertex.
    fn transform(self, affine: Affine) -> Transformed<Self> {
        Transformed {
            source: self,
            affine,
        }
    }
}

impl<I: Iterator<Item = PathCommand>> PathExt for I {}

/// Iterator applying an [`Affine`] transform to the vertices of the source path.
pub struct Transformed<I> {
    source: I,
    affine: Affine,
}

impl<I: Iterator<Item = PathCommand>> Iterator for Transformed<I> {
    type Item = PathCommand;

    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.source.next()? {
            PathCommand::MoveTo(p) => PathCommand::MoveTo(self.affine.apply(&p)),
            PathCommand::LineTo(p) => PathCommand::LineTo(self.affine.apply(&p)),
            PathCommand::Close => PathCommand::Close,
        })
    }
}

/// Converts a geometry into path commands. Polygon rings are closed subpaths; a point is a
/// subpath with a single vertex.
pub fn geometry_path(geometry: &Geom) -> Vec<PathCommand> {
    match geometry {
        Geom::Point(p) => vec![PathCommand::MoveTo(*p)],
        Geom::LineString(line) => Subpath::open(line.points.clone()).commands().collect(),
        Geom::Polygon(polygon) => polygon
            .rings()
            .flat_map(|ring| {
                let mut subpath = Subpath::closed(ring.clone());
                subpath.dedup();
                subpath.commands().collect::<Vec<_>>()
            })
            .collect(),
    }
}

/// Perpendicular distance from `p` to the segment `a-b`.
pub(crate) fn segment_distance(p: &Point2d, a: &Point2d, b: &Point2d) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }

    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartela_types::{LineString, Polygon};

    fn p(x: f64, y: f64) -> Point2d {
        Point2d::new(x, y)
    }

    struct Reverse;

    impl SubpathFilter for Reverse {
        fn process(&mut self, mut subpath: Subpath, output: &mut Vec<Subpath>) {
            subpath.points.reverse();
            output.push(subpath);
        }
    }

    #[test]
    fn commands_to_subpaths() {
        let path = vec![
            PathCommand::MoveTo(p(0.0, 0.0)),
            PathCommand::LineTo(p(1.0, 0.0)),
            PathCommand::LineTo(p(1.0, 1.0)),
            PathCommand::Close,
            PathCommand::LineTo(p(5.0, 5.0)),
            PathCommand::LineTo(p(6.0, 5.0)),
            PathCommand::MoveTo(p(9.0, 9.0)),
        ];

        let result = subpaths(path);
        assert_eq!(
            result,
            vec![
                Subpath::closed(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]),
                Subpath::open(vec![p(5.0, 5.0), p(6.0, 5.0)]),
                Subpath::open(vec![p(9.0, 9.0)]),
            ]
        );
    }

    #[test]
    fn adapters_are_lazy_and_chainable() {
        let line = Subpath::open(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 1.0)]);
        let result: Vec<_> = line
            .commands()
            .adapt(Reverse)
            .transform(Affine::translate(10.0, 0.0))
            .collect();
        assert_eq!(
            result,
            vec![
                PathCommand::MoveTo(p(12.0, 1.0)),
                PathCommand::LineTo(p(11.0, 0.0)),
                PathCommand::LineTo(p(10.0, 0.0)),
            ]
        );
    }

    #[test]
    fn geometry_paths() {
        let polygon = Polygon::new(
            vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 0.0)],
            vec![],
        );
        let path = geometry_path(&polygon.into());
        assert_eq!(path.len(), 4);
        assert_eq!(path[3], PathCommand::Close);

        let line = LineString::new(vec![p(0.0, 0.0), p(3.0, 4.0)]);
        assert_eq!(geometry_path(&line.into()).len(), 2);
    }

    #[test]
    fn closed_segments() {
        let ring = Subpath::closed(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]);
        assert_eq!(ring.segments().count(), 3);
        assert_eq!(segment_distance(&p(0.5, 1.0), &p(0.0, 0.0), &p(1.0, 0.0)), 1.0);
    }
}
