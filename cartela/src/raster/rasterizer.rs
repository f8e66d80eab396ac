use cartela_types::Point2d;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{Gamma, RasterError};
use crate::geometry::PathCommand;

/// Default number of sub-samples along each pixel axis.
pub const DEFAULT_SAMPLES: u32 = 8;

const MAX_SAMPLES: u32 = 16;

/// Rule deciding which parts of a self-intersecting path are inside.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FillRule {
    /// Points with non-zero winding number are inside.
    #[default]
    NonZero,
    /// Points with odd winding number are inside.
    EvenOdd,
}

impl FillRule {
    fn is_inside(&self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

/// Receiver of the rasterizer output.
pub trait SpanSink {
    /// Called for every horizontal run of pixels with non-zero alpha. `covers[i]` is the alpha
    /// of the pixel `(x + i, y)`, `majority[i]` is set when the path covers more than half of
    /// that pixel before gamma is applied.
    fn blend_span(&mut self, x: u32, y: u32, covers: &[u8], majority: &[bool]);
}

#[derive(Debug, Copy, Clone)]
struct Edge {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    dir: i32,
}

impl Edge {
    fn x_at(&self, y: f64) -> f64 {
        self.x0 + (y - self.y0) * (self.x1 - self.x0) / (self.y1 - self.y0)
    }
}

/// Anti-aliased scanline rasterizer.
///
/// Paths are accumulated as a set of non-horizontal edges in pixel coordinates. [`Rasterizer::sweep`]
/// then samples every pixel on an `N x N` grid of sub-pixel points, counts the points inside the
/// path according to the fill rule and converts the count into alpha with the gamma function.
/// Every subpath is implicitly closed. Points with non-finite coordinates are ignored.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    samples: u32,
    edges: Vec<Edge>,
    start: Option<Point2d>,
    current: Option<Point2d>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES)
    }
}

impl Rasterizer {
    /// Creates a rasterizer sampling each pixel on a `samples x samples` grid. The value is
    /// clamped into `1..=16`.
    pub fn new(samples: u32) -> Self {
        Self {
            samples: samples.clamp(1, MAX_SAMPLES),
            edges: vec![],
            start: None,
            current: None,
        }
    }

    /// Number of sub-samples along each pixel axis.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Removes all accumulated edges.
    pub fn reset(&mut self) {
        self.edges.clear();
        self.start = None;
        self.current = None;
    }

    /// Returns true if nothing would be drawn.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Starts a new subpath, closing the previous one.
    pub fn move_to(&mut self, point: Point2d) -> Result<(), RasterError> {
        self.close()?;
        if is_finite(&point) {
            self.start = Some(point);
            self.current = Some(point);
        } else {
            self.start = None;
            self.current = None;
        }

        Ok(())
    }

    /// Adds a straight segment from the current point.
    pub fn line_to(&mut self, point: Point2d) -> Result<(), RasterError> {
        if !is_finite(&point) {
            return Ok(());
        }

        match self.current {
            Some(current) => {
                self.add_edge(current, point)?;
                self.current = Some(point);
            }
            None => {
                self.start = Some(point);
                self.current = Some(point);
            }
        }

        Ok(())
    }

    /// Closes the current subpath with a segment to its first point.
    pub fn close(&mut self) -> Result<(), RasterError> {
        if let (Some(start), Some(current)) = (self.start, self.current) {
            self.add_edge(current, start)?;
            self.current = Some(start);
        }

        Ok(())
    }

    /// Adds all commands of the path.
    pub fn add_path(
        &mut self,
        path: impl IntoIterator<Item = PathCommand>,
    ) -> Result<(), RasterError> {
        for command in path {
            match command {
                PathCommand::MoveTo(p) => self.move_to(p)?,
                PathCommand::LineTo(p) => self.line_to(p)?,
                PathCommand::Close => self.close()?,
            }
        }

        self.close()
    }

    /// Adds a closed polygon through the given points.
    pub fn add_polygon(&mut self, points: &[Point2d]) -> Result<(), RasterError> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };

        self.move_to(*first)?;
        for p in rest {
            self.line_to(*p)?;
        }
        self.close()
    }

    /// Adds an axis-aligned ellipse approximated by a polygon.
    pub fn add_ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> Result<(), RasterError> {
        let points = ellipse_points(cx, cy, rx, ry);
        self.add_polygon(&points)
    }

    fn add_edge(&mut self, from: Point2d, to: Point2d) -> Result<(), RasterError> {
        if from.y == to.y {
            return Ok(());
        }

        let edge = if from.y < to.y {
            Edge {
                x0: from.x,
                y0: from.y,
                x1: to.x,
                y1: to.y,
                dir: 1,
            }
        } else {
            Edge {
                x0: to.x,
                y0: to.y,
                x1: from.x,
                y1: from.y,
                dir: -1,
            }
        };

        self.edges
            .try_reserve(1)
            .map_err(|_| RasterError::OutOfMemory)?;
        self.edges.push(edge);
        Ok(())
    }

    /// Computes coverage of the accumulated path inside the `width x height` pixel area and
    /// hands every covered span to the sink.
    pub fn sweep(
        &self,
        width: u32,
        height: u32,
        fill_rule: FillRule,
        gamma: &Gamma,
        sink: &mut dyn SpanSink,
    ) -> Result<(), RasterError> {
        if self.edges.is_empty() || width == 0 || height == 0 {
            return Ok(());
        }

        let n = self.samples;
        let table = gamma.table(n * n);

        let mut edges = Vec::new();
        edges
            .try_reserve_exact(self.edges.len())
            .map_err(|_| RasterError::OutOfMemory)?;
        edges.extend_from_slice(&self.edges);
        edges.sort_by(|a, b| a.y0.total_cmp(&b.y0));

        let ymin = edges.iter().map(|e| e.y0).fold(f64::INFINITY, f64::min);
        let ymax = edges.iter().map(|e| e.y1).fold(f64::NEG_INFINITY, f64::max);
        let row_start = ymin.floor().max(0.0);
        let row_end = ymax.ceil().min(height as f64);
        if row_start >= row_end {
            return Ok(());
        }

        let mut counts: Vec<u32> = Vec::new();
        counts
            .try_reserve_exact(width as usize)
            .map_err(|_| RasterError::OutOfMemory)?;
        counts.resize(width as usize, 0);

        let mut covers: Vec<u8> = Vec::new();
        let mut majority: Vec<bool> = Vec::new();
        let mut active: Vec<Edge> = Vec::new();
        let mut crossings: Vec<(f64, i32)> = Vec::new();
        let mut next_edge = 0;
        let sample_limit = width as i64 * n as i64;

        for py in row_start as u32..row_end as u32 {
            let mut touched_min = usize::MAX;
            let mut touched_max = 0;

            for sub in 0..n {
                let sy = py as f64 + (sub as f64 + 0.5) / n as f64;
                while next_edge < edges.len() && edges[next_edge].y0 <= sy {
                    active
                        .try_reserve(1)
                        .map_err(|_| RasterError::OutOfMemory)?;
                    active.push(edges[next_edge]);
                    next_edge += 1;
                }
                active.retain(|e| e.y1 > sy);

                crossings.clear();
                crossings
                    .try_reserve(active.len())
                    .map_err(|_| RasterError::OutOfMemory)?;
                crossings.extend(
                    active
                        .iter()
                        .filter(|e| e.y0 <= sy)
                        .map(|e| (e.x_at(sy), e.dir)),
                );
                crossings.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

                let mut winding = 0;
                for i in 0..crossings.len() {
                    winding += crossings[i].1;
                    if !fill_rule.is_inside(winding) || i + 1 >= crossings.len() {
                        continue;
                    }

                    let xa = crossings[i].0;
                    let xb = crossings[i + 1].0;
                    let k_start = ((xa * n as f64 - 0.5).ceil() as i64).clamp(0, sample_limit);
                    let k_end = ((xb * n as f64 - 0.5).ceil() as i64).clamp(0, sample_limit);

                    let mut k = k_start;
                    while k < k_end {
                        let px = (k / n as i64) as usize;
                        let next = k_end.min((px as i64 + 1) * n as i64);
                        counts[px] += (next - k) as u32;
                        touched_min = touched_min.min(px);
                        touched_max = touched_max.max(px);
                        k = next;
                    }
                }
            }

            if touched_min > touched_max {
                continue;
            }

            let mut run_start = None;
            covers.clear();
            majority.clear();
            for px in touched_min..=touched_max {
                let count = counts[px].min(n * n);
                counts[px] = 0;
                let alpha = table[count as usize];
                if alpha > 0 {
                    run_start.get_or_insert(px);
                    covers.push(alpha);
                    majority.push(2 * count > n * n);
                } else if let Some(start) = run_start.take() {
                    sink.blend_span(start as u32, py, &covers, &majority);
                    covers.clear();
                    majority.clear();
                }
            }
            if let Some(start) = run_start {
                sink.blend_span(start as u32, py, &covers, &majority);
            }
        }

        Ok(())
    }
}

fn is_finite(point: &Point2d) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

/// Points of a polygon approximating the ellipse. The number of points depends on the radius
/// so that the polygon deviates from the ellipse by less than a tenth of a pixel.
pub(crate) fn ellipse_points(cx: f64, cy: f64, rx: f64, ry: f64) -> Vec<Point2d> {
    let rx = rx.abs();
    let ry = ry.abs();
    if !(rx > 0.0 && ry > 0.0) || !cx.is_finite() || !cy.is_finite() {
        return vec![];
    }

    let r = rx.max(ry);
    let half_step = (1.0 - 0.1 / r).max(-1.0).acos().max(1e-3);
    let steps = ((std::f64::consts::PI / half_step).ceil() as usize).clamp(8, 512);

    (0..steps)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / steps as f64;
            Point2d::new(cx + rx * angle.cos(), cy + ry * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Grid {
        width: u32,
        alpha: Vec<u8>,
    }

    impl Grid {
        fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                alpha: vec![0; (width * height) as usize],
            }
        }

        fn at(&self, x: u32, y: u32) -> u8 {
            self.alpha[(y * self.width + x) as usize]
        }
    }

    impl SpanSink for Grid {
        fn blend_span(&mut self, x: u32, y: u32, covers: &[u8], _majority: &[bool]) {
            for (i, c) in covers.iter().enumerate() {
                self.alpha[(y * self.width + x + i as u32) as usize] = *c;
            }
        }
    }

    fn rect(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Vec<Point2d> {
        vec![
            Point2d::new(minx, miny),
            Point2d::new(maxx, miny),
            Point2d::new(maxx, maxy),
            Point2d::new(minx, maxy),
        ]
    }

    fn render(rasterizer: &Rasterizer, rule: FillRule) -> Grid {
        let mut grid = Grid::new(4, 4);
        rasterizer
            .sweep(4, 4, rule, &Gamma::default(), &mut grid)
            .unwrap();
        grid
    }

    #[test]
    fn pixel_aligned_square() {
        let mut rasterizer = Rasterizer::new(4);
        rasterizer.add_polygon(&rect(1.0, 1.0, 3.0, 3.0)).unwrap();
        let grid = render(&rasterizer, FillRule::NonZero);
        for y in 0..4 {
            for x in 0..4 {
                let expected = if (1..3).contains(&x) && (1..3).contains(&y) {
                    255
                } else {
                    0
                };
                assert_eq!(grid.at(x, y), expected, "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn partial_coverage() {
        let mut rasterizer = Rasterizer::new(4);
        rasterizer.add_polygon(&rect(0.0, 0.0, 0.5, 1.0)).unwrap();
        let grid = render(&rasterizer, FillRule::NonZero);
        assert_eq!(grid.at(0, 0), 128);
        assert_eq!(grid.at(1, 0), 0);
    }

    #[test]
    fn fill_rules() {
        let mut rasterizer = Rasterizer::new(4);
        rasterizer.add_polygon(&rect(0.0, 0.0, 4.0, 4.0)).unwrap();
        rasterizer.add_polygon(&rect(1.0, 1.0, 3.0, 3.0)).unwrap();

        assert_eq!(render(&rasterizer, FillRule::NonZero).at(2, 2), 255);
        assert_eq!(render(&rasterizer, FillRule::EvenOdd).at(2, 2), 0);
        assert_eq!(render(&rasterizer, FillRule::EvenOdd).at(0, 0), 255);
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let mut rasterizer = Rasterizer::new(4);
        rasterizer
            .add_path([
                PathCommand::MoveTo(Point2d::new(1.0, 1.0)),
                PathCommand::LineTo(Point2d::new(3.0, 1.0)),
                PathCommand::LineTo(Point2d::new(f64::NAN, 2.0)),
                PathCommand::LineTo(Point2d::new(3.0, 3.0)),
                PathCommand::LineTo(Point2d::new(1.0, 3.0)),
                PathCommand::Close,
            ])
            .unwrap();
        assert_eq!(render(&rasterizer, FillRule::NonZero).at(2, 2), 255);

        let mut degenerate = Rasterizer::new(4);
        degenerate
            .add_polygon(&[Point2d::new(1.0, 1.0), Point2d::new(3.0, 1.0)])
            .unwrap();
        assert!(degenerate.is_empty());
    }

    #[test]
    fn outside_of_area_is_clipped() {
        let mut rasterizer = Rasterizer::new(4);
        rasterizer
            .add_polygon(&rect(-10.0, -10.0, 100.0, 2.0))
            .unwrap();
        let grid = render(&rasterizer, FillRule::NonZero);
        assert_eq!(grid.at(0, 0), 255);
        assert_eq!(grid.at(3, 1), 255);
        assert_eq!(grid.at(3, 2), 0);
    }

    #[test]
    fn sweep_is_deterministic() {
        let mut rasterizer = Rasterizer::default();
        rasterizer.add_ellipse(2.5, 2.5, 1.5, 1.5).unwrap();
        let a = render(&rasterizer, FillRule::NonZero);
        let b = render(&rasterizer, FillRule::NonZero);
        assert_eq!(a.alpha, b.alpha);
        assert_eq!(a.at(2, 2), 255);
        assert_eq!(a.at(0, 0), 0);
    }
}
