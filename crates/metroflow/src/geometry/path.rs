use std::fmt::{self, Write as _};

use eframe::egui::Pos2;

/// Samples per quadratic segment in the arclength table.
const QUAD_SAMPLES: usize = 16;

/// One drawing primitive of a routed path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Line { from: Pos2, to: Pos2 },
    Quad { from: Pos2, ctrl: Pos2, to: Pos2 },
}

impl PathSegment {
    pub fn from(&self) -> Pos2 {
        match *self {
            PathSegment::Line { from, .. } | PathSegment::Quad { from, .. } => from,
        }
    }

    pub fn to(&self) -> Pos2 {
        match *self {
            PathSegment::Line { to, .. } | PathSegment::Quad { to, .. } => to,
        }
    }

    /// Position at curve parameter `t` in [0, 1].
    pub fn eval(&self, t: f32) -> Pos2 {
        match *self {
            PathSegment::Line { from, to } => from + (to - from) * t,
            PathSegment::Quad { from, ctrl, to } => {
                let u = 1.0 - t;
                Pos2::new(
                    from.x * u * u + ctrl.x * 2.0 * u * t + to.x * t * t,
                    from.y * u * u + ctrl.y * 2.0 * u * t + to.y * t * t,
                )
            }
        }
    }
}

/// Cumulative arclength of one segment sampled at uniform parameter steps.
///
/// Lines only need their total length; quads keep `QUAD_SAMPLES + 1` entries
/// so a distance can be mapped back to a parameter.
#[derive(Debug, Clone, PartialEq)]
struct ArcTable {
    lengths: Vec<f32>,
}

impl ArcTable {
    fn measure(segment: &PathSegment) -> Self {
        match *segment {
            PathSegment::Line { from, to } => Self {
                lengths: vec![0.0, (to - from).length()],
            },
            PathSegment::Quad { .. } => {
                let mut lengths = Vec::with_capacity(QUAD_SAMPLES + 1);
                lengths.push(0.0);
                let mut prev = segment.from();
                let mut total = 0.0;
                for i in 1..=QUAD_SAMPLES {
                    let p = segment.eval(i as f32 / QUAD_SAMPLES as f32);
                    total += (p - prev).length();
                    lengths.push(total);
                    prev = p;
                }
                Self { lengths }
            }
        }
    }

    fn total(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Curve parameter at arclength `s` along this segment.
    fn param_at(&self, s: f32) -> f32 {
        let steps = self.lengths.len().saturating_sub(1);
        if steps == 0 || self.total() <= 0.0 {
            return 0.0;
        }
        let idx = self
            .lengths
            .partition_point(|&l| l < s)
            .clamp(1, steps);
        let (l0, l1) = (self.lengths[idx - 1], self.lengths[idx]);
        let local = if l1 > l0 { (s - l0) / (l1 - l0) } else { 0.0 };
        ((idx - 1) as f32 + local.clamp(0.0, 1.0)) / steps as f32
    }
}

/// A routed link path as an ordered list of primitives with a precomputed
/// cumulative-length table.
///
/// Sampling never touches a rendering surface: `length` and
/// `point_at_fraction` are answered from the table.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedPath {
    start: Pos2,
    segments: Vec<PathSegment>,
    tables: Vec<ArcTable>,
    /// `offsets[i]` is the path length before segment `i`.
    offsets: Vec<f32>,
    length: f32,
}

impl RoutedPath {
    pub fn new(start: Pos2, segments: Vec<PathSegment>) -> Self {
        let tables: Vec<ArcTable> = segments.iter().map(ArcTable::measure).collect();
        let mut offsets = Vec::with_capacity(tables.len());
        let mut length = 0.0;
        for table in &tables {
            offsets.push(length);
            length += table.total();
        }
        Self {
            start,
            segments,
            tables,
            offsets,
            length,
        }
    }

    /// The path with no primitives.
    pub fn empty() -> Self {
        Self::new(Pos2::ZERO, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn start(&self) -> Pos2 {
        self.start
    }

    pub fn end(&self) -> Pos2 {
        self.segments.last().map_or(self.start, PathSegment::to)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Point at arclength `distance` from the start, clamped to the path.
    pub fn point_at_length(&self, distance: f32) -> Pos2 {
        if self.segments.is_empty() || self.length <= 0.0 {
            return self.start;
        }
        let distance = if distance.is_nan() {
            0.0
        } else {
            distance.clamp(0.0, self.length)
        };

        let idx = self
            .offsets
            .partition_point(|&o| o <= distance)
            .saturating_sub(1);
        let local = distance - self.offsets[idx];
        let t = self.tables[idx].param_at(local);
        self.segments[idx].eval(t)
    }

    /// Point at `fraction` of the total arclength (fraction clamped to [0, 1]).
    pub fn point_at_fraction(&self, fraction: f32) -> Pos2 {
        self.point_at_length(fraction.clamp(0.0, 1.0) * self.length)
    }

    /// Arclength midpoint, used to centre link labels. `None` for a path with
    /// no length.
    pub fn midpoint(&self) -> Option<Pos2> {
        (self.length > 0.0).then(|| self.point_at_fraction(0.5))
    }

    /// Polyline approximation: segment endpoints plus the sampled points of
    /// every quadratic.
    pub fn flatten(&self) -> Vec<Pos2> {
        if self.segments.is_empty() {
            return Vec::new();
        }
        let mut points = vec![self.start];
        for segment in &self.segments {
            match segment {
                PathSegment::Line { to, .. } => points.push(*to),
                PathSegment::Quad { .. } => {
                    for i in 1..=QUAD_SAMPLES {
                        points.push(segment.eval(i as f32 / QUAD_SAMPLES as f32));
                    }
                }
            }
        }
        points
    }

    /// Shortest distance from `p` to the flattened path.
    pub fn distance_to(&self, p: Pos2) -> f32 {
        let points = self.flatten();
        match points.as_slice() {
            [] => f32::INFINITY,
            [only] => (p - *only).length(),
            _ => points
                .windows(2)
                .map(|w| distance_to_segment(p, w[0], w[1]))
                .fold(f32::INFINITY, f32::min),
        }
    }

    /// SVG path data (`M`, `L`, `Q` commands).
    pub fn to_svg(&self) -> String {
        self.to_string()
    }
}

impl Default for RoutedPath {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for RoutedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return Ok(());
        }
        let mut d = String::new();
        write!(d, "M {} {}", self.start.x, self.start.y)?;
        for segment in &self.segments {
            match segment {
                PathSegment::Line { to, .. } => write!(d, " L {} {}", to.x, to.y)?,
                PathSegment::Quad { ctrl, to, .. } => {
                    write!(d, " Q {} {} {} {}", ctrl.x, ctrl.y, to.x, to.y)?
                }
            }
        }
        f.write_str(&d)
    }
}

fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}
