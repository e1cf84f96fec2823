use crate::foundation::core::{BezPath, Point};
use crate::foundation::error::{SketchError, SketchResult};

/// Pixel coordinate of one traced ink sample, in canvas space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PathPoint {
    pub x: u32,
    pub y: u32,
}

impl PathPoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(f64::from(self.x), f64::from(self.y))
    }
}

/// One traced stroke: ink samples in discovery order.
///
/// Always holds at least [`DrawingPath::MIN_POINTS`] points, so it can be stroked as a polyline.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DrawingPath {
    points: Vec<PathPoint>,
}

impl DrawingPath {
    pub const MIN_POINTS: usize = 2;

    pub fn new(points: Vec<PathPoint>) -> SketchResult<Self> {
        if points.len() < Self::MIN_POINTS {
            return Err(SketchError::input(format!(
                "drawing path needs at least {} points, got {}",
                Self::MIN_POINTS,
                points.len()
            )));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn first(&self) -> PathPoint {
        self.points[0]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline through every point, in order.
    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            path.move_to(first.to_point());
        }
        for p in iter {
            path.line_to(p.to_point());
        }
        path
    }
}
