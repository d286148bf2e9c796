use std::fmt;

use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    data::osm::OsmId,
    errors::ErrorKind,
    map::{
        buildings::Building,
        color::Color,
        features::{Crater, DirectionSector, Tree},
        icon::IconSet,
        roads::Road,
        scheme::LineStyle,
        svg::PathCommands,
    },
};

/// Element a drawable was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementRef {
    Node(OsmId),
    Way(OsmId),
    Relation(OsmId),
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRef::Node(id) => write!(f, "node/{}", id),
            ElementRef::Way(id) => write!(f, "way/{}", id),
            ElementRef::Relation(id) => write!(f, "relation/{}", id),
        }
    }
}

/// A per-element problem that was recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub element: ElementRef,
    pub kind: ErrorKind,
    pub message: String,
}

/// Twice the signed area; positive for clockwise rings on the y-down plane.
pub fn signed_area(ring: &[Vector2F]) -> f32 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x() * b.y() - b.x() * a.y())
        .sum()
}

/// Area-weighted centroid, or the vertex mean for rings without area.
pub fn centroid(ring: &[Vector2F]) -> Option<Vector2F> {
    if ring.is_empty() {
        return None;
    }
    let area = signed_area(ring);
    if area.abs() < f32::EPSILON {
        let sum = ring.iter().fold(Vector2F::zero(), |sum, point| sum + *point);
        return Some(sum * (1.0 / ring.len() as f32));
    }
    let (x, y) = ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .fold((0.0, 0.0), |(x, y), (a, b)| {
            let cross = a.x() * b.y() - b.x() * a.y();
            (x + (a.x() + b.x()) * cross, y + (a.y() + b.y()) * cross)
        });
    Some(vec2f(x / (3.0 * area), y / (3.0 * area)))
}

fn oriented(mut ring: Vec<Vector2F>, clockwise: bool) -> Vec<Vector2F> {
    if (signed_area(&ring) > 0.0) != clockwise {
        ring.reverse();
    }
    ring
}

/// Planar polyline or polygon with holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub outers: Vec<Vec<Vector2F>>,
    pub inners: Vec<Vec<Vector2F>>,
    pub closed: bool,
}

impl Figure {
    /// With holes, outer and inner rings get opposite windings so that the
    /// default fill rule leaves the holes empty.
    pub fn new(outers: Vec<Vec<Vector2F>>, inners: Vec<Vec<Vector2F>>, closed: bool) -> Self {
        if closed && !inners.is_empty() {
            Figure {
                outers: outers.into_iter().map(|ring| oriented(ring, false)).collect(),
                inners: inners.into_iter().map(|ring| oriented(ring, true)).collect(),
                closed,
            }
        } else {
            Figure { outers, inners, closed }
        }
    }

    pub fn path(&self, offset: Vector2F) -> PathCommands {
        let mut commands = PathCommands::new();
        for ring in self.outers.iter().chain(&self.inners) {
            let shifted: Vec<Vector2F> = ring.iter().map(|point| *point + offset).collect();
            commands = commands.polyline(&shifted, self.closed);
        }
        commands
    }

    pub fn centroid(&self) -> Option<Vector2F> {
        self.outers.first().and_then(|ring| centroid(ring))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyledFigure {
    pub element: ElementRef,
    pub figure: Figure,
    pub style: LineStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub size: f32,
    pub color: Color,
}

/// Icon-marked position.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub element: ElementRef,
    pub icon_set: IconSet,
    pub priority: i32,
    pub labels: Vec<Label>,
    pub position: Vector2F,
}

/// Everything the compositor draws, built once per render.
#[derive(Debug, Default)]
pub struct DrawableSet {
    pub points: Vec<Point>,
    pub figures: Vec<StyledFigure>,
    pub buildings: Vec<Building>,
    pub roads: Vec<Road>,
    pub trees: Vec<Tree>,
    pub craters: Vec<Crater>,
    pub direction_sectors: Vec<DirectionSector>,
    /// Distinct building heights and minimum heights above 0, ascending.
    pub heights: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DrawableSet {
    pub fn add_height(&mut self, height: f64) {
        if height <= 0.0 || !height.is_finite() {
            return;
        }
        if let Err(index) = self.heights.binary_search_by(|existing| existing.total_cmp(&height)) {
            self.heights.insert(index, height);
        }
    }

    pub fn diagnostics_of(&self, kind: ErrorKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |diagnostic| diagnostic.kind == kind)
    }
}
