use std::collections::BTreeMap;

use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    data::osm::{OsmId, Tags},
    errors::{Error, Result},
    map::{color::Color, scheme::RoadStyle, units::LengthParser},
};

/// Meters.
pub const LANE_WIDTH: f64 = 3.7;

/// Fewer half-edges than this at a node get no junction shape.
const MIN_JUNCTION_PARTS: usize = 4;

const EPSILON: f32 = 1e-6;

/// Road width in meters: lanes first, then the `width` tag, then the rule default.
/// A tag that does not parse is reported and the next source is used.
pub fn road_width(tags: &Tags, style: &RoadStyle, lengths: &LengthParser) -> (f64, Vec<Error>) {
    let mut errors = Vec::new();
    if let Some(lanes) = tags.get("lanes") {
        match lanes.trim().parse::<u32>() {
            Ok(lanes) if lanes > 0 => return (lanes as f64 * LANE_WIDTH, errors),
            Ok(_) => errors.push(Error::malformed("Road with 0 lanes")),
            Err(err) => errors.push(Error::malformed(format!("Invalid lanes `{}`: {}", lanes, err))),
        }
    }
    if let Some(width) = tags.get("width") {
        match lengths.parse(width) {
            Ok(width) if width > 0.0 => return (width, errors),
            Ok(_) => errors.push(Error::malformed(format!("Road width `{}` is not positive", width))),
            Err(err) => errors.push(err),
        }
    }
    (style.default_width, errors)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadNode {
    pub id: OsmId,
    pub position: Vector2F,
    /// Pixels per meter at the node.
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Road {
    pub id: OsmId,
    pub nodes: Vec<RoadNode>,
    pub style: RoadStyle,
    /// Meters.
    pub width: f64,
    pub layer: i32,
}

impl Road {
    /// Stroke width in pixels, measured at the first node.
    pub fn pixel_width(&self) -> f32 {
        let scale = self.nodes.first().map_or(0.0, |node| node.scale);
        self.width as f32 * scale
    }

    pub fn points(&self) -> Vec<Vector2F> {
        self.nodes.iter().map(|node| node.position).collect()
    }

    /// Both directed half-edges of every segment, keyed by the node they start at.
    fn parts(&self) -> impl Iterator<Item = (OsmId, RoadPart)> + '_ {
        self.nodes.windows(2).flat_map(move |pair| {
            let (first, second) = (&pair[0], &pair[1]);
            let forward = RoadPart::new(self, first.position, second.position, first.scale);
            let backward = RoadPart::new(self, second.position, first.position, second.scale);
            [forward.map(|part| (first.id, part)), backward.map(|part| (second.id, part))]
                .into_iter()
                .flatten()
        })
    }
}

/// Road segment seen from one of its ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadPart {
    pub road_id: OsmId,
    pub start: Vector2F,
    /// Unit vector towards the other end.
    pub direction: Vector2F,
    pub length: f32,
    /// Pixels.
    pub width: f32,
    pub color: Color,
    pub priority: f64,
}

impl RoadPart {
    /// `None` for a segment without length.
    fn new(road: &Road, start: Vector2F, end: Vector2F, scale: f32) -> Option<Self> {
        let delta = end - start;
        let length = delta.length();
        if length < EPSILON {
            return None;
        }
        Some(RoadPart {
            road_id: road.id,
            start,
            direction: delta * (1.0 / length),
            length,
            width: road.width as f32 * scale,
            color: road.style.color,
            priority: road.style.priority,
        })
    }

    pub fn angle(&self) -> f32 {
        self.direction.y().atan2(self.direction.x())
    }

    /// Edge on the side of increasing angle.
    fn leading_edge(&self) -> Vector2F {
        self.start + vec2f(-self.direction.y(), self.direction.x()) * (self.width / 2.0)
    }

    /// Edge on the side of decreasing angle.
    fn trailing_edge(&self) -> Vector2F {
        self.start + vec2f(self.direction.y(), -self.direction.x()) * (self.width / 2.0)
    }
}

fn cross(a: Vector2F, b: Vector2F) -> f32 {
    a.x() * b.y() - a.y() * b.x()
}

/// Corner where the leading edge of `part` meets the trailing edge of `next`.
/// Parallel or diverging edges fall back to the midpoint of their start points.
fn corner(part: &RoadPart, next: &RoadPart) -> Vector2F {
    let p = part.leading_edge();
    let q = next.trailing_edge();
    let denominator = cross(part.direction, next.direction);
    if denominator.abs() < EPSILON {
        return (p + q) * 0.5;
    }
    let t = cross(q - p, next.direction) / denominator;
    let s = cross(q - p, part.direction) / denominator;
    if t < 0.0 || s < 0.0 {
        return (p + q) * 0.5;
    }
    p + part.direction * t.min(part.length)
}

/// Polygon covering the gap where four or more road half-edges meet.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub node_id: OsmId,
    pub polygon: Vec<Vector2F>,
    pub color: Color,
}

impl Junction {
    /// `None` below four distinct half-edges. Half-edges are ordered by angle,
    /// ties by width, priority and road id, and each corner joins one
    /// half-edge to its angular neighbour.
    pub fn resolve(node_id: OsmId, mut parts: Vec<RoadPart>) -> Option<Junction> {
        parts.sort_by(|a, b| {
            a.angle()
                .total_cmp(&b.angle())
                .then(a.width.total_cmp(&b.width))
                .then(b.priority.total_cmp(&a.priority))
                .then(a.road_id.cmp(&b.road_id))
        });
        // Ways drawn over each other leave identical half-edges.
        parts.dedup_by(|later, kept| later.angle() == kept.angle() && later.width == kept.width);
        if parts.len() < MIN_JUNCTION_PARTS {
            return None;
        }

        let polygon = parts.iter()
            .zip(parts.iter().cycle().skip(1))
            .map(|(part, next)| corner(part, next))
            .collect();

        let color = parts.iter()
            .fold(None::<&RoadPart>, |best, part| match best {
                Some(best) if best.priority >= part.priority => Some(best),
                _ => Some(part),
            })
            .map(|part| part.color)?;

        Some(Junction { node_id, polygon, color })
    }
}

/// Junctions of all nodes shared by the given roads, in node id order.
pub fn resolve_junctions<'a>(roads: impl IntoIterator<Item = &'a Road>) -> Vec<Junction> {
    let mut parts_by_node: BTreeMap<OsmId, Vec<RoadPart>> = BTreeMap::new();
    for road in roads {
        for (node_id, part) in road.parts() {
            parts_by_node.entry(node_id).or_default().push(part);
        }
    }
    parts_by_node
        .into_iter()
        .filter_map(|(node_id, parts)| Junction::resolve(node_id, parts))
        .collect()
}

/// `layer` tag; roads without one are on layer 0.
pub fn parse_layer(tags: &Tags) -> Result<i32> {
    match tags.get("layer") {
        Some(layer) => Ok(layer.trim().parse()?),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::tags_from;

    fn style() -> RoadStyle {
        RoadStyle {
            color: Color::WHITE,
            border_color: Color::BLACK,
            default_width: 5.0,
            priority: 41.0,
        }
    }

    fn road(id: OsmId, nodes: &[(OsmId, f32, f32)]) -> Road {
        Road {
            id,
            nodes: nodes
                .iter()
                .map(|&(id, x, y)| RoadNode { id, position: vec2f(x, y), scale: 1.0 })
                .collect(),
            style: style(),
            width: 4.0,
            layer: 0,
        }
    }

    fn cross_roads() -> Vec<Road> {
        vec![
            road(1, &[(10, -20.0, 0.0), (0, 0.0, 0.0), (11, 20.0, 0.0)]),
            road(2, &[(12, 0.0, -20.0), (0, 0.0, 0.0), (13, 0.0, 20.0)]),
        ]
    }

    #[test]
    fn test_width_sources() {
        let lengths = LengthParser::new().unwrap();
        let (width, errors) = road_width(&tags_from([("lanes", "2"), ("width", "20")]), &style(), &lengths);
        assert_eq!(width, 2.0 * LANE_WIDTH);
        assert!(errors.is_empty());

        let (width, _) = road_width(&tags_from([("width", "9 m")]), &style(), &lengths);
        assert_eq!(width, 9.0);

        let (width, errors) = road_width(&tags_from([("lanes", "two")]), &style(), &lengths);
        assert_eq!(width, 5.0);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_four_way_junction() {
        let junctions = resolve_junctions(&cross_roads());
        assert_eq!(junctions.len(), 1);
        let junction = &junctions[0];
        assert_eq!(junction.node_id, 0);
        assert_eq!(junction.polygon.len(), 4);
        for corner in &junction.polygon {
            assert!((corner.x().abs() - 2.0).abs() < 1e-4);
            assert!((corner.y().abs() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_three_way_has_no_junction() {
        let roads = vec![
            road(1, &[(10, -20.0, 0.0), (0, 0.0, 0.0), (11, 20.0, 0.0)]),
            road(2, &[(12, 0.0, -20.0), (0, 0.0, 0.0)]),
        ];
        assert!(resolve_junctions(&roads).is_empty());

        let parts: Vec<RoadPart> = roads[0].parts().map(|(_, part)| part).collect();
        assert!(Junction::resolve(0, parts[..3].to_vec()).is_none());
    }

    #[test]
    fn test_coincident_directions_are_stable() {
        let mut roads = cross_roads();
        roads.push(road(3, &[(0, 0.0, 0.0), (14, 20.0, 0.0)]));
        let forward = resolve_junctions(&roads);
        roads.reverse();
        let backward = resolve_junctions(&roads);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_duplicate_ways_are_one_road() {
        let mut roads = vec![
            road(1, &[(10, -20.0, 0.0), (0, 0.0, 0.0), (11, 20.0, 0.0)]),
            road(2, &[(12, 0.0, -20.0), (0, 0.0, 0.0)]),
        ];
        roads.push(Road { id: 3, ..roads[1].clone() });
        assert!(resolve_junctions(&roads).is_empty());

        roads.push(road(4, &[(0, 0.0, 0.0), (13, 0.0, 20.0)]));
        let junctions = resolve_junctions(&roads);
        assert_eq!(junctions.len(), 1);
        assert_eq!(junctions[0].polygon.len(), 4);
    }

    #[test]
    fn test_zero_length_segments_are_ignored() {
        let roads = vec![road(1, &[(1, 5.0, 5.0), (2, 5.0, 5.0)])];
        assert_eq!(roads[0].parts().count(), 0);
    }

    #[test]
    fn test_layer() {
        assert_eq!(parse_layer(&tags_from([("layer", "-1")])).unwrap(), -1);
        assert_eq!(parse_layer(&Tags::new()).unwrap(), 0);
        assert!(parse_layer(&tags_from([("layer", "bridge")])).is_err());
    }
}
