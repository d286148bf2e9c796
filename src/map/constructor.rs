use std::collections::VecDeque;

use log::{info, warn};
use pathfinder_geometry::vector::Vector2F;

use crate::{
    config::{BuildingMode, LabelMode, MapConfiguration},
    data::{
        osm::{has_kv_pair, MapCoords, MemberType, Node, OsmId, Relation, Tags, Way},
        OsmMapData,
    },
    errors::{Error, Result},
    map::{
        buildings::{is_building, is_building_part, parse_heights, Building},
        color::Color,
        features::{Crater, DirectionColors, DirectionSector, Tree},
        level::LevelFilter,
        projection::Projector,
        roads::{parse_layer, road_width, Road, RoadNode},
        scene::{Diagnostic, DrawableSet, ElementRef, Figure, Label, Point, StyledFigure},
        scheme::{RoadStyle, Scheme},
        shapes::ShapeProvider,
        units::LengthParser,
    },
};

const MAIN_LABEL_SIZE: f32 = 10.0;
const LABEL_SIZE: f32 = 8.0;
/// Address parts joined into one label, in this order.
const ADDRESS_KEYS: [&str; 5] = ["addr:housenumber", "addr:postcode", "addr:country", "addr:city", "addr:street"];

/// Joins ways into rings through shared end nodes. Ways that cannot be closed
/// come back as open chains.
pub fn assemble_rings(ways: Vec<Vec<OsmId>>) -> Vec<Vec<OsmId>> {
    let mut remaining: VecDeque<Vec<OsmId>> = ways.into_iter().filter(|way| way.len() >= 2).collect();
    let mut rings = Vec::new();

    while let Some(mut ring) = remaining.pop_front() {
        while ring.first() != ring.last() {
            let Some(&tail) = ring.last() else {
                break;
            };
            let Some(position) = remaining
                .iter()
                .position(|way| way.first() == Some(&tail) || way.last() == Some(&tail))
            else {
                break;
            };
            let Some(mut next) = remaining.remove(position) else {
                break;
            };
            if next.first() != Some(&tail) {
                next.reverse();
            }
            ring.extend(next.into_iter().skip(1));
        }
        rings.push(ring);
    }
    rings
}

fn is_closed_ring(ring: &[OsmId]) -> bool {
    ring.len() > 3 && ring.first() == ring.last()
}

/// Turns OSM elements into drawables. The projector, scheme and shapes are
/// only read, so one constructor can build any number of scenes.
pub struct Constructor<'a> {
    projector: &'a Projector,
    scheme: &'a Scheme,
    shapes: &'a dyn ShapeProvider,
    configuration: &'a MapConfiguration,
    lengths: LengthParser,
    direction_colors: DirectionColors,
    level: LevelFilter,
}

impl<'a> Constructor<'a> {
    pub fn new(
        projector: &'a Projector,
        scheme: &'a Scheme,
        shapes: &'a dyn ShapeProvider,
        configuration: &'a MapConfiguration,
    ) -> Result<Self> {
        let direction_colors = DirectionColors {
            view: scheme.color_or("direction_view_color", scheme.default_color()),
            camera: scheme.color_or("direction_camera_color", scheme.default_color()),
        };
        let level = if configuration.ignore_level_matching {
            LevelFilter::All
        } else {
            LevelFilter::parse(&configuration.level)?
        };
        Ok(Constructor {
            projector,
            scheme,
            shapes,
            configuration,
            lengths: LengthParser::new()?,
            direction_colors,
            level,
        })
    }

    pub fn build(&self, data: &OsmMapData) -> DrawableSet {
        let mut scene = DrawableSet::default();

        for node in data.sorted_node_ids().iter().filter_map(|id| data.nodes.get(id)) {
            self.construct_node(node, &mut scene);
        }
        for way in data.sorted_way_ids().iter().filter_map(|id| data.ways.get(id)) {
            self.construct_way(data, way, &mut scene);
        }
        for relation in data.sorted_relation_ids().iter().filter_map(|id| data.relations.get(id)) {
            self.construct_relation(data, relation, &mut scene);
        }

        info!(
            points = scene.points.len(),
            figures = scene.figures.len(),
            buildings = scene.buildings.len(),
            roads = scene.roads.len(),
            diagnostics = scene.diagnostics.len();
            "Constructed scene"
        );
        scene
    }

    fn record(scene: &mut DrawableSet, element: ElementRef, err: Error) {
        let element_name = element.to_string();
        warn!(element = element_name.as_str(), kind = err.kind.as_str(), err = err.message.as_str(); "Recovered from element error");
        scene.diagnostics.push(Diagnostic { element, kind: err.kind, message: err.message });
    }

    fn labels(&self, tags: &Tags) -> Vec<Label> {
        let keys: &[&str] = match self.configuration.label_mode {
            LabelMode::No => &[],
            LabelMode::Main | LabelMode::Address => &["name"],
            LabelMode::All => &["name", "ref", "operator", "addr:housenumber"],
        };
        let color = self.scheme.color_or("label_color", Color::BLACK);
        let mut labels: Vec<Label> = keys.iter()
            .filter_map(|key| tags.get(*key).map(|text| (*key, text.trim())))
            .filter(|(_, text)| !text.is_empty())
            .map(|(key, text)| Label {
                text: text.to_string(),
                size: if key == "name" { MAIN_LABEL_SIZE } else { LABEL_SIZE },
                color,
            })
            .collect();

        if self.configuration.label_mode == LabelMode::Address {
            let address: Vec<&str> = ADDRESS_KEYS.iter()
                .filter_map(|key| tags.get(*key))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .collect();
            if !address.is_empty() {
                labels.push(Label { text: address.join(", "), size: LABEL_SIZE, color });
            }
        }
        labels
    }

    /// `building:part` outlines only count in full isometric mode.
    fn counts_as_building(&self, tags: &Tags) -> bool {
        is_building(tags)
            || (self.configuration.building_mode == BuildingMode::Isometric && is_building_part(tags))
    }

    fn construct_node(&self, node: &Node, scene: &mut DrawableSet) {
        if node.tags.is_empty() || !self.level.matches(&node.tags) {
            return;
        }
        let element = ElementRef::Node(node.id);
        let coords = MapCoords::from(node);
        let position = self.projector.to_plane(&coords);
        let scale = self.projector.local_scale(node.lat);

        let (icon_set, matched) = self.scheme.resolve(self.shapes, &node.tags);
        scene.points.push(Point {
            element,
            icon_set,
            priority: self.scheme.point_priority(&matched),
            labels: self.labels(&node.tags),
            position,
        });

        if has_kv_pair(&node.tags, "natural", "tree") {
            let (tree, errors) = Tree::from_tags(position, scale, &node.tags, &self.lengths);
            scene.trees.push(tree);
            for err in errors {
                Self::record(scene, element, err);
            }
        }
        if has_kv_pair(&node.tags, "natural", "crater") {
            match Crater::from_tags(position, scale, &node.tags, &self.lengths) {
                Ok(Some(crater)) => scene.craters.push(crater),
                Ok(None) => (),
                Err(err) => Self::record(scene, element, err),
            }
        }
        if node.tags.contains_key("direction") || node.tags.contains_key("camera:direction") {
            match DirectionSector::from_tags(position, &node.tags, &self.direction_colors) {
                Ok(Some(sector)) => scene.direction_sectors.push(sector),
                Ok(None) => (),
                Err(err) => Self::record(scene, element, err),
            }
        }
    }

    /// Nodes of `node_ids` that exist, reporting the ones that do not.
    fn resolve_nodes<'d>(
        data: &'d OsmMapData,
        element: ElementRef,
        node_ids: &[OsmId],
        scene: &mut DrawableSet,
    ) -> Vec<&'d Node> {
        let nodes: Vec<&Node> = node_ids.iter().filter_map(|id| data.nodes.get(id)).collect();
        let missing = node_ids.len() - nodes.len();
        if missing > 0 {
            Self::record(scene, element, Error::malformed(format!("{} referenced nodes are missing", missing)));
        }
        nodes
    }

    fn ring_points(&self, nodes: &[&Node]) -> Vec<Vector2F> {
        nodes.iter().map(|node| self.projector.to_plane(&MapCoords::from(*node))).collect()
    }

    fn construct_way(&self, data: &OsmMapData, way: &Way, scene: &mut DrawableSet) {
        if !self.level.matches(&way.tags) {
            return;
        }
        let element = ElementRef::Way(way.id);
        let nodes = Self::resolve_nodes(data, element, &way.nodes, scene);

        let mut distinct: Vec<OsmId> = nodes.iter().map(|node| node.id).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            Self::record(scene, element, Error::malformed("Way needs at least 2 distinct nodes"));
            return;
        }
        let closed = nodes.len() > 2 && nodes.first().map(|node| node.id) == nodes.last().map(|node| node.id);
        let points = self.ring_points(&nodes);

        if closed && self.counts_as_building(&way.tags) {
            let figure = Figure::new(vec![points], Vec::new(), true);
            self.add_area_icon(element, &way.tags, &figure, scene);
            self.add_building(element, &way.tags, figure, scene);
            return;
        }

        if !has_kv_pair(&way.tags, "area", "yes") {
            if let Some(style) = self.scheme.get_road(&way.tags) {
                self.add_road(way, &nodes, style.clone(), scene);
                return;
            }
        }

        let figure = Figure::new(vec![points], Vec::new(), closed);
        if closed {
            self.add_area_icon(element, &way.tags, &figure, scene);
        }
        self.add_figures(element, &way.tags, figure, scene);
    }

    fn construct_relation(&self, data: &OsmMapData, relation: &Relation, scene: &mut DrawableSet) {
        if !has_kv_pair(&relation.tags, "type", "multipolygon") || !self.level.matches(&relation.tags) {
            return;
        }
        let element = ElementRef::Relation(relation.id);

        let mut outer_ways = Vec::new();
        let mut inner_ways = Vec::new();
        let mut missing = 0;
        for member in relation.members.iter().filter(|member| member.member_type == MemberType::Way) {
            let Some(way) = data.ways.get(&member.reference) else {
                missing += 1;
                continue;
            };
            match member.role.as_str() {
                "inner" => inner_ways.push(way.nodes.clone()),
                _ => outer_ways.push(way.nodes.clone()),
            }
        }
        if missing > 0 {
            Self::record(scene, element, Error::malformed(format!("{} member ways are missing", missing)));
        }

        let to_rings = |ways: Vec<Vec<OsmId>>, scene: &mut DrawableSet| -> Vec<Vec<Vector2F>> {
            let (closed, open): (Vec<_>, Vec<_>) = assemble_rings(ways)
                .into_iter()
                .partition(|ring| is_closed_ring(ring));
            if !open.is_empty() {
                Self::record(scene, element, Error::malformed(format!("{} rings do not close", open.len())));
            }
            closed.iter()
                .map(|ring| {
                    let nodes = Self::resolve_nodes(data, element, ring, scene);
                    self.ring_points(&nodes)
                })
                .filter(|ring| ring.len() > 3)
                .collect()
        };
        let outers = to_rings(outer_ways, scene);
        let inners = to_rings(inner_ways, scene);
        if outers.is_empty() {
            Self::record(scene, element, Error::malformed("Multipolygon without outer ring"));
            return;
        }

        let figure = Figure::new(outers, inners, true);
        self.add_area_icon(element, &relation.tags, &figure, scene);
        if self.counts_as_building(&relation.tags) {
            self.add_building(element, &relation.tags, figure, scene);
        } else {
            self.add_figures(element, &relation.tags, figure, scene);
        }
    }

    fn add_figures(&self, element: ElementRef, tags: &Tags, figure: Figure, scene: &mut DrawableSet) {
        for style in self.scheme.get_styles(tags) {
            let style = if figure.closed || !style.is_filled() { style } else { style.without_fill() };
            scene.figures.push(StyledFigure { element, figure: figure.clone(), style });
        }
    }

    fn add_building(&self, element: ElementRef, tags: &Tags, figure: Figure, scene: &mut DrawableSet) {
        let (height, min_height, errors) = parse_heights(tags, &self.lengths);
        for err in errors {
            Self::record(scene, element, err);
        }
        scene.add_height(height);
        scene.add_height(min_height);

        let mut building = Building::new(element, figure, height, min_height);
        if self.configuration.use_building_colors {
            building.wall_color = Self::tag_color(element, tags, "building:colour", scene);
            building.roof_color = Self::tag_color(element, tags, "roof:colour", scene);
        }
        scene.buildings.push(building);
    }

    fn tag_color(element: ElementRef, tags: &Tags, key: &str, scene: &mut DrawableSet) -> Option<Color> {
        match Color::parse(tags.get(key)?) {
            Ok(color) => Some(color),
            Err(err) => {
                Self::record(scene, element, err);
                None
            }
        }
    }

    fn add_road(&self, way: &Way, nodes: &[&Node], style: RoadStyle, scene: &mut DrawableSet) {
        let element = ElementRef::Way(way.id);
        let (width, errors) = road_width(&way.tags, &style, &self.lengths);
        for err in errors {
            Self::record(scene, element, err);
        }
        let layer = parse_layer(&way.tags).unwrap_or_else(|err| {
            Self::record(scene, element, err);
            0
        });
        let nodes = nodes
            .iter()
            .map(|node| RoadNode {
                id: node.id,
                position: self.projector.to_plane(&MapCoords::from(*node)),
                scale: self.projector.local_scale(node.lat),
            })
            .collect();
        scene.roads.push(Road { id: way.id, nodes, style, width, layer });
    }

    /// Areas whose tags describe something get its icon at their centroid.
    fn add_area_icon(&self, element: ElementRef, tags: &Tags, figure: &Figure, scene: &mut DrawableSet) {
        let (icon_set, matched) = self.scheme.resolve(self.shapes, tags);
        if icon_set.main_icon.is_default() {
            return;
        }
        let Some(position) = figure.centroid() else {
            return;
        };
        scene.points.push(Point {
            element,
            icon_set,
            priority: self.scheme.point_priority(&matched),
            labels: self.labels(tags),
            position,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        errors::ErrorKind,
        data::{
            boundary::BoundaryBox,
            osm::{tags_from, Member},
        },
        map::{projection::EQUATOR_LENGTH, shapes::ShapeLibrary},
    };

    pub(crate) struct Fixture {
        pub projector: Projector,
        pub scheme: Scheme,
        pub shapes: ShapeLibrary,
        pub configuration: MapConfiguration,
    }

    impl Fixture {
        pub fn new() -> Self {
            let boundary = BoundaryBox::new(-0.001, -0.001, 0.001, 0.001).unwrap();
            Fixture {
                projector: Projector::new(boundary, 18.0, EQUATOR_LENGTH).unwrap(),
                scheme: Scheme::builtin().unwrap(),
                shapes: ShapeLibrary::builtin().unwrap(),
                configuration: MapConfiguration::default(),
            }
        }

        pub fn build(&self, data: &OsmMapData) -> DrawableSet {
            Constructor::new(&self.projector, &self.scheme, &self.shapes, &self.configuration)
                .unwrap()
                .build(data)
        }
    }

    pub(crate) fn node(data: &mut OsmMapData, id: OsmId, lat: f64, lon: f64, tags: &[(&str, &str)]) {
        data.add_node(Node { id, lat, lon, tags: tags_from(tags.iter().copied()) });
    }

    pub(crate) fn way(data: &mut OsmMapData, id: OsmId, nodes: &[OsmId], tags: &[(&str, &str)]) {
        data.add_way(Way { id, nodes: nodes.to_vec(), tags: tags_from(tags.iter().copied()) });
    }

    /// Four corners of a square, node ids `first..first + 4`.
    pub(crate) fn square(data: &mut OsmMapData, first: OsmId, center: (f64, f64), half: f64) -> Vec<OsmId> {
        let (lat, lon) = center;
        let corners = [(lat - half, lon - half), (lat - half, lon + half), (lat + half, lon + half), (lat + half, lon - half)];
        for (offset, (lat, lon)) in corners.iter().enumerate() {
            node(data, first + offset as OsmId, *lat, *lon, &[]);
        }
        vec![first, first + 1, first + 2, first + 3, first]
    }

    #[test]
    fn test_tree_node() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[("natural", "tree"), ("diameter_crown", "6")]);
        node(&mut data, 2, 0.0005, 0.0, &[]);
        let scene = fixture.build(&data);

        assert_eq!(scene.points.len(), 1);
        assert_eq!(scene.points[0].icon_set.main_icon.shape_specifications[0].shape.id, "tree");
        assert_eq!(scene.trees.len(), 1);
        assert_eq!(scene.trees[0].crown_radius, 3.0);
        assert!(scene.diagnostics.is_empty());
    }

    #[test]
    fn test_building_without_height_is_flat() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let ring = square(&mut data, 1, (0.0, 0.0), 0.0001);
        way(&mut data, 10, &ring, &[("building", "yes")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.buildings.len(), 1);
        assert_eq!(scene.buildings[0].height, 0.0);
        assert!(!scene.buildings[0].is_extruded());
        assert!(scene.heights.is_empty());
        assert!(scene.figures.is_empty());
    }

    #[test]
    fn test_malformed_height_does_not_stop_construction() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let first = square(&mut data, 1, (0.0, 0.0), 0.0001);
        let second = square(&mut data, 5, (0.0005, 0.0005), 0.0001);
        way(&mut data, 10, &first, &[("building", "yes"), ("height", "very tall")]);
        way(&mut data, 11, &second, &[("building", "yes"), ("height", "9")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.buildings.len(), 2);
        assert_eq!(scene.buildings[0].height, 0.0);
        assert_eq!(scene.heights, vec![9.0]);
        let diagnostics: Vec<&Diagnostic> = scene.diagnostics_of(ErrorKind::MalformedElement).collect();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].element, ElementRef::Way(10));
    }

    #[test]
    fn test_heights_are_collected() {
        let mut fixture = Fixture::new();
        fixture.configuration.building_mode = BuildingMode::Isometric;
        let mut data = OsmMapData::default();
        let rings = [
            square(&mut data, 1, (0.0, 0.0), 0.0001),
            square(&mut data, 5, (0.0003, 0.0), 0.0001),
            square(&mut data, 9, (0.0006, 0.0), 0.0001),
        ];
        way(&mut data, 10, &rings[0], &[("building", "yes"), ("height", "20")]);
        way(&mut data, 11, &rings[1], &[("building", "yes"), ("height", "5")]);
        way(&mut data, 12, &rings[2], &[("building:part", "yes"), ("height", "12"), ("min_height", "5")]);
        let scene = fixture.build(&data);
        assert_eq!(scene.heights, vec![5.0, 12.0, 20.0]);
    }

    #[test]
    fn test_degenerate_ways_are_reported() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[]);
        way(&mut data, 10, &[], &[("natural", "wood")]);
        way(&mut data, 11, &[1, 1], &[("natural", "wood")]);
        way(&mut data, 12, &[1, 99], &[("natural", "wood")]);
        let scene = fixture.build(&data);

        assert!(scene.figures.is_empty());
        let elements: Vec<ElementRef> = scene.diagnostics.iter().map(|diagnostic| diagnostic.element).collect();
        assert!(elements.contains(&ElementRef::Way(10)));
        assert!(elements.contains(&ElementRef::Way(11)));
        assert!(elements.contains(&ElementRef::Way(12)));
    }

    #[test]
    fn test_open_ways_are_not_filled() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let ring = square(&mut data, 1, (0.0, 0.0), 0.0002);
        way(&mut data, 10, &ring, &[("natural", "wood")]);
        way(&mut data, 11, &ring[..3], &[("natural", "wood")]);
        way(&mut data, 12, &ring[..3], &[("waterway", "river")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.figures.len(), 3);
        assert!(scene.figures[0].style.is_filled());
        assert!(!scene.figures[1].style.is_filled());
        assert!(!scene.figures[2].style.is_filled());
        assert!(scene.figures[2].style.priority > scene.figures[0].style.priority);
    }

    #[test]
    fn test_roads() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, -0.0005, &[]);
        node(&mut data, 2, 0.0, 0.0005, &[]);
        way(&mut data, 10, &[1, 2], &[("highway", "primary"), ("lanes", "2"), ("layer", "1")]);
        way(&mut data, 11, &[1, 2], &[("highway", "residential"), ("lanes", "many")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.roads.len(), 2);
        assert!((scene.roads[0].width - 7.4).abs() < 1e-9);
        assert_eq!(scene.roads[0].layer, 1);
        assert_eq!(scene.roads[1].width, 5.5);
        assert_eq!(scene.diagnostics.len(), 1);
        assert!(scene.roads[0].pixel_width() > 0.0);
    }

    #[test]
    fn test_multipolygon() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let outer = square(&mut data, 1, (0.0, 0.0), 0.0004);
        let inner = square(&mut data, 5, (0.0, 0.0), 0.0001);
        way(&mut data, 10, &outer[..3], &[]);
        way(&mut data, 11, &[outer[4], outer[3], outer[2]], &[]);
        way(&mut data, 12, &inner, &[]);
        data.add_relation(Relation {
            id: 100,
            members: vec![
                Member { member_type: MemberType::Way, reference: 10, role: "outer".to_string() },
                Member { member_type: MemberType::Way, reference: 11, role: "outer".to_string() },
                Member { member_type: MemberType::Way, reference: 12, role: "inner".to_string() },
            ],
            tags: tags_from([("type", "multipolygon"), ("natural", "water")]),
        });
        let scene = fixture.build(&data);

        let figures: Vec<&StyledFigure> = scene.figures
            .iter()
            .filter(|figure| figure.element == ElementRef::Relation(100))
            .collect();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].figure.outers.len(), 1);
        assert_eq!(figures[0].figure.outers[0].len(), 5);
        assert_eq!(figures[0].figure.inners.len(), 1);
    }

    #[test]
    fn test_assemble_rings() {
        let rings = assemble_rings(vec![vec![1, 2, 3], vec![5, 4, 3], vec![5, 1], vec![7, 8]]);
        assert_eq!(rings, vec![vec![1, 2, 3, 4, 5, 1], vec![7, 8]]);
        assert!(is_closed_ring(&rings[0]));
        assert!(!is_closed_ring(&rings[1]));
    }

    #[test]
    fn test_area_icons() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let cafe = square(&mut data, 1, (0.0, 0.0), 0.0001);
        let grass = square(&mut data, 5, (0.0005, 0.0005), 0.0001);
        way(&mut data, 10, &cafe, &[("amenity", "cafe"), ("building", "yes"), ("name", "Corner")]);
        way(&mut data, 11, &grass, &[("landuse", "grass")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.points.len(), 1);
        assert_eq!(scene.points[0].element, ElementRef::Way(10));
        assert_eq!(scene.points[0].labels[0].text, "Corner");
        let center = fixture.projector.to_plane(&MapCoords::new(0.0, 0.0));
        assert!((scene.points[0].position - center).length() < 0.5);
    }

    #[test]
    fn test_label_modes() {
        let mut fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[("amenity", "cafe"), ("name", "Blue"), ("addr:housenumber", "12")]);

        assert_eq!(fixture.build(&data).points[0].labels.len(), 1);
        fixture.configuration.label_mode = LabelMode::All;
        assert_eq!(fixture.build(&data).points[0].labels.len(), 2);
        fixture.configuration.label_mode = LabelMode::No;
        assert!(fixture.build(&data).points[0].labels.is_empty());
    }

    #[test]
    fn test_address_labels() {
        let mut fixture = Fixture::new();
        fixture.configuration.label_mode = LabelMode::Address;
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[
            ("amenity", "cafe"),
            ("name", "Blue"),
            ("addr:street", "High Street"),
            ("addr:housenumber", "12"),
            ("addr:city", "Leeds"),
        ]);
        node(&mut data, 2, 0.0005, 0.0, &[("amenity", "cafe")]);
        let scene = fixture.build(&data);

        let texts: Vec<&str> = scene.points[0].labels.iter().map(|label| label.text.as_str()).collect();
        assert_eq!(texts, vec!["Blue", "12, Leeds, High Street"]);
        assert_eq!(scene.points[0].labels[1].size, LABEL_SIZE);
        assert!(scene.points[1].labels.is_empty());
    }

    #[test]
    fn test_level_filter() {
        let mut fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[("shop", "bakery"), ("level", "0")]);
        node(&mut data, 2, 0.0002, 0.0, &[("shop", "bakery"), ("level", "-1")]);
        node(&mut data, 3, 0.0004, 0.0, &[("amenity", "parking"), ("parking", "underground")]);
        node(&mut data, 4, 0.0, 0.0005, &[]);
        node(&mut data, 5, 0.0, -0.0005, &[]);
        way(&mut data, 10, &[4, 5], &[("highway", "residential"), ("layer", "-1")]);

        let elements = |fixture: &Fixture| -> Vec<ElementRef> {
            let scene = fixture.build(&data);
            scene.points
                .iter()
                .map(|point| point.element)
                .chain(scene.roads.iter().map(|road| ElementRef::Way(road.id)))
                .collect()
        };
        assert_eq!(elements(&fixture), vec![ElementRef::Node(1)]);

        fixture.configuration.level = "underground".to_string();
        assert_eq!(elements(&fixture), vec![ElementRef::Node(2), ElementRef::Node(3), ElementRef::Way(10)]);

        fixture.configuration.level = "-1".to_string();
        assert_eq!(elements(&fixture), vec![ElementRef::Node(2)]);

        fixture.configuration.ignore_level_matching = true;
        assert_eq!(elements(&fixture).len(), 4);

        fixture.configuration.ignore_level_matching = false;
        fixture.configuration.level = "basement".to_string();
        let constructor = Constructor::new(&fixture.projector, &fixture.scheme, &fixture.shapes, &fixture.configuration);
        assert!(constructor.is_err());
    }

    #[test]
    fn test_building_parts_follow_mode() {
        let mut fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let ring = square(&mut data, 1, (0.0, 0.0), 0.0001);
        way(&mut data, 10, &ring, &[("building", "yes"), ("height", "10")]);
        way(&mut data, 11, &ring, &[("building:part", "yes"), ("height", "20"), ("min_height", "10")]);

        fixture.configuration.building_mode = BuildingMode::Isometric;
        let scene = fixture.build(&data);
        assert_eq!(scene.buildings.len(), 2);
        assert_eq!(scene.heights, vec![10.0, 20.0]);

        fixture.configuration.building_mode = BuildingMode::IsometricNoParts;
        let scene = fixture.build(&data);
        assert_eq!(scene.buildings.len(), 1);
        assert_eq!(scene.buildings[0].element, ElementRef::Way(10));
        assert_eq!(scene.heights, vec![10.0]);
    }

    #[test]
    fn test_building_colors() {
        let mut fixture = Fixture::new();
        let mut data = OsmMapData::default();
        let first = square(&mut data, 1, (0.0, 0.0), 0.0001);
        let second = square(&mut data, 5, (0.0005, 0.0005), 0.0001);
        way(&mut data, 10, &first, &[("building", "yes"), ("building:colour", "#aa0000"), ("roof:colour", "brown")]);
        way(&mut data, 11, &second, &[("building", "yes"), ("building:colour", "sort of beige")]);

        let scene = fixture.build(&data);
        assert_eq!(scene.buildings[0].wall_color, None);
        assert!(scene.diagnostics.is_empty());

        fixture.configuration.use_building_colors = true;
        let scene = fixture.build(&data);
        assert_eq!(scene.buildings[0].wall_color, Some(Color::rgb(0xaa, 0, 0)));
        assert_eq!(scene.buildings[0].roof_color, Some(Color::rgb(0xa5, 0x2a, 0x2a)));
        assert_eq!(scene.buildings[1].wall_color, None);
        assert_eq!(scene.diagnostics.len(), 1);
        assert_eq!(scene.diagnostics[0].element, ElementRef::Way(11));
    }

    #[test]
    fn test_direction_and_crater_nodes() {
        let fixture = Fixture::new();
        let mut data = OsmMapData::default();
        node(&mut data, 1, 0.0, 0.0, &[("man_made", "surveillance"), ("camera:direction", "90")]);
        node(&mut data, 2, 0.0002, 0.0, &[("natural", "crater"), ("diameter", "40")]);
        node(&mut data, 3, 0.0004, 0.0, &[("natural", "crater"), ("diameter", "huge")]);
        let scene = fixture.build(&data);

        assert_eq!(scene.direction_sectors.len(), 1);
        assert_eq!(scene.craters.len(), 1);
        assert_eq!(scene.diagnostics.len(), 1);
        assert_eq!(scene.diagnostics[0].element, ElementRef::Node(3));
    }
}
