use std::collections::HashMap;

use self::boundary::BoundaryBox;
use self::osm::{MapCoords, Node, OsmId, Relation, Way};

pub mod boundary;
pub mod osm;

/// Map data as defined in the .osm file. Elements are kept without any processing.

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone)]
pub struct OsmMapData {
    pub nodes: HashMap<OsmId, Node>,
    pub ways: HashMap<OsmId, Way>,
    pub relations: HashMap<OsmId, Relation>,
    /// Extent declared by the `<bounds>` element, if any.
    pub boundary: Option<BoundaryBox>,
}

impl OsmMapData {
    pub fn add_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn add_way(&mut self, way: Way) {
        self.ways.insert(way.id, way);
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.insert(relation.id, relation);
    }

    /// Element maps are unordered; rendering walks them by id.
    pub fn sorted_node_ids(&self) -> Vec<OsmId> {
        let mut ids: Vec<OsmId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn sorted_way_ids(&self) -> Vec<OsmId> {
        let mut ids: Vec<OsmId> = self.ways.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn sorted_relation_ids(&self) -> Vec<OsmId> {
        let mut ids: Vec<OsmId> = self.relations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Extent of all nodes.
    pub fn extents(&self) -> Option<BoundaryBox> {
        let coords: Vec<MapCoords> = self.nodes.values().map(MapCoords::from).collect();
        BoundaryBox::from_extents(&coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::Tags;

    fn node(id: OsmId, lat: f64, lon: f64) -> Node {
        Node { id, lat, lon, tags: Tags::new() }
    }

    #[test]
    fn test_ids_are_sorted() {
        let mut data = OsmMapData::default();
        for id in [30, 10, 20] {
            data.add_node(node(id, 0.0, 0.0));
        }
        assert_eq!(data.sorted_node_ids(), vec![10, 20, 30]);
    }

    #[test]
    fn test_extents() {
        let mut data = OsmMapData::default();
        assert!(data.extents().is_none());
        data.add_node(node(1, 51.5, -0.1));
        data.add_node(node(2, 51.6, -0.2));
        let extents = data.extents().unwrap();
        assert_eq!((extents.left, extents.bottom, extents.right, extents.top), (-0.2, 51.5, -0.1, 51.6));
    }
}
