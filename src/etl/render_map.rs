use std::{fs::{self, File}, io::{Read, Write}, path::{Path, PathBuf}};

use log::{info, warn};

use crate::{
    config::UserConfig,
    data::{boundary::BoundaryBox, OsmMapData},
    errors::{Error, ErrorKind, Result},
    map::{
        compositor::MapDrawer,
        constructor::Constructor,
        projection::{Projector, EQUATOR_LENGTH},
        scheme::Scheme,
        shapes::ShapeLibrary,
    },
};

use super::{parse_osm, Etl};

pub const ETL_NAME: &str = "render_map";
pub const OUTPUT_FILE_NAME: &str = "map.svg";
/// Margin added around node extents so that edge icons stay on the canvas.
const EXTENTS_MARGIN: f64 = 0.05;

pub struct RenderMapEtl<'a> {
    config: &'a UserConfig,
}

impl RenderMapEtl<'_> {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new(config: &UserConfig) -> RenderMapEtl {
        RenderMapEtl {
            config
        }
    }

    /// The configured region, else the `<bounds>` of the input, else the
    /// slightly enlarged extent of all nodes.
    fn boundary(&self, data: &OsmMapData) -> Result<BoundaryBox> {
        if let Some(boundary) = self.config.requested_boundary()? {
            return Ok(boundary);
        }
        data.boundary
            .or_else(|| data.extents().map(|extents| extents.enlarge(EXTENTS_MARGIN)))
            .ok_or_else(|| Error::degenerate_region("No boundary box configured and no nodes to derive one from"))
    }

    fn load_scheme(&self) -> Result<Scheme> {
        match &self.config.scheme_path {
            Some(path) => Scheme::from_file(path),
            None => Scheme::builtin(),
        }
    }

    fn load_shapes(&self) -> Result<ShapeLibrary> {
        match &self.config.shapes_path {
            Some(path) => ShapeLibrary::from_file(path),
            None => ShapeLibrary::builtin(),
        }
    }
}

impl Etl for RenderMapEtl<'_> {
    type Input = OsmMapData;
    type Output = Vec<u8>;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).exists())
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        fs::remove_file(Self::output_path(dir))?;
        Ok(())
    }

    fn extract(&mut self, dir: &Path) -> Result<Self::Input> {
        let input_file_path = dir.join(parse_osm::OUTPUT_FILE_NAME);
        let mut input_file = File::open(input_file_path)?;

        let mut buf_vec: Vec<u8> = Vec::new();
        input_file.read_to_end(&mut buf_vec)?;
        let mut aligned = rkyv::AlignedVec::new();
        aligned.extend_from_slice(&buf_vec);

        let input: OsmMapData = unsafe {
            rkyv::from_bytes_unchecked(&aligned)
                .map_err(|err| Error::from(format!("Could not deserialize OSM cache: {:?}", err)))?
        };

        Ok(input)
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let boundary = self.boundary(&input)?;
        let configuration = &self.config.map;
        let projector = Projector::new(boundary, configuration.zoom_level, EQUATOR_LENGTH)?;
        let size = projector.size();
        info!(boundary = boundary.format().as_str(), width = size.x(), height = size.y(); "Projected region");

        let scheme = self.load_scheme()?;
        let shapes = self.load_shapes()?;
        info!(shapes = shapes.len(); "Loaded style");

        let scene = Constructor::new(&projector, &scheme, &shapes, configuration)?.build(&input);
        if !scene.diagnostics.is_empty() {
            warn!(
                count = scene.diagnostics.len(),
                malformed = scene.diagnostics_of(ErrorKind::MalformedElement).count();
                "Elements drawn with recovered errors"
            );
        }

        MapDrawer::new(&projector, &scheme, configuration).draw(&scene)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let output_path = Self::output_path(dir);
        let mut output_file = File::create(&output_path)?;
        output_file.write_all(&output)?;
        info!(path = output_path.display().to_string().as_str(), bytes = output.len(); "Map written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MapConfiguration,
        data::osm::{tags_from, Node},
    };

    fn config(boundary_box: Option<&str>) -> UserConfig {
        UserConfig {
            data_path: PathBuf::from("town.osm"),
            dest_path: PathBuf::from("output"),
            boundary_box: boundary_box.map(str::to_string),
            center: None,
            scheme_path: None,
            shapes_path: None,
            map: MapConfiguration::default(),
        }
    }

    fn data() -> OsmMapData {
        let mut data = OsmMapData::default();
        for (id, lat, lon) in [(1, 10.0, 20.0), (2, 10.001, 20.002)] {
            data.add_node(Node { id, lat, lon, tags: tags_from([("amenity", "cafe")]) });
        }
        data
    }

    #[test]
    fn test_boundary_precedence() {
        let mut data = data();
        let extents = data.extents().unwrap().enlarge(EXTENTS_MARGIN);

        let config = config(None);
        assert_eq!(RenderMapEtl::new(&config).boundary(&data).unwrap(), extents);

        let bounds = BoundaryBox::new(19.9, 9.9, 20.1, 10.1).unwrap();
        data.boundary = Some(bounds);
        assert_eq!(RenderMapEtl::new(&config).boundary(&data).unwrap(), bounds);

        let config = self::config(Some("19.99,9.99,20.01,10.01"));
        let explicit = RenderMapEtl::new(&config).boundary(&data).unwrap();
        assert_eq!(explicit.left, 19.99);
    }

    #[test]
    fn test_empty_input_has_no_boundary() {
        let config = config(None);
        let err = RenderMapEtl::new(&config).boundary(&OsmMapData::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DegenerateRegion);
    }

    #[test]
    fn test_transform_produces_svg() {
        let config = config(None);
        let output = RenderMapEtl::new(&config).transform(data()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<svg"));
        assert!(text.trim_end().ends_with("</svg>"));
    }
}
