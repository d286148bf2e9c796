use std::{fs::File, io::BufReader, path::{Path, PathBuf}};

use serde::Deserialize;

use crate::{
    data::{boundary::BoundaryBox, osm::MapCoords},
    errors::{Error, Result},
    map::color::Color,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/map.json";

/// Background used by every drawing mode but `normal` and `black`.
const WIREFRAME_BACKGROUND: Color = Color::rgb(0x11, 0x11, 0x11);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildingMode {
    No,
    #[default]
    Flat,
    Isometric,
    /// Isometric, with `building:part` outlines left out.
    IsometricNoParts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    No,
    #[default]
    Main,
    All,
    /// Name and the full postal address.
    Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingMode {
    #[default]
    Normal,
    Author,
    Time,
    White,
    Black,
}

impl DrawingMode {
    /// Special modes draw no labels.
    pub fn is_wireframe(&self) -> bool {
        *self != DrawingMode::Normal
    }

    pub fn background_color(&self) -> Option<Color> {
        match self {
            DrawingMode::Normal | DrawingMode::Black => None,
            _ => Some(WIREFRAME_BACKGROUND),
        }
    }
}

fn default_zoom_level() -> f64 {
    18.0
}

fn default_overlap() -> u32 {
    12
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "overground".to_string()
}

fn default_credit() -> Option<String> {
    Some("© OpenStreetMap contributors".to_string())
}

/// How the scene is drawn.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfiguration {
    #[serde(default)]
    pub drawing_mode: DrawingMode,
    #[serde(default)]
    pub building_mode: BuildingMode,
    #[serde(default)]
    pub label_mode: LabelMode,
    #[serde(default = "default_zoom_level")]
    pub zoom_level: f64,
    /// Half side of the square an icon claims. 0 turns overlap checks off.
    #[serde(default = "default_overlap")]
    pub overlap: u32,
    /// `overground`, `underground`, `all` or a floor number.
    #[serde(default = "default_level")]
    pub level: String,
    /// Draws every feature whatever its level.
    #[serde(default)]
    pub ignore_level_matching: bool,
    #[serde(default = "default_true")]
    pub draw_roofs: bool,
    /// Paints walls and roofs with `building:colour` and `roof:colour`.
    #[serde(default)]
    pub use_building_colors: bool,
    /// Data attribution; `null` leaves it out.
    #[serde(default = "default_credit")]
    pub credit: Option<String>,
    #[serde(default)]
    pub background_color: Option<Color>,
}

impl Default for MapConfiguration {
    fn default() -> Self {
        MapConfiguration {
            drawing_mode: DrawingMode::default(),
            building_mode: BuildingMode::default(),
            label_mode: LabelMode::default(),
            zoom_level: default_zoom_level(),
            overlap: default_overlap(),
            level: default_level(),
            ignore_level_matching: false,
            draw_roofs: true,
            use_building_colors: false,
            credit: default_credit(),
            background_color: None,
        }
    }
}

impl MapConfiguration {
    /// Background forced by the configuration: the explicit color first, then
    /// the drawing mode. `None` leaves the scheme's choice.
    pub fn background_override(&self) -> Option<Color> {
        self.background_color.or_else(|| self.drawing_mode.background_color())
    }

    pub fn draws_labels(&self) -> bool {
        self.label_mode != LabelMode::No && !self.drawing_mode.is_wireframe()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CenterConfig {
    pub lat: f64,
    pub lon: f64,
    /// Meters.
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserConfig {
    /// `.osm` or `.osm.xz` file.
    pub data_path: PathBuf,
    pub dest_path: PathBuf,
    /// `left,bottom,right,top` in degrees.
    #[serde(default)]
    pub boundary_box: Option<String>,
    #[serde(default)]
    pub center: Option<CenterConfig>,
    #[serde(default)]
    pub scheme_path: Option<PathBuf>,
    #[serde(default)]
    pub shapes_path: Option<PathBuf>,
    #[serde(default)]
    pub map: MapConfiguration,
}

impl UserConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|err| Error::from(format!("Could not open config file {}: {}", path.display(), err)))?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Boundary requested by the user, if any. Explicit text wins over a centre.
    pub fn requested_boundary(&self) -> Result<Option<BoundaryBox>> {
        if let Some(text) = &self.boundary_box {
            return BoundaryBox::from_text(text).map(Some);
        }
        if let Some(center) = &self.center {
            return BoundaryBox::from_center(MapCoords::new(center.lat, center.lon), center.radius).map(Some);
        }
        Ok(None)
    }
}
