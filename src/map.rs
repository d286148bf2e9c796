//! Turning OSM data into a styled vector scene: projection, styling, scene
//! construction and layered drawing.

pub mod buildings;
pub mod color;
pub mod compositor;
pub mod constructor;
pub mod features;
pub mod icon;
pub mod level;
pub mod occupancy;
pub mod projection;
pub mod roads;
pub mod scene;
pub mod scheme;
pub mod shapes;
pub mod svg;
pub mod units;
