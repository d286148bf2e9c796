use std::f64::consts::PI;

use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    data::{boundary::BoundaryBox, osm::MapCoords},
    errors::{Error, Result},
};

/// Length of the equator in meters, used unless the input says otherwise.
pub const EQUATOR_LENGTH: f64 = 40_075_017.0;

/// Pixels of a 256 px tile per 360 degrees of longitude at zoom level 0.
const TILE_SIZE: f64 = 256.0;

/// Pseudo-Mercator latitude, in degrees, so it shares the scale of longitude.
fn pseudo_mercator_lat(lat: f64) -> f64 {
    (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()
}

fn inverse_pseudo_mercator_lat(y: f64) -> f64 {
    (360.0 / PI) * ((y * PI / 180.0).exp().atan() - PI / 4.0)
}

/// Maps geographic coordinates onto the drawing plane of one boundary region.
///
/// Longitude is linear on the x axis, latitude goes through the Mercator
/// transform on the y axis, and y grows downwards so north is up.
#[derive(Debug, Clone)]
pub struct Projector {
    boundary: BoundaryBox,
    /// Pixels per projected degree.
    ratio: f64,
    width: f64,
    height: f64,
    /// Pixels per meter on the equator.
    pixels_per_meter: f64,
}

impl Projector {
    /// Fails with `DegenerateRegion` when the region collapses to a canvas without area.
    pub fn new(boundary: BoundaryBox, zoom_level: f64, equator_length: f64) -> Result<Self> {
        if !zoom_level.is_finite() || !equator_length.is_finite() || equator_length <= 0.0 {
            return Err(Error::degenerate_region(format!(
                "Invalid zoom level {} or equator length {}",
                zoom_level, equator_length
            )));
        }
        if boundary.bottom <= -90.0 || boundary.top >= 90.0 {
            return Err(Error::degenerate_region("Mercator projection cannot reach the poles"));
        }

        let ratio = 2f64.powf(zoom_level) * TILE_SIZE / 360.0;
        let width = (ratio * (boundary.right - boundary.left)).trunc();
        let height = (ratio
            * (pseudo_mercator_lat(boundary.top) - pseudo_mercator_lat(boundary.bottom)))
            .trunc();

        if !(width >= 1.0 && height >= 1.0) {
            return Err(Error::degenerate_region(format!(
                "Boundary box {} gives a {}x{} canvas at zoom {}",
                boundary.format(),
                width,
                height,
                zoom_level
            )));
        }

        Ok(Projector {
            boundary,
            ratio,
            width,
            height,
            pixels_per_meter: 2f64.powf(zoom_level) * TILE_SIZE / equator_length,
        })
    }

    /// Canvas size in whole pixels.
    pub fn size(&self) -> Vector2F {
        vec2f(self.width as f32, self.height as f32)
    }

    pub fn to_plane(&self, coords: &MapCoords) -> Vector2F {
        let x = self.ratio * (coords.lon - self.boundary.left);
        let y = self.ratio * (pseudo_mercator_lat(coords.lat) - pseudo_mercator_lat(self.boundary.bottom));
        vec2f(x as f32, (self.height - y) as f32)
    }

    pub fn from_plane(&self, point: Vector2F) -> MapCoords {
        let lon = point.x() as f64 / self.ratio + self.boundary.left;
        let y = (self.height - point.y() as f64) / self.ratio + pseudo_mercator_lat(self.boundary.bottom);
        MapCoords::new(inverse_pseudo_mercator_lat(y), lon)
    }

    /// Pixels per meter at the given latitude.
    pub fn local_scale(&self, lat: f64) -> f32 {
        (self.pixels_per_meter / (lat * PI / 180.0).cos().abs()) as f32
    }

    /// Pixels per meter in the middle of the region.
    pub fn scale(&self) -> f32 {
        self.local_scale(self.boundary.center().lat)
    }
}
