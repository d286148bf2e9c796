use std::f64::consts::PI;

use crate::{data::osm::MapCoords, errors::{Error, Result}};

/// Mean radius of the Earth in meters.
const EARTH_RADIUS: f64 = 6_371_000.0;

/// Rectangular geographic extent: longitudes `left..right`, latitudes `bottom..top`.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct BoundaryBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundaryBox {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self> {
        let boundary = BoundaryBox { left, bottom, right, top };
        boundary.validate()?;
        Ok(boundary)
    }

    fn validate(&self) -> Result<()> {
        let values = [self.left, self.bottom, self.right, self.top];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(Error::degenerate_region("Boundary box has non-finite values"));
        }
        if self.left > self.right || self.bottom > self.top {
            return Err(Error::degenerate_region(format!(
                "Boundary box minimum exceeds maximum: {}",
                self.format()
            )));
        }
        if self.left < -180.0 || self.right > 180.0 || self.bottom < -90.0 || self.top > 90.0 {
            return Err(Error::degenerate_region(format!(
                "Boundary box is out of range: {}",
                self.format()
            )));
        }
        Ok(())
    }

    /// Parses `left,bottom,right,top`, e.g. `2.284,48.860,2.290,48.863`.
    pub fn from_text(text: &str) -> Result<Self> {
        let values = text
            .trim()
            .split(',')
            .map(|value| value.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|err| Error::degenerate_region(format!("Invalid boundary box `{}`: {}", text, err)))?;

        if values.len() != 4 {
            return Err(Error::degenerate_region(format!(
                "Boundary box needs 4 values, got {} in `{}`",
                values.len(),
                text
            )));
        }
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Square-ish region spanning `radius` meters around a point.
    pub fn from_center(center: MapCoords, radius: f64) -> Result<Self> {
        if radius <= 0.0 || !radius.is_finite() {
            return Err(Error::degenerate_region(format!("Invalid radius {}", radius)));
        }
        let delta_lat = (radius / EARTH_RADIUS).to_degrees();
        let delta_lon = delta_lat / (center.lat * PI / 180.0).cos().abs().max(1e-9);
        Self::new(
            (center.lon - delta_lon).max(-180.0),
            (center.lat - delta_lat).max(-90.0),
            (center.lon + delta_lon).min(180.0),
            (center.lat + delta_lat).min(90.0),
        )
    }

    /// Smallest box holding every coordinate.
    pub fn from_extents<'a>(coords: impl IntoIterator<Item = &'a MapCoords>) -> Option<Self> {
        let mut boundary: Option<BoundaryBox> = None;
        for coords in coords {
            boundary = Some(match boundary {
                None => BoundaryBox {
                    left: coords.lon,
                    bottom: coords.lat,
                    right: coords.lon,
                    top: coords.lat,
                },
                Some(boundary) => BoundaryBox {
                    left: boundary.left.min(coords.lon),
                    bottom: boundary.bottom.min(coords.lat),
                    right: boundary.right.max(coords.lon),
                    top: boundary.top.max(coords.lat),
                },
            });
        }
        boundary
    }

    /// Grows each side by `fraction` of the box's own width or height.
    pub fn enlarge(&self, fraction: f64) -> Self {
        let delta_lon = (self.right - self.left) * fraction;
        let delta_lat = (self.top - self.bottom) * fraction;
        BoundaryBox {
            left: (self.left - delta_lon).max(-180.0),
            bottom: (self.bottom - delta_lat).max(-90.0),
            right: (self.right + delta_lon).min(180.0),
            top: (self.top + delta_lat).min(90.0),
        }
    }

    pub fn center(&self) -> MapCoords {
        MapCoords::new((self.bottom + self.top) / 2.0, (self.left + self.right) / 2.0)
    }

    pub fn format(&self) -> String {
        format!("{:.3},{:.3},{:.3},{:.3}", self.left, self.bottom, self.right, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_from_text() {
        let boundary = BoundaryBox::from_text("2.284, 48.860,2.290,48.863").unwrap();
        assert_eq!(boundary.left, 2.284);
        assert_eq!(boundary.top, 48.863);
    }

    #[test]
    fn test_from_text_rejects_bad_input() {
        assert_eq!(BoundaryBox::from_text("1,2,3").unwrap_err().kind, ErrorKind::DegenerateRegion);
        assert_eq!(BoundaryBox::from_text("a,b,c,d").unwrap_err().kind, ErrorKind::DegenerateRegion);
        assert_eq!(BoundaryBox::from_text("3,2,1,4").unwrap_err().kind, ErrorKind::DegenerateRegion);
    }

    #[test]
    fn test_from_center_contains_center() {
        let center = MapCoords::new(51.5, -0.12);
        let boundary = BoundaryBox::from_center(center, 500.0).unwrap();
        assert!((boundary.center().lat - center.lat).abs() < 1e-9);
        assert!((boundary.center().lon - center.lon).abs() < 1e-9);
        // Longitude span is wider than latitude span away from the equator.
        assert!(boundary.right - boundary.left > boundary.top - boundary.bottom);
    }

    #[test]
    fn test_from_extents() {
        let coords = [MapCoords::new(1.0, 2.0), MapCoords::new(-1.0, 5.0)];
        let boundary = BoundaryBox::from_extents(&coords).unwrap();
        assert_eq!(boundary, BoundaryBox { left: 2.0, bottom: -1.0, right: 5.0, top: 1.0 });
        let empty: [MapCoords; 0] = [];
        assert!(BoundaryBox::from_extents(&empty).is_none());
    }
}
