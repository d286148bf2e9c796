use std::f32::consts::PI;

use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    data::osm::{has_kv_pair, Tags},
    errors::{Error, Result},
    map::{
        color::Color,
        svg::{PathCommands, SvgDocument},
        units::LengthParser,
    },
};

/// Meters.
const DEFAULT_CROWN_RADIUS: f64 = 2.0;
const TRUNK_COLOR: Color = Color::rgb(0xb8, 0x9a, 0x74);

/// Parses an optional length tag, reporting values that do not parse.
fn optional_length(tags: &Tags, key: &str, lengths: &LengthParser, errors: &mut Vec<Error>) -> Option<f64> {
    let value = tags.get(key)?;
    match lengths.parse(value) {
        Ok(length) if length > 0.0 => Some(length),
        Ok(_) => {
            errors.push(Error::malformed(format!("`{}` must be positive, got `{}`", key, value)));
            None
        }
        Err(err) => {
            errors.push(err);
            None
        }
    }
}

/// Crown and trunk of a single tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub position: Vector2F,
    /// Pixels per meter at the tree.
    pub scale: f32,
    /// Meters.
    pub crown_radius: f64,
    pub trunk_radius: Option<f64>,
}

impl Tree {
    pub fn from_tags(position: Vector2F, scale: f32, tags: &Tags, lengths: &LengthParser) -> (Self, Vec<Error>) {
        let mut errors = Vec::new();
        let crown_radius = optional_length(tags, "diameter_crown", lengths, &mut errors)
            .map_or(DEFAULT_CROWN_RADIUS, |diameter| diameter / 2.0);
        let trunk_radius = optional_length(tags, "circumference", lengths, &mut errors)
            .map(|circumference| circumference / 2.0 / std::f64::consts::PI);
        (Tree { position, scale, crown_radius, trunk_radius }, errors)
    }

    pub fn draw(&self, svg: &mut SvgDocument, crown_color: Color) -> Result<()> {
        let crown_color = crown_color.hex();
        svg.circle(
            self.position,
            self.crown_radius as f32 * self.scale,
            &[("fill", crown_color.as_str()), ("opacity", "0.3")],
        )?;
        if let Some(trunk_radius) = self.trunk_radius {
            let trunk_color = TRUNK_COLOR.hex();
            svg.circle(self.position, trunk_radius as f32 * self.scale, &[("fill", trunk_color.as_str())])?;
        }
        Ok(())
    }
}

/// Impact crater drawn as a disc darkening towards its rim.
#[derive(Debug, Clone, PartialEq)]
pub struct Crater {
    pub position: Vector2F,
    pub scale: f32,
    /// Meters.
    pub radius: f64,
}

impl Crater {
    /// Needs a `diameter`; `Ok(None)` without one.
    pub fn from_tags(position: Vector2F, scale: f32, tags: &Tags, lengths: &LengthParser) -> Result<Option<Self>> {
        let Some(diameter) = tags.get("diameter") else {
            return Ok(None);
        };
        let diameter = lengths.parse(diameter)?;
        if diameter <= 0.0 {
            return Err(Error::malformed(format!("Crater diameter {} is not positive", diameter)));
        }
        Ok(Some(Crater { position, scale, radius: diameter / 2.0 }))
    }

    pub fn draw(&self, svg: &mut SvgDocument, color: Color) -> Result<()> {
        let radius = self.radius as f32 * self.scale;
        let gradient = svg.radial_gradient(
            self.position + vec2f(0.0, radius / 7.0),
            radius,
            &[(0.0, color, 0.0), (0.7, color, 0.0), (1.0, color, 1.0)],
        )?;
        svg.circle(self.position, radius, &[("fill", gradient.as_str()), ("opacity", "0.2")])
    }
}

/// Compass points in clockwise order from north.
const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE",
    "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

/// Radians.
const SMALLEST_HALF_ANGLE: f32 = PI / 15.0;
const DEFAULT_HALF_ANGLE: f32 = PI / 30.0;

/// Unit vector for a bearing in degrees or a compass point. North points up.
pub fn parse_direction(text: &str) -> Option<Vector2F> {
    let text = text.trim();
    let degrees = match text.parse::<f32>() {
        Ok(degrees) if degrees.is_finite() => degrees,
        _ => {
            let upper = text.to_ascii_uppercase();
            let index = COMPASS_POINTS.iter().position(|point| *point == upper)?;
            index as f32 * 22.5
        }
    };
    let radians = degrees.to_radians() - PI / 2.0;
    Some(vec2f(radians.cos(), radians.sin()))
}

fn rotate(vector: Vector2F, angle: f32) -> Vector2F {
    let (sin, cos) = angle.sin_cos();
    vec2f(cos * vector.x() + sin * vector.y(), -sin * vector.x() + cos * vector.y())
}

/// Arc between two unit vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    pub start: Vector2F,
    pub end: Vector2F,
}

impl Sector {
    /// `70-210` or `N-NE` give a range; a single direction gets a width of
    /// `angle` degrees, or a narrow default.
    pub fn parse(text: &str, angle: Option<f32>) -> Option<Self> {
        let text = text.trim();
        if let Some((from, to)) = text.split_once('-').filter(|_| !text.starts_with('-')) {
            return Some(Sector { start: parse_direction(from)?, end: parse_direction(to)? });
        }
        let half_angle = angle.map_or(DEFAULT_HALF_ANGLE, |angle| SMALLEST_HALF_ANGLE.max(angle.to_radians() / 2.0));
        let vector = parse_direction(text)?;
        Some(Sector { start: rotate(vector, half_angle), end: rotate(vector, -half_angle) })
    }

    fn path(&self, center: Vector2F, radius: f32) -> PathCommands {
        PathCommands::new()
            .move_to(center)
            .line_to(center + self.end * radius)
            .arc_to(radius, false, false, center + self.start * radius)
            .close()
    }
}

/// View or camera direction fanning out from a point.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionSector {
    pub position: Vector2F,
    pub sectors: Vec<Sector>,
    pub radius: f32,
    pub color: Color,
    /// Fades in towards the rim instead of out.
    pub fade_in: bool,
}

/// Colors a direction sector can take.
pub struct DirectionColors {
    pub view: Color,
    pub camera: Color,
}

impl DirectionSector {
    /// `Ok(None)` for points without a usable direction.
    pub fn from_tags(position: Vector2F, tags: &Tags, colors: &DirectionColors) -> Result<Option<Self>> {
        let mut angle = None;
        let (direction, radius, color, fade_in) = if has_kv_pair(tags, "man_made", "surveillance") {
            for key in ["camera:angle", "angle"] {
                if let Some(value) = tags.get(key) {
                    let degrees: f32 = value.trim().parse()
                        .map_err(|_| Error::malformed(format!("Invalid {} `{}`", key, value)))?;
                    angle = Some(degrees);
                }
            }
            (tags.get("camera:direction"), 50.0, colors.camera, false)
        } else if has_kv_pair(tags, "traffic_sign", "stop") {
            (tags.get("direction"), 25.0, Color::rgb(0xff, 0x00, 0x00), false)
        } else {
            (tags.get("direction"), 50.0, colors.view, true)
        };
        let Some(direction) = direction.filter(|direction| !direction.trim().is_empty()) else {
            return Ok(None);
        };

        let sectors: Vec<Sector> = match angle {
            Some(angle) => Sector::parse(direction, Some(angle)).into_iter().collect(),
            None => direction.split(';').filter_map(|text| Sector::parse(text, None)).collect(),
        };
        if sectors.is_empty() {
            return Err(Error::malformed(format!("Invalid direction `{}`", direction)));
        }
        Ok(Some(DirectionSector {
            position: vec2f(position.x().trunc(), position.y().trunc()),
            sectors,
            radius,
            color,
            fade_in,
        }))
    }

    pub fn draw(&self, svg: &mut SvgDocument) -> Result<()> {
        let stops = if self.fade_in {
            [(0.0, self.color, 0.0), (1.0, self.color, 0.7)]
        } else {
            [(0.0, self.color, 0.4), (1.0, self.color, 0.0)]
        };
        for sector in &self.sectors {
            let gradient = svg.radial_gradient(self.position, self.radius, &stops)?;
            svg.path(&sector.path(self.position, self.radius), &[("fill", gradient.as_str())])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::osm::tags_from;

    fn close(a: Vector2F, b: Vector2F) -> bool {
        (a - b).length() < 1e-4
    }

    fn colors() -> DirectionColors {
        DirectionColors { view: Color::rgb(0xe0, 0xf0, 0xff), camera: Color::rgb(0x00, 0x00, 0xff) }
    }

    #[test]
    fn test_parse_direction() {
        assert!(close(parse_direction("0").unwrap(), vec2f(0.0, -1.0)));
        assert!(close(parse_direction("90").unwrap(), vec2f(1.0, 0.0)));
        assert!(close(parse_direction("S").unwrap(), vec2f(0.0, 1.0)));
        assert!(close(parse_direction("nw").unwrap(), parse_direction("315").unwrap()));
        assert!(parse_direction("upwards").is_none());
    }

    #[test]
    fn test_sector_range() {
        let sector = Sector::parse("N-E", None).unwrap();
        assert!(close(sector.start, vec2f(0.0, -1.0)));
        assert!(close(sector.end, vec2f(1.0, 0.0)));
        assert!(Sector::parse("N-up", None).is_none());
    }

    #[test]
    fn test_sector_width() {
        let narrow = Sector::parse("90", Some(1.0)).unwrap();
        let wide = Sector::parse("90", Some(120.0)).unwrap();
        let narrow_angle = narrow.start.x() * narrow.end.x() + narrow.start.y() * narrow.end.y();
        let wide_angle = wide.start.x() * wide.end.x() + wide.start.y() * wide.end.y();
        assert!(wide_angle < narrow_angle);
        assert!((wide_angle - (120f32.to_radians()).cos()).abs() < 1e-4);
    }

    #[test]
    fn test_direction_sets() {
        let tags = tags_from([("tourism", "viewpoint"), ("direction", "N;120;bogus")]);
        let sector = DirectionSector::from_tags(vec2f(10.7, 5.2), &tags, &colors()).unwrap().unwrap();
        assert_eq!(sector.sectors.len(), 2);
        assert_eq!(sector.position, vec2f(10.0, 5.0));
        assert!(sector.fade_in);
    }

    #[test]
    fn test_camera() {
        let tags = tags_from([("man_made", "surveillance"), ("camera:direction", "180"), ("camera:angle", "60")]);
        let sector = DirectionSector::from_tags(vec2f(0.0, 0.0), &tags, &colors()).unwrap().unwrap();
        assert_eq!(sector.sectors.len(), 1);
        assert_eq!(sector.color, colors().camera);
        assert!(!sector.fade_in);

        let bad = tags_from([("man_made", "surveillance"), ("camera:direction", "180"), ("camera:angle", "wide")]);
        assert!(DirectionSector::from_tags(vec2f(0.0, 0.0), &bad, &colors()).is_err());
    }

    #[test]
    fn test_no_direction() {
        let tags = tags_from([("man_made", "surveillance")]);
        assert!(DirectionSector::from_tags(vec2f(0.0, 0.0), &tags, &colors()).unwrap().is_none());
        let tags = tags_from([("direction", "sideways")]);
        assert!(DirectionSector::from_tags(vec2f(0.0, 0.0), &tags, &colors()).is_err());
    }

    #[test]
    fn test_tree_sizes() {
        let lengths = LengthParser::new().unwrap();
        let (tree, errors) = Tree::from_tags(vec2f(0.0, 0.0), 2.0, &tags_from([("natural", "tree")]), &lengths);
        assert_eq!(tree.crown_radius, DEFAULT_CROWN_RADIUS);
        assert!(tree.trunk_radius.is_none());
        assert!(errors.is_empty());

        let tags = tags_from([("diameter_crown", "8"), ("circumference", "3.1416"), ("height", "x")]);
        let (tree, errors) = Tree::from_tags(vec2f(0.0, 0.0), 2.0, &tags, &lengths);
        assert_eq!(tree.crown_radius, 4.0);
        assert!((tree.trunk_radius.unwrap() - 0.5).abs() < 1e-4);
        assert!(errors.is_empty());

        let (tree, errors) = Tree::from_tags(vec2f(0.0, 0.0), 2.0, &tags_from([("diameter_crown", "big")]), &lengths);
        assert_eq!(tree.crown_radius, DEFAULT_CROWN_RADIUS);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_crater() {
        let lengths = LengthParser::new().unwrap();
        let tags = tags_from([("natural", "crater"), ("diameter", "30")]);
        let crater = Crater::from_tags(vec2f(1.0, 1.0), 1.0, &tags, &lengths).unwrap().unwrap();
        assert_eq!(crater.radius, 15.0);
        assert!(Crater::from_tags(vec2f(1.0, 1.0), 1.0, &tags_from([("natural", "crater")]), &lengths).unwrap().is_none());
    }
}
