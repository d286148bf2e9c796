use std::collections::BTreeMap;

use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    data::osm::Tags,
    errors::{Error, Result},
    map::{
        color::Color,
        scene::{ElementRef, Figure},
        svg::{PathCommands, SvgDocument},
        units::LengthParser,
    },
};

/// Vertical exaggeration of extruded walls.
pub const BUILDING_SCALE: f32 = 0.33;
/// Meters per building level.
pub const LEVEL_HEIGHT: f64 = 2.5;
/// Segment end points are compared at this many subdivisions of a pixel.
const KEY_PRECISION: f32 = 100.0;

fn has_yes_like(tags: &Tags, key: &str) -> bool {
    tags.get(key).is_some_and(|value| value != "no")
}

pub fn is_building(tags: &Tags) -> bool {
    has_yes_like(tags, "building")
}

pub fn is_building_part(tags: &Tags) -> bool {
    has_yes_like(tags, "building:part")
}

fn parse_levels(value: &str) -> Result<f64> {
    let levels: f64 = value.trim().replace(',', ".").parse()?;
    if levels < 0.0 {
        return Err(Error::malformed(format!("Negative level count `{}`", value)));
    }
    Ok(levels * LEVEL_HEIGHT)
}

fn tag_height(
    tags: &Tags,
    length_key: &str,
    levels_key: &str,
    lengths: &LengthParser,
    errors: &mut Vec<Error>,
) -> f64 {
    let parsed = if let Some(value) = tags.get(length_key) {
        lengths.parse(value)
    } else if let Some(value) = tags.get(levels_key) {
        parse_levels(value)
    } else {
        return 0.0;
    };
    match parsed {
        Ok(height) if height >= 0.0 => height,
        Ok(height) => {
            errors.push(Error::malformed(format!("Negative {} {}", length_key, height)));
            0.0
        }
        Err(err) => {
            errors.push(err);
            0.0
        }
    }
}

/// `(height, min_height)` in meters. Unusable values count as 0 and are
/// returned as errors alongside.
pub fn parse_heights(tags: &Tags, lengths: &LengthParser) -> (f64, f64, Vec<Error>) {
    let mut errors = Vec::new();
    let height = tag_height(tags, "height", "building:levels", lengths, &mut errors);
    let min_height = tag_height(tags, "min_height", "building:min_level", lengths, &mut errors);
    if min_height > height {
        errors.push(Error::malformed(format!(
            "Minimum height {} is above height {}",
            min_height, height
        )));
        return (height, 0.0, errors);
    }
    (height, min_height, errors)
}

type PointKey = (i64, i64);

fn point_key(point: Vector2F) -> PointKey {
    (
        (point.x() * KEY_PRECISION).round() as i64,
        (point.y() * KEY_PRECISION).round() as i64,
    )
}

/// Direction-independent identity of a wall segment.
pub type SegmentKey = (PointKey, PointKey);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vector2F,
    pub end: Vector2F,
}

impl Segment {
    pub fn key(&self) -> SegmentKey {
        let (a, b) = (point_key(self.start), point_key(self.end));
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn mid_y(&self) -> f32 {
        (self.start.y() + self.end.y()) / 2.0
    }

    /// 0 for a wall running along the x axis, 1 for one running along y.
    pub fn facing(&self) -> f32 {
        let delta = self.end - self.start;
        let length = delta.length();
        if length == 0.0 {
            return 0.0;
        }
        (delta.y() / length).abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingColors {
    pub fill: Color,
    pub border: Color,
    pub wall: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub element: ElementRef,
    pub figure: Figure,
    /// Meters.
    pub height: f64,
    pub min_height: f64,
    /// From `building:colour`, replacing the scheme's wall color.
    pub wall_color: Option<Color>,
    /// From `roof:colour`, replacing the scheme's fill.
    pub roof_color: Option<Color>,
}

impl Building {
    pub fn new(element: ElementRef, figure: Figure, height: f64, min_height: f64) -> Self {
        Building { element, figure, height, min_height, wall_color: None, roof_color: None }
    }

    /// Scheme colors with this building's own colors applied.
    pub fn colors(&self, scheme_colors: &BuildingColors) -> BuildingColors {
        BuildingColors {
            fill: self.roof_color.unwrap_or(scheme_colors.fill),
            border: scheme_colors.border,
            wall: self.wall_color.unwrap_or(scheme_colors.wall),
        }
    }

    /// Wall segments of every ring.
    pub fn segments(&self) -> Vec<Segment> {
        self.figure.outers
            .iter()
            .chain(&self.figure.inners)
            .flat_map(|ring| ring.windows(2).map(|pair| Segment { start: pair[0], end: pair[1] }))
            .filter(|segment| segment.start != segment.end)
            .collect()
    }

    pub fn is_extruded(&self) -> bool {
        self.height > 0.0
    }

    pub fn draw_flat(&self, svg: &mut SvgDocument, colors: &BuildingColors) -> Result<()> {
        self.draw_outline(svg, Vector2F::zero(), colors)
    }

    fn draw_outline(&self, svg: &mut SvgDocument, offset: Vector2F, colors: &BuildingColors) -> Result<()> {
        let fill = colors.fill.hex();
        let border = colors.border.hex();
        svg.path(
            &self.figure.path(offset),
            &[
                ("fill", fill.as_str()),
                ("stroke", border.as_str()),
                ("stroke-width", "1"),
                ("stroke-linejoin", "round"),
            ],
        )
    }

    /// Dark quads along every wall; drawn inside a translucent group.
    pub fn draw_shade(&self, svg: &mut SvgDocument) -> Result<()> {
        let shift = vec2f(3.0, 1.0);
        for segment in self.segments() {
            let quad = PathCommands::new().polyline(
                &[segment.start, segment.end, segment.end + shift, segment.start + shift],
                true,
            );
            svg.path(&quad, &[("fill", "#000000"), ("stroke", "#000000"), ("stroke-width", "1")])?;
        }
        Ok(())
    }

    /// Roof outline lifted to the building's height.
    pub fn draw_roof(&self, svg: &mut SvgDocument, scale: f32, colors: &BuildingColors) -> Result<()> {
        let lift = vec2f(0.0, -(self.height as f32) * scale * BUILDING_SCALE);
        self.draw_outline(svg, lift, colors)
    }
}

/// One wall quad between two vertical offsets. Walls facing different ways get
/// different shades of the wall color.
pub fn draw_wall(
    svg: &mut SvgDocument,
    segment: &Segment,
    lower: Vector2F,
    upper: Vector2F,
    colors: &BuildingColors,
) -> Result<()> {
    let color = colors.wall.lighten(0.25 * segment.facing() - 0.1).hex();
    let quad = PathCommands::new().polyline(
        &[
            segment.start + lower,
            segment.end + lower,
            segment.end + upper,
            segment.start + upper,
        ],
        true,
    );
    svg.path(
        &quad,
        &[
            ("fill", color.as_str()),
            ("stroke", color.as_str()),
            ("stroke-width", "1"),
            ("stroke-linejoin", "round"),
        ],
    )
}

/// A wall segment with every extruded building that has it, tallest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub segment: Segment,
    pub owners: Vec<usize>,
}

impl Wall {
    /// Tallest owner with wall in the band that ends at `slice`.
    pub fn owner_in_slice<'b>(&self, buildings: &'b [Building], slice: f64) -> Option<&'b Building> {
        self.owners
            .iter()
            .map(|index| &buildings[*index])
            .find(|building| spans_slice(building, slice))
    }
}

/// Walls of all extruded buildings. A segment shared by several buildings, as
/// with stacked `building:part`s or neighbours, is kept once. Sorted back to
/// front by mid y, then by identity.
pub fn collect_walls(buildings: &[Building]) -> Vec<Wall> {
    let mut walls: BTreeMap<SegmentKey, Wall> = BTreeMap::new();
    for (index, building) in buildings.iter().enumerate() {
        if !building.is_extruded() {
            continue;
        }
        for segment in building.segments() {
            let wall = walls
                .entry(segment.key())
                .or_insert_with(|| Wall { segment, owners: Vec::new() });
            if !wall.owners.contains(&index) {
                wall.owners.push(index);
            }
        }
    }

    let mut walls: Vec<(SegmentKey, Wall)> = walls.into_iter().collect();
    walls.sort_by(|(a_key, a), (b_key, b)| {
        a.segment.mid_y().total_cmp(&b.segment.mid_y()).then(a_key.cmp(b_key))
    });
    walls
        .into_iter()
        .map(|(_, mut wall)| {
            wall.owners.sort_by(|a, b| {
                buildings[*b].height.total_cmp(&buildings[*a].height).then(a.cmp(b))
            });
            wall
        })
        .collect()
}

/// Whether `building` has wall in the band that ends at `slice`.
pub fn spans_slice(building: &Building, slice: f64) -> bool {
    building.height >= slice && building.min_height < slice
}
