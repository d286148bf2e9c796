use std::collections::BTreeMap;

use log::info;
use pathfinder_geometry::vector::{vec2f, Vector2F};

use crate::{
    config::{BuildingMode, MapConfiguration},
    errors::Result,
    map::{
        buildings::{collect_walls, draw_wall, Building, BuildingColors, BUILDING_SCALE},
        color::Color,
        icon::ICON_SIZE,
        occupancy::OccupancyTracker,
        projection::Projector,
        roads::{resolve_junctions, Road},
        scene::{DrawableSet, Label, Point, StyledFigure},
        scheme::Scheme,
        svg::{fmt_num, PathCommands, SvgDocument},
    },
};

/// Way figures at or above this priority are drawn over roads and buildings.
pub const ROAD_PRIORITY: f64 = 40.0;

const PROJECT_NAME: &str = "vector_map";
const CREDIT_MARGIN: f32 = 15.0;
const CREDIT_FONT_SIZE: f32 = 10.0;
const CREDIT_SPACING: f32 = 2.0;
const CREDIT_COLOR: Color = Color::rgb(0x88, 0x88, 0x88);
/// Distance between consecutive label baselines.
const LABEL_SPACING: f32 = 11.0;

/// Draws a constructed scene in layer order. Holds no state between renders.
pub struct MapDrawer<'a> {
    projector: &'a Projector,
    scheme: &'a Scheme,
    configuration: &'a MapConfiguration,
}

impl<'a> MapDrawer<'a> {
    pub fn new(projector: &'a Projector, scheme: &'a Scheme, configuration: &'a MapConfiguration) -> Self {
        MapDrawer { projector, scheme, configuration }
    }

    pub fn draw(&self, scene: &DrawableSet) -> Result<Vec<u8>> {
        let size = self.projector.size();
        let mut svg = SvgDocument::new(size)?;
        let mut occupancy = OccupancyTracker::new(size, self.configuration.overlap);

        let background = self.configuration
            .background_override()
            .unwrap_or_else(|| self.scheme.color_or("background_color", Color::WHITE));
        svg.rect(Vector2F::zero(), size, background)?;

        let mut figures: Vec<&StyledFigure> = scene.figures.iter().collect();
        figures.sort_by(|a, b| a.style.priority.total_cmp(&b.style.priority));
        let (bottom, top): (Vec<&StyledFigure>, Vec<&StyledFigure>) = figures
            .into_iter()
            .partition(|figure| figure.style.priority < ROAD_PRIORITY);

        info!(count = bottom.len(); "Drawing ways");
        Self::draw_figures(&mut svg, &bottom)?;

        info!(count = scene.roads.len(); "Drawing roads");
        Self::draw_roads(&mut svg, &scene.roads)?;

        self.draw_features(&mut svg, scene)?;

        self.draw_buildings(&mut svg, scene)?;

        Self::draw_figures(&mut svg, &top)?;

        self.draw_points(&mut svg, &mut occupancy, &scene.points)?;

        self.draw_credits(&mut svg, size)?;

        svg.finish()
    }

    fn draw_figures(svg: &mut SvgDocument, figures: &[&StyledFigure]) -> Result<()> {
        for figure in figures {
            let attributes: Vec<(&str, &str)> = figure.style.attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            svg.path(&figure.figure.path(Vector2F::zero()), &attributes)?;
        }
        Ok(())
    }

    /// Per layer: all borders, then all fills, then the junction caps.
    fn draw_roads(svg: &mut SvgDocument, roads: &[Road]) -> Result<()> {
        let mut layers: BTreeMap<i32, Vec<&Road>> = BTreeMap::new();
        for road in roads {
            layers.entry(road.layer).or_default().push(road);
        }

        for roads in layers.values_mut() {
            roads.sort_by(|a, b| a.style.priority.total_cmp(&b.style.priority));

            for road in roads.iter() {
                let color = road.style.border_color.hex();
                let width = fmt_num(road.pixel_width() + 2.0);
                Self::draw_road_line(svg, road, &color, &width)?;
            }
            for road in roads.iter() {
                let color = road.style.color.hex();
                let width = fmt_num(road.pixel_width());
                Self::draw_road_line(svg, road, &color, &width)?;
            }
            for junction in resolve_junctions(roads.iter().copied()) {
                let color = junction.color.hex();
                svg.path(
                    &PathCommands::new().polyline(&junction.polygon, true),
                    &[("fill", color.as_str()), ("stroke", "none")],
                )?;
            }
        }
        Ok(())
    }

    fn draw_road_line(svg: &mut SvgDocument, road: &Road, color: &str, width: &str) -> Result<()> {
        svg.path(
            &PathCommands::new().polyline(&road.points(), false),
            &[
                ("fill", "none"),
                ("stroke", color),
                ("stroke-width", width),
                ("stroke-linecap", "round"),
                ("stroke-linejoin", "round"),
            ],
        )
    }

    fn draw_features(&self, svg: &mut SvgDocument, scene: &DrawableSet) -> Result<()> {
        let crown_color = self.scheme.color_or("evergreen_color", self.scheme.default_color());
        for tree in &scene.trees {
            tree.draw(svg, crown_color)?;
        }
        let crater_color = self.scheme.color_or("crater_color", self.scheme.default_color());
        for crater in &scene.craters {
            crater.draw(svg, crater_color)?;
        }
        for sector in &scene.direction_sectors {
            sector.draw(svg)?;
        }
        Ok(())
    }

    fn building_colors(&self) -> BuildingColors {
        BuildingColors {
            fill: self.scheme.color_or("building_color", self.scheme.default_color()),
            border: self.scheme.color_or("building_border_color", self.scheme.default_color()),
            wall: self.scheme.color_or("wall_color", self.scheme.default_color()),
        }
    }

    fn draw_buildings(&self, svg: &mut SvgDocument, scene: &DrawableSet) -> Result<()> {
        let colors = self.building_colors();
        match self.configuration.building_mode {
            BuildingMode::No => Ok(()),
            BuildingMode::Flat => {
                info!(count = scene.buildings.len(); "Drawing flat buildings");
                for building in &scene.buildings {
                    building.draw_flat(svg, &building.colors(&colors))?;
                }
                Ok(())
            }
            BuildingMode::Isometric | BuildingMode::IsometricNoParts => {
                info!(count = scene.buildings.len(), slices = scene.heights.len(); "Drawing isometric buildings");
                self.draw_isometric(svg, &scene.buildings, &scene.heights, &colors)
            }
        }
    }

    /// Shade, then walls and roofs one height slice at a time, lowest first, so
    /// taller walls cover the tops of lower buildings.
    fn draw_isometric(
        &self,
        svg: &mut SvgDocument,
        buildings: &[Building],
        heights: &[f64],
        colors: &BuildingColors,
    ) -> Result<()> {
        let scale = self.projector.scale();

        svg.start_group(&[("opacity", "0.1")])?;
        for building in buildings {
            building.draw_shade(svg)?;
        }
        svg.end_group()?;

        for building in buildings.iter().filter(|building| !building.is_extruded()) {
            building.draw_flat(svg, &building.colors(colors))?;
        }

        let walls = collect_walls(buildings);
        let mut previous = 0.0;
        for &height in heights {
            let lower = vec2f(0.0, -(previous as f32) * scale * BUILDING_SCALE);
            let upper = vec2f(0.0, -(height as f32) * scale * BUILDING_SCALE);
            for wall in &walls {
                if let Some(owner) = wall.owner_in_slice(buildings, height) {
                    draw_wall(svg, &wall.segment, lower, upper, &owner.colors(colors))?;
                }
            }
            if self.configuration.draw_roofs {
                for building in buildings.iter().filter(|building| building.height == height) {
                    building.draw_roof(svg, scale, &building.colors(colors))?;
                }
            }
            previous = height;
        }
        Ok(())
    }

    fn draw_points(&self, svg: &mut SvgDocument, occupancy: &mut OccupancyTracker, points: &[Point]) -> Result<()> {
        let mut points: Vec<&Point> = points.iter().collect();
        points.sort_by_key(|point| std::cmp::Reverse(point.priority));

        info!(count = points.len(); "Drawing main icons");
        let mut drawn = vec![false; points.len()];
        for (index, point) in points.iter().enumerate() {
            if occupancy.claim_icon(point.position) {
                point.icon_set.main_icon.draw(svg, point.position, true)?;
                drawn[index] = true;
            }
        }

        info!("Drawing extra icons");
        for (point, _) in points.iter().zip(&drawn).filter(|(_, drawn)| **drawn) {
            let extras = &point.icon_set.extra_icons;
            let left = -(extras.len() as f32 - 1.0) * ICON_SIZE / 2.0;
            for (index, icon) in extras.iter().enumerate() {
                let position = point.position + vec2f(left + index as f32 * ICON_SIZE, ICON_SIZE);
                if occupancy.claim_icon(position) {
                    icon.draw(svg, position, true)?;
                }
            }
        }

        if !self.configuration.draws_labels() {
            return Ok(());
        }
        info!("Drawing labels");
        for (point, _) in points.iter().zip(&drawn).filter(|(_, drawn)| **drawn) {
            let rows = if point.icon_set.extra_icons.is_empty() { 1.0 } else { 2.0 };
            let mut baseline = point.position.y() + ICON_SIZE / 2.0 + (rows - 1.0) * ICON_SIZE + LABEL_SPACING;
            for label in &point.labels {
                let position = vec2f(point.position.x(), baseline);
                if occupancy.claim_label(position, label.text.chars().count()) {
                    Self::draw_label(svg, position, label)?;
                }
                baseline += LABEL_SPACING;
            }
        }
        Ok(())
    }

    fn draw_label(svg: &mut SvgDocument, position: Vector2F, label: &Label) -> Result<()> {
        draw_text(svg, position, &label.text, label.size, label.color, "middle")
    }

    fn draw_credits(&self, svg: &mut SvgDocument, size: Vector2F) -> Result<()> {
        let mut credits = vec![(
            format!("Rendering: {}", PROJECT_NAME),
            vec2f(CREDIT_MARGIN, CREDIT_MARGIN),
        )];
        if let Some(credit) = &self.configuration.credit {
            credits.push((
                format!("Data: {}", credit),
                vec2f(CREDIT_MARGIN, CREDIT_MARGIN + CREDIT_FONT_SIZE + CREDIT_SPACING),
            ));
        }
        for (text, margin) in credits {
            draw_text(svg, size - margin, &text, CREDIT_FONT_SIZE, CREDIT_COLOR, "end")?;
        }
        Ok(())
    }
}

/// Text over a translucent white halo.
fn draw_text(svg: &mut SvgDocument, position: Vector2F, text: &str, size: f32, color: Color, anchor: &str) -> Result<()> {
    let size = fmt_num(size);
    let color = color.hex();
    let common = [
        ("font-size", size.as_str()),
        ("font-family", "sans-serif"),
        ("text-anchor", anchor),
        ("fill", color.as_str()),
    ];
    let mut halo = common.to_vec();
    halo.extend_from_slice(&[
        ("stroke", "#ffffff"),
        ("stroke-width", "3"),
        ("stroke-linejoin", "round"),
        ("opacity", "0.7"),
    ]);
    svg.text(position, text, &halo)?;
    svg.text(position, text, &common)
}
